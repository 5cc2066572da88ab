//! Strategy selection for a single quiz question.
//!
//! Strategies are tried in a fixed order:
//!
//! 1. **Directed scrape** when the page says "Scrape <path>": fetch each path and
//!    pull the secret code out of it. Failing here never falls through to a guess.
//! 2. **Data files** when the analysis or the page names downloadable files:
//!    download, process, and hand the combined data to the LLM.
//! 3. **Direct LLM** with only the question and its analysis.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    errors::{SolverError, SolverResult},
    models::domain::{
        answer::clean_llm_output, Answer, QuestionAnalysis, QuestionData, ResolutionStrategy,
    },
    services::{
        code_extraction::extract_code_heuristically,
        content_extractor::resolve_url,
        data_processor::{DataFileLoader, ProcessedData},
        llm_service::{truncate_chars, LlmService, DATA_SUMMARY_LIMIT},
        page_fetcher::PageFetcher,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAnswer {
    pub answer: Answer,
    pub strategy: ResolutionStrategy,
}

#[derive(Debug, Serialize)]
struct SourcedData<'a> {
    source: &'a str,
    data: ProcessedData,
}

pub struct AnswerResolver {
    fetcher: Arc<dyn PageFetcher>,
    llm: LlmService,
    loader: Arc<dyn DataFileLoader>,
}

impl AnswerResolver {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        llm: LlmService,
        loader: Arc<dyn DataFileLoader>,
    ) -> Self {
        Self {
            fetcher,
            llm,
            loader,
        }
    }

    pub async fn resolve(
        &self,
        question: &QuestionData,
        analysis: &QuestionAnalysis,
    ) -> SolverResult<ResolvedAnswer> {
        if question.has_scrape_directive() {
            log::info!(
                "Scrape directive found ({} path(s)); using directed scrape",
                question.scrape_paths.len()
            );
            let code = self.resolve_directed_scrape(question).await?;
            return Ok(ResolvedAnswer {
                answer: Answer::Text(code),
                strategy: ResolutionStrategy::DirectedScrape,
            });
        }

        let sources = data_sources(question, analysis);
        if !sources.is_empty() {
            guard_scrape_policy(question, "data-file")?;
            log::info!("Resolving with {} data source(s)", sources.len());
            let data = self.collect_data(question, &sources).await?;
            let raw = self
                .llm
                .generate_answer(&question.question_text, Some(&data), analysis)
                .await?;
            return Ok(finish(&raw, analysis, ResolutionStrategy::DataFiles));
        }

        guard_scrape_policy(question, "direct LLM")?;
        log::info!("No scrape directive or data sources; asking the LLM directly");
        let raw = self
            .llm
            .generate_answer(&question.question_text, None, analysis)
            .await?;
        Ok(finish(&raw, analysis, ResolutionStrategy::DirectLlm))
    }

    async fn resolve_directed_scrape(&self, question: &QuestionData) -> SolverResult<String> {
        for path in &question.scrape_paths {
            match self.scrape_code(question, path).await {
                Ok(Some(code)) => {
                    log::info!("Secret code from '{}': {}", path, code);
                    return Ok(code);
                }
                Ok(None) => log::warn!("No secret code found at '{}'; trying next path", path),
                Err(e) => {
                    return Err(SolverError::ScrapeExtraction {
                        path: path.clone(),
                        reason: e.to_string(),
                    })
                }
            }
        }

        Err(SolverError::ScrapeExtraction {
            path: question.scrape_paths.join(", "),
            reason: "no secret code found on any scraped page".to_string(),
        })
    }

    async fn scrape_code(&self, question: &QuestionData, path: &str) -> SolverResult<Option<String>> {
        let url = resolve_url(&question.base_url, path)?;
        log::info!("Scraping {} for the secret code", url);

        let page = self.fetcher.fetch(&url).await?;
        let text = page.question_source();
        if let Some(code) = extract_code_heuristically(text) {
            return Ok(Some(code));
        }

        log::info!("Heuristics found nothing at {}; asking the LLM", url);
        let code = self.llm.extract_secret_code(text).await?;
        Ok((!code.is_empty()).then_some(code))
    }

    /// Downloads and processes every source into a fresh work directory.
    /// Recoverable file failures are logged and skipped.
    async fn collect_data(&self, question: &QuestionData, sources: &[String]) -> SolverResult<String> {
        let work_dir = tempfile::TempDir::new().map_err(|e| {
            SolverError::data_file(&question.base_url, format!("no work directory: {}", e))
        })?;

        let mut collected = Vec::with_capacity(sources.len());
        for source in sources {
            let loaded = match resolve_url(&question.base_url, source) {
                Ok(url) => self.loader.load(&url, work_dir.path()).await,
                Err(e) => Err(SolverError::data_file(source, e)),
            };
            match loaded {
                Ok(data) => collected.push(SourcedData {
                    source,
                    data: data.preview(),
                }),
                Err(e) if e.is_recoverable() => {
                    log::warn!("Skipping data source '{}': {}", source, e)
                }
                Err(e) => return Err(e),
            }
        }

        let serialized = serde_json::to_string(&collected)
            .map_err(|e| SolverError::data_file(&question.base_url, e))?;
        Ok(truncate_chars(&serialized, DATA_SUMMARY_LIMIT))
    }
}

/// String entries of the analysis' data sources, else the page's data-file links.
fn data_sources(question: &QuestionData, analysis: &QuestionAnalysis) -> Vec<String> {
    let from_analysis = analysis.data_source_urls();
    if from_analysis.is_empty() {
        question.data_file_urls.clone()
    } else {
        from_analysis
    }
}

fn guard_scrape_policy(question: &QuestionData, strategy: &'static str) -> SolverResult<()> {
    if question.has_scrape_directive() {
        log::error!(
            "Reached {} strategy despite scrape paths {:?}",
            strategy,
            question.scrape_paths
        );
        return Err(SolverError::ScrapePolicyViolation(strategy));
    }
    Ok(())
}

fn finish(raw: &str, analysis: &QuestionAnalysis, strategy: ResolutionStrategy) -> ResolvedAnswer {
    let cleaned = clean_llm_output(raw);
    let format = analysis.answer_format();
    let answer = Answer::coerce(&cleaned, format);
    if answer.format() != format {
        log::warn!("Answer does not fit the expected {:?} format; submitting as text", format);
    }
    log::info!("Resolved answer via {:?}: {}", strategy, answer);
    ResolvedAnswer { answer, strategy }
}
