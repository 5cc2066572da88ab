use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    errors::SolverResult,
    models::domain::{ChainResult, ChainState, QuizStepResult, Transition},
    services::{
        answer_resolver::AnswerResolver, content_extractor::ContentExtractor,
        data_processor::DataFileLoader, llm_service::LlmService, page_fetcher::PageFetcher,
        submission_client::AnswerSubmitter,
    },
};

/// Drives a quiz chain: fetch, extract, analyze, resolve, submit, follow the next URL.
///
/// The time budget is checked between steps only; a step that is already running
/// is allowed to finish.
pub struct ChainController {
    fetcher: Arc<dyn PageFetcher>,
    extractor: ContentExtractor,
    llm: LlmService,
    resolver: AnswerResolver,
    submitter: Arc<dyn AnswerSubmitter>,
    timeout: Duration,
}

impl ChainController {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        llm: LlmService,
        loader: Arc<dyn DataFileLoader>,
        submitter: Arc<dyn AnswerSubmitter>,
        timeout: Duration,
    ) -> Self {
        let resolver = AnswerResolver::new(fetcher.clone(), llm.clone(), loader);
        Self {
            fetcher,
            extractor: ContentExtractor::new(),
            llm,
            resolver,
            submitter,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn solve_quiz_chain(&self, initial_url: &str) -> ChainResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        log::info!("[{}] Starting quiz chain at {}", run_id, initial_url);

        let mut steps: Vec<QuizStepResult> = Vec::new();
        let mut current_url = initial_url.to_string();

        let final_state = loop {
            if clock.elapsed() >= self.timeout {
                log::warn!(
                    "[{}] Time budget of {}s exhausted after {} step(s)",
                    run_id,
                    self.timeout.as_secs(),
                    steps.len()
                );
                break ChainState::DoneTimeout;
            }

            log::info!("[{}] Step {}: {}", run_id, steps.len() + 1, current_url);
            let step = match self.solve_single_quiz(&current_url).await {
                Ok(step) => step,
                Err(e) => {
                    log::error!("[{}] Step failed at {}: {}", run_id, current_url, e);
                    QuizStepResult::failed(current_url.as_str(), &e)
                }
            };

            let transition = Transition::after(&step);
            steps.push(step);

            match transition {
                Transition::Continue(next_url) => current_url = next_url,
                Transition::Stop(state) => break state,
            }
        };

        let elapsed_seconds = clock.elapsed().as_secs_f64();
        log::info!(
            "[{}] Chain finished in state {} after {} step(s), {:.1}s",
            run_id,
            final_state,
            steps.len(),
            elapsed_seconds
        );

        ChainResult {
            run_id,
            initial_url: initial_url.to_string(),
            started_at,
            total_steps: steps.len(),
            steps,
            final_state,
            elapsed_seconds,
        }
    }

    pub async fn solve_single_quiz(&self, url: &str) -> SolverResult<QuizStepResult> {
        let page = self.fetcher.fetch(url).await?;
        let question = self.extractor.extract_page(&page, url)?;
        let analysis = self
            .llm
            .analyze_question(&question.question_text, &question)
            .await?;
        let resolved = self.resolver.resolve(&question, &analysis).await?;
        let outcome = self
            .submitter
            .submit(&question.submit_url, url, &resolved.answer)
            .await?;

        Ok(QuizStepResult {
            url: url.to_string(),
            question_text: Some(question.question_text),
            answer: Some(resolved.answer),
            strategy: Some(resolved.strategy),
            correct: outcome.correct,
            next_url: outcome.next_url,
            failure_reason: if outcome.correct { None } else { outcome.reason },
            is_error: false,
            raw_submission_response: Some(outcome.raw),
            completed_at: Utc::now(),
        })
    }
}
