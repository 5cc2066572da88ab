use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::{
    errors::{SolverError, SolverResult},
    models::domain::{Link, PageContent, QuestionData},
    services::matchers::{first_match, MatcherRule},
};

/// Extensions that mark a link as a downloadable data file.
pub const DATA_FILE_EXTENSIONS: [&str; 5] = [".pdf", ".csv", ".xlsx", ".json", ".txt"];

/// Where to send the answer, in priority order. Patterns are line-bounded.
static SUBMIT_URL_RULES: Lazy<Vec<MatcherRule>> = Lazy::new(|| {
    vec![
        MatcherRule::new(
            "post_to_submit",
            r#"(?i)POST.*?(https?://[^\s<>"]+/submit[^\s<>"]*)"#,
            1,
        ),
        MatcherRule::new("post_to_any", r#"(?i)Post.*?to\s+(https?://[^\s<>"]+)"#, 1),
        MatcherRule::new("submit_then_url", r#"(?i)submit.*?(https?://[^\s<>"]+)"#, 1),
        MatcherRule::new("bare_submit_url", r#"(?i)https?://[^\s<>"]+/submit[^\s<>"]*"#, 0),
    ]
});

static SCRAPE_RULE: Lazy<MatcherRule> =
    Lazy::new(|| MatcherRule::new("scrape_directive", r"(?i)Scrape\s+([/\w\-?=&%.]+)", 1));

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("ANCHOR_SELECTOR is a valid selector"));

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', ')', ']', '\''];

/// Turns a rendered quiz page into [`QuestionData`]. Stateless and deterministic.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts from a fetched page, preferring the `#result` container text.
    pub fn extract_page(&self, page: &PageContent, base_url: &str) -> SolverResult<QuestionData> {
        self.extract(page.question_source(), &page.html, base_url)
    }

    pub fn extract(
        &self,
        page_text: &str,
        page_html: &str,
        base_url: &str,
    ) -> SolverResult<QuestionData> {
        let submit_url = find_submit_url(page_text).ok_or_else(|| {
            log::error!(
                "Submit URL not found in quiz page. Page text starts with: {}",
                preview(page_text, 500)
            );
            SolverError::MissingSubmitUrl
        })?;
        log::info!("Extracted submit URL: {}", submit_url);

        let scrape_paths = find_scrape_paths(page_text);
        for path in &scrape_paths {
            log::info!("Extracted scrape path: {}", path);
        }

        let links = extract_links(page_html);
        let data_file_urls = links
            .iter()
            .filter(|link| is_data_file_url(&link.url))
            .map(|link| link.url.clone())
            .collect();

        Ok(QuestionData {
            question_text: page_text.to_string(),
            submit_url,
            scrape_paths,
            data_file_urls,
            links,
            base_url: base_url.to_string(),
        })
    }
}

pub fn find_submit_url(text: &str) -> Option<String> {
    first_match(&SUBMIT_URL_RULES, text, |candidate| {
        let candidate = candidate.trim_end_matches(TRAILING_PUNCTUATION);
        match Url::parse(candidate) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
                Some(candidate.to_string())
            }
            _ => None,
        }
    })
    .map(|found| {
        log::debug!("Submit URL matched rule '{}'", found.rule);
        found.value
    })
}

pub fn find_scrape_paths(text: &str) -> Vec<String> {
    SCRAPE_RULE
        .find_all(text)
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn extract_links(html: &str) -> Vec<Link> {
    if html.trim().is_empty() {
        return Vec::new();
    }

    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?.trim();
            let text = anchor
                .text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ");
            Some(Link {
                url: href.to_string(),
                text,
            })
        })
        .collect()
}

pub fn is_data_file_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    DATA_FILE_EXTENSIONS.iter().any(|ext| lowered.contains(ext))
}

/// Resolves a possibly relative path against the page it was found on.
pub fn resolve_url(base_url: &str, path: &str) -> SolverResult<String> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }

    let base = Url::parse(base_url).map_err(|_| SolverError::InvalidUrl(base_url.to_string()))?;
    base.join(path)
        .map(|url| url.to_string())
        .map_err(|_| SolverError::InvalidUrl(path.to_string()))
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
