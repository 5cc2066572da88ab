use std::{
    collections::HashMap,
    path::Path,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    constants::prompts::SECRET_CODE_SYSTEM_PROMPT,
    errors::{SolverError, SolverResult},
    models::{
        domain::{Answer, PageContent},
        dto::submission::SubmissionOutcome,
    },
    services::{
        data_processor::{DataFileLoader, ProcessedData},
        llm_service::{CompletionRequest, LlmClient},
        page_fetcher::PageFetcher,
        submission_client::AnswerSubmitter,
    },
};

#[cfg(test)]
pub mod fixtures {
    use super::*;

    pub const SUBMIT_URL: &str = "https://quiz.example/submit";

    /// A rendered quiz page whose text asks for an answer and names the submit endpoint.
    pub fn quiz_page(question: &str) -> PageContent {
        let text = format!("{}\nPOST your answer to {}", question, SUBMIT_URL);
        PageContent {
            html: format!("<html><body><div id=\"result\">{}</div></body></html>", text),
            visible_text: text.clone(),
            title: "Quiz".to_string(),
            result_text: Some(text),
        }
    }

    /// A quiz page that also links to data files.
    pub fn quiz_page_with_links(question: &str, hrefs: &[&str]) -> PageContent {
        let mut page = quiz_page(question);
        let anchors = hrefs
            .iter()
            .map(|href| format!("<a href=\"{}\">{}</a>", href, href))
            .collect::<String>();
        page.html = format!("<html><body>{}{}</body></html>", page.visible_text, anchors);
        page
    }

    /// A plain page, e.g. the target of a scrape directive.
    pub fn text_page(text: &str) -> PageContent {
        PageContent {
            html: format!("<html><body>{}</body></html>", text),
            visible_text: text.to_string(),
            title: String::new(),
            result_text: None,
        }
    }

    pub fn outcome(correct: bool, next_url: Option<&str>) -> SubmissionOutcome {
        SubmissionOutcome {
            correct,
            next_url: next_url.map(str::to_string),
            reason: (!correct).then(|| "Wrong answer".to_string()),
            raw: serde_json::json!({"correct": correct, "url": next_url}),
        }
    }
}

#[cfg(test)]
pub mod fakes {
    use super::*;

    /// Serves canned pages; unknown URLs fail like an unreachable host.
    #[derive(Default)]
    pub struct FakePageFetcher {
        pages: HashMap<String, PageContent>,
        delay: Option<Duration>,
        calls: Mutex<Vec<String>>,
    }

    impl FakePageFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, page: PageContent) -> Self {
            self.pages.insert(url.to_string(), page);
            self
        }

        /// Every fetch sleeps this long first (use with a paused tokio clock).
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakePageFetcher {
        async fn fetch(&self, url: &str) -> SolverResult<PageContent> {
            self.calls.lock().unwrap().push(url.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| SolverError::page_fetch(url, "connection refused"))
        }
    }

    /// Answers by request kind: JSON mode gets the analysis, the secret-code
    /// prompt gets the code, everything else gets the answer.
    pub struct ScriptedLlm {
        analysis: String,
        answer: String,
        secret_code: String,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl Default for ScriptedLlm {
        fn default() -> Self {
            Self {
                analysis: r#"{"task_type": "general", "answer_format": "string"}"#.to_string(),
                answer: "fallback answer".to_string(),
                secret_code: String::new(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl ScriptedLlm {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_analysis(mut self, analysis: serde_json::Value) -> Self {
            self.analysis = analysis.to_string();
            self
        }

        pub fn with_raw_analysis(mut self, analysis: &str) -> Self {
            self.analysis = analysis.to_string();
            self
        }

        pub fn with_answer(mut self, answer: &str) -> Self {
            self.answer = answer.to_string();
            self
        }

        pub fn with_secret_code(mut self, code: &str) -> Self {
            self.secret_code = code.to_string();
            self
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn answer_requests(&self) -> Vec<CompletionRequest> {
            self.requests()
                .into_iter()
                .filter(|r| !r.json_mode && r.system_prompt.as_deref() != Some(SECRET_CODE_SYSTEM_PROMPT))
                .collect()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate_completion(&self, request: CompletionRequest) -> SolverResult<String> {
            let reply = if request.json_mode {
                self.analysis.clone()
            } else if request.system_prompt.as_deref() == Some(SECRET_CODE_SYSTEM_PROMPT) {
                self.secret_code.clone()
            } else {
                self.answer.clone()
            };
            self.requests.lock().unwrap().push(request);
            Ok(reply)
        }
    }

    /// Data files by URL; unknown URLs fail as a download error.
    #[derive(Default)]
    pub struct FakeDataLoader {
        files: HashMap<String, ProcessedData>,
        fatal: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeDataLoader {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_file(mut self, url: &str, data: ProcessedData) -> Self {
            self.files.insert(url.to_string(), data);
            self
        }

        /// Loading this URL fails with an error that is not a data-file error.
        pub fn with_fatal_error(mut self, url: &str, reason: &str) -> Self {
            self.fatal.insert(url.to_string(), reason.to_string());
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DataFileLoader for FakeDataLoader {
        async fn load(&self, url: &str, work_dir: &Path) -> SolverResult<ProcessedData> {
            assert!(work_dir.is_dir(), "work dir must exist during a load");
            self.calls.lock().unwrap().push(url.to_string());
            if let Some(reason) = self.fatal.get(url) {
                return Err(SolverError::Llm(reason.clone()));
            }
            self.files
                .get(url)
                .cloned()
                .ok_or_else(|| SolverError::data_file(url, "HTTP 404"))
        }
    }

    /// Scripted submission outcomes per quiz URL; unknown URLs fail as transport errors.
    #[derive(Default)]
    pub struct FakeSubmitter {
        outcomes: HashMap<String, SubmissionOutcome>,
        submissions: Mutex<Vec<(String, Answer)>>,
    }

    impl FakeSubmitter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_outcome(mut self, quiz_url: &str, outcome: SubmissionOutcome) -> Self {
            self.outcomes.insert(quiz_url.to_string(), outcome);
            self
        }

        pub fn submissions(&self) -> Vec<(String, Answer)> {
            self.submissions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AnswerSubmitter for FakeSubmitter {
        async fn submit(
            &self,
            submit_url: &str,
            quiz_url: &str,
            answer: &Answer,
        ) -> SolverResult<SubmissionOutcome> {
            self.submissions
                .lock()
                .unwrap()
                .push((quiz_url.to_string(), answer.clone()));
            self.outcomes
                .get(quiz_url)
                .cloned()
                .ok_or_else(|| SolverError::SubmissionTransport {
                    url: submit_url.to_string(),
                    reason: "connection reset".to_string(),
                })
        }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{fakes::*, fixtures::*};
    use super::*;

    #[test]
    fn test_fixtures_quiz_page_names_submit_url() {
        let page = quiz_page("What is 2 + 2?");
        assert!(page.question_source().contains(SUBMIT_URL));
        assert!(page.question_source().starts_with("What is 2 + 2?"));
    }

    #[tokio::test]
    async fn test_fake_fetcher_records_calls_and_fails_unknown_urls() {
        let fetcher = FakePageFetcher::new().with_page("https://quiz.example/q1", text_page("hi"));

        assert!(fetcher.fetch("https://quiz.example/q1").await.is_ok());
        assert!(fetcher.fetch("https://quiz.example/nope").await.is_err());
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_llm_routes_by_request_kind() {
        let llm = ScriptedLlm::new().with_answer("42").with_secret_code("ABC123");

        let answer = llm.generate_completion(CompletionRequest::new("q")).await.unwrap();
        let code = llm
            .generate_completion(
                CompletionRequest::new("q").with_system_prompt(SECRET_CODE_SYSTEM_PROMPT),
            )
            .await
            .unwrap();

        assert_eq!(answer, "42");
        assert_eq!(code, "ABC123");
        assert_eq!(llm.answer_requests().len(), 1);
    }
}
