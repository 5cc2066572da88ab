#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use secrecy::SecretString;

use quiz_chain_server::{
    config::Config,
    errors::{SolverError, SolverResult},
    models::{
        domain::{Answer, PageContent},
        dto::submission::SubmissionOutcome,
    },
    services::{
        AnswerSubmitter, ChainController, CompletionRequest, DataFileLoader, LlmClient,
        LlmService, PageFetcher, ProcessedData,
    },
};

pub const EMAIL: &str = "student@example.com";
pub const SECRET: &str = "s3cret";
pub const SUBMIT_URL: &str = "https://quiz.example/submit";

pub fn test_config() -> Config {
    Config {
        email: EMAIL.to_string(),
        secret: SecretString::from(SECRET.to_string()),
        quiz_timeout_secs: 30,
        ..Config::default()
    }
}

pub fn quiz_page(question: &str) -> PageContent {
    let text = format!("{}\nPOST your answer to {}", question, SUBMIT_URL);
    PageContent {
        html: format!("<html><body><div id=\"result\">{}</div></body></html>", text),
        visible_text: text.clone(),
        title: "Quiz".to_string(),
        result_text: Some(text),
    }
}

/// Pages served from memory; each fetch optionally sleeps first.
#[derive(Default)]
pub struct InMemoryPages {
    pages: HashMap<String, PageContent>,
    delay: Option<Duration>,
}

impl InMemoryPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, page: PageContent) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl PageFetcher for InMemoryPages {
    async fn fetch(&self, url: &str) -> SolverResult<PageContent> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| SolverError::page_fetch(url, "not found"))
    }
}

/// Analysis requests get a fixed plan, everything else gets the same answer.
pub struct FixedLlm {
    pub analysis: String,
    pub answer: String,
}

#[async_trait]
impl LlmClient for FixedLlm {
    async fn generate_completion(&self, request: CompletionRequest) -> SolverResult<String> {
        if request.json_mode {
            Ok(self.analysis.clone())
        } else {
            Ok(self.answer.clone())
        }
    }
}

pub struct NoDataFiles;

#[async_trait]
impl DataFileLoader for NoDataFiles {
    async fn load(&self, url: &str, _work_dir: &Path) -> SolverResult<ProcessedData> {
        Err(SolverError::data_file(url, "no data files in this test"))
    }
}

/// Grades submissions from a per-URL script and records what was sent.
#[derive(Default)]
pub struct ScriptedGrader {
    outcomes: HashMap<String, (bool, Option<String>)>,
    pub received: Mutex<Vec<(String, Answer)>>,
}

impl ScriptedGrader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grade(mut self, quiz_url: &str, correct: bool, next_url: Option<&str>) -> Self {
        self.outcomes
            .insert(quiz_url.to_string(), (correct, next_url.map(str::to_string)));
        self
    }
}

#[async_trait]
impl AnswerSubmitter for ScriptedGrader {
    async fn submit(
        &self,
        submit_url: &str,
        quiz_url: &str,
        answer: &Answer,
    ) -> SolverResult<SubmissionOutcome> {
        self.received
            .lock()
            .unwrap()
            .push((quiz_url.to_string(), answer.clone()));

        let (correct, next_url) =
            self.outcomes
                .get(quiz_url)
                .cloned()
                .ok_or_else(|| SolverError::SubmissionTransport {
                    url: submit_url.to_string(),
                    reason: "connection reset".to_string(),
                })?;
        Ok(SubmissionOutcome {
            correct,
            reason: (!correct).then(|| "Wrong answer".to_string()),
            raw: serde_json::json!({"correct": correct, "url": next_url}),
            next_url,
        })
    }
}

pub fn controller(
    pages: InMemoryPages,
    answer: &str,
    grader: Arc<ScriptedGrader>,
    timeout: Duration,
) -> ChainController {
    ChainController::new(
        Arc::new(pages),
        LlmService::new(Arc::new(FixedLlm {
            analysis: r#"{"task_type": "arithmetic", "answer_format": "number"}"#.to_string(),
            answer: answer.to_string(),
        })),
        Arc::new(NoDataFiles),
        grader,
        timeout,
    )
}
