use std::{sync::Arc, time::Duration};

use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::Config,
    constants::prompts::{
        ANALYSIS_SYSTEM_PROMPT, ANSWER_SYSTEM_PROMPT, SECRET_CODE_PROMPT_PREFIX,
        SECRET_CODE_SYSTEM_PROMPT,
    },
    errors::{SolverError, SolverResult},
    models::domain::{QuestionAnalysis, QuestionData},
    services::code_extraction::strip_wrapping,
};

/// Data handed to the answer prompt is cut to this many characters.
pub const DATA_SUMMARY_LIMIT: usize = 2000;
/// Scraped text handed to the secret-code prompt is cut to this many characters.
pub const SECRET_CODE_TEXT_LIMIT: usize = 1000;
const SECRET_CODE_MAX_TOKENS: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            json_mode: false,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Chat-completion transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate_completion(&self, request: CompletionRequest) -> SolverResult<String>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`LlmClient`] for any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    api_key: SecretString,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiLlmClient {
    pub fn from_config(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.llm_api_key.expose_secret())
            .with_api_base(&config.llm_base_url);

        if config.llm_api_key.expose_secret().is_empty() {
            log::warn!("LLM API token not configured; LLM calls will fail");
        } else {
            log::info!("LLM client initialized with base URL: {}", config.llm_base_url);
        }

        Self {
            client: Client::with_config(openai_config),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            timeout: config.llm_timeout(),
        }
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system_prompt) = &request.system_prompt {
            messages.push(json!({"role": "system", "content": system_prompt}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature.unwrap_or(self.temperature),
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
        });
        if request.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAiLlmClient {
    async fn generate_completion(&self, request: CompletionRequest) -> SolverResult<String> {
        if self.api_key.expose_secret().is_empty() {
            return Err(SolverError::Llm("LLM API token not configured".to_string()));
        }

        let body = self.request_body(&request);
        let chat = self.client.chat();
        let call = chat.create_byot(body);
        let response: ChatCompletion = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                SolverError::Llm(format!("request timed out after {}s", self.timeout.as_secs()))
            })?
            .map_err(|e| {
                log::error!("LLM API error: {}", e);
                SolverError::Llm(e.to_string())
            })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| SolverError::Llm("completion had no content".to_string()))
    }
}

/// Quiz-specific prompts on top of an [`LlmClient`].
#[derive(Clone)]
pub struct LlmService {
    client: Arc<dyn LlmClient>,
}

impl LlmService {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Asks the model for a solving plan. The reply must be a JSON object.
    pub async fn analyze_question(
        &self,
        question_text: &str,
        question: &QuestionData,
    ) -> SolverResult<QuestionAnalysis> {
        let context = json!({
            "base_url": question.base_url,
            "submit_url": question.submit_url,
            "scrape_paths": question.scrape_paths,
            "data_file_urls": question.data_file_urls,
            "links": question.links,
        });
        let schema = schemars::schema_for!(QuestionAnalysis);
        let prompt = format!(
            "Question: {}\n\nContext:\n{}\n\nRespond with JSON matching this schema:\n{}\n\nAnalyze this question and provide a structured plan to solve it.",
            question_text,
            pretty(&context),
            pretty(&schema),
        );

        let request = CompletionRequest::new(prompt)
            .with_system_prompt(ANALYSIS_SYSTEM_PROMPT)
            .with_json_mode();
        let response = self.client.generate_completion(request).await?;

        let analysis: QuestionAnalysis = serde_json::from_str(response.trim()).map_err(|e| {
            log::error!("Question analysis was not valid JSON: {}", e);
            SolverError::LlmAnalysisParse(e.to_string())
        })?;
        log::info!(
            "Question analysis: task_type={}, answer_format={}",
            analysis.task_type,
            analysis.answer_format()
        );
        Ok(analysis)
    }

    /// Raw answer text; cleanup and coercion happen in the resolver.
    pub async fn generate_answer(
        &self,
        question_text: &str,
        data_summary: Option<&str>,
        analysis: &QuestionAnalysis,
    ) -> SolverResult<String> {
        let mut prompt = format!("Question: {}\n\n", question_text);
        if let Some(data) = data_summary {
            prompt.push_str("Data Summary:\n");
            prompt.push_str(&truncate_chars(data, DATA_SUMMARY_LIMIT));
            prompt.push_str("\n\n");
        }
        prompt.push_str("Task Analysis:\n");
        prompt.push_str(&pretty(analysis));
        prompt.push_str(
            "\n\nReturn ONLY the answer value. No extra formatting, no code blocks, no JSON structure.",
        );

        let request = CompletionRequest::new(prompt).with_system_prompt(ANSWER_SYSTEM_PROMPT);
        self.client.generate_completion(request).await
    }

    /// Last-resort code extraction from scraped text. May return an empty string.
    pub async fn extract_secret_code(&self, text: &str) -> SolverResult<String> {
        let prompt = format!(
            "{}\n\n{}",
            SECRET_CODE_PROMPT_PREFIX,
            truncate_chars(text, SECRET_CODE_TEXT_LIMIT)
        );
        let request = CompletionRequest::new(prompt)
            .with_system_prompt(SECRET_CODE_SYSTEM_PROMPT)
            .with_temperature(0.0)
            .with_max_tokens(SECRET_CODE_MAX_TOKENS);

        let raw = self.client.generate_completion(request).await?;
        Ok(strip_wrapping(&raw))
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::function;

    fn question() -> QuestionData {
        QuestionData {
            question_text: "What is the sum?".to_string(),
            submit_url: "https://quiz.example/submit".to_string(),
            scrape_paths: vec![],
            data_file_urls: vec!["data.csv".to_string()],
            links: vec![],
            base_url: "https://quiz.example/q1".to_string(),
        }
    }

    fn service(mock: MockLlmClient) -> LlmService {
        LlmService::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn analyze_question_requests_json_and_parses_reply() {
        let mut mock = MockLlmClient::new();
        mock.expect_generate_completion()
            .with(function(|req: &CompletionRequest| {
                req.json_mode && req.prompt.contains("data.csv") && req.prompt.contains("task_type")
            }))
            .times(1)
            .returning(|_| {
                Ok(r#"{"task_type": "data_analysis", "data_sources": ["data.csv", 3], "answer_format": "number"}"#.to_string())
            });

        let analysis = service(mock)
            .analyze_question("What is the sum?", &question())
            .await
            .unwrap();

        assert_eq!(analysis.task_type, "data_analysis");
        assert_eq!(analysis.data_source_urls(), vec!["data.csv".to_string()]);
        assert!(analysis.steps.is_empty());
    }

    #[tokio::test]
    async fn analyze_question_rejects_non_json_reply() {
        let mut mock = MockLlmClient::new();
        mock.expect_generate_completion()
            .returning(|_| Ok("Sure! Here is my plan.".to_string()));

        let err = service(mock)
            .analyze_question("What is the sum?", &question())
            .await
            .unwrap_err();

        assert!(matches!(err, SolverError::LlmAnalysisParse(_)));
    }

    #[tokio::test]
    async fn generate_answer_truncates_data_summary() {
        let data = "x".repeat(DATA_SUMMARY_LIMIT + 500);
        let mut mock = MockLlmClient::new();
        mock.expect_generate_completion()
            .with(function(|req: &CompletionRequest| {
                !req.json_mode
                    && req.prompt.contains(&"x".repeat(DATA_SUMMARY_LIMIT))
                    && !req.prompt.contains(&"x".repeat(DATA_SUMMARY_LIMIT + 1))
            }))
            .returning(|_| Ok("42".to_string()));

        let answer = service(mock)
            .generate_answer("What is the sum?", Some(&data), &QuestionAnalysis::default())
            .await
            .unwrap();

        assert_eq!(answer, "42");
    }

    #[tokio::test]
    async fn secret_code_extraction_is_deterministic_and_short() {
        let text = format!("code hidden here {}", "y".repeat(SECRET_CODE_TEXT_LIMIT));
        let mut mock = MockLlmClient::new();
        mock.expect_generate_completion()
            .with(function(|req: &CompletionRequest| {
                req.temperature == Some(0.0)
                    && req.max_tokens == Some(SECRET_CODE_MAX_TOKENS)
                    && !req.prompt.contains(&"y".repeat(SECRET_CODE_TEXT_LIMIT))
            }))
            .returning(|_| Ok(" `XK42PQ` ".to_string()));

        let code = service(mock).extract_secret_code(&text).await.unwrap();

        assert_eq!(code, "XK42PQ");
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let mut mock = MockLlmClient::new();
        mock.expect_generate_completion()
            .returning(|_| Err(SolverError::Llm("connection refused".to_string())));

        let err = service(mock)
            .generate_answer("q", None, &QuestionAnalysis::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SolverError::Llm(_)));
    }

    #[test]
    fn request_body_honours_overrides_and_json_mode() {
        let client = OpenAiLlmClient::from_config(&Config::test_config());
        let request = CompletionRequest::new("hi")
            .with_system_prompt("sys")
            .with_max_tokens(10)
            .with_json_mode();

        let body = client.request_body(&request);

        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["max_tokens"], 10);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["model"], Config::test_config().llm_model);
    }

    #[tokio::test]
    async fn missing_token_fails_without_network() {
        let client = OpenAiLlmClient::from_config(&Config::test_config());

        let err = client
            .generate_completion(CompletionRequest::new("hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, SolverError::Llm(_)));
    }
}
