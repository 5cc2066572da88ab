use std::sync::Arc;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    services::{
        BrowserSettings, ChainController, ChromiumPageFetcher, HttpDataFileLoader,
        HttpSubmissionClient, LlmService, OpenAiLlmClient,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chain_controller: Arc<ChainController>,
}

impl AppState {
    /// Wires the production collaborators: headless Chromium, the OpenAI-compatible
    /// LLM endpoint, and one shared HTTP client for downloads and submissions.
    pub fn new(config: Config) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| AppError::InternalError(format!("failed to build HTTP client: {}", e)))?;

        let fetcher = Arc::new(ChromiumPageFetcher::new(BrowserSettings::from_config(&config)));
        let llm = LlmService::new(Arc::new(OpenAiLlmClient::from_config(&config)));
        let loader = Arc::new(HttpDataFileLoader::new(http_client.clone()));
        let submitter = Arc::new(HttpSubmissionClient::from_config(http_client, &config));

        let chain_controller =
            ChainController::new(fetcher, llm, loader, submitter, config.quiz_timeout());

        Ok(Self::from_parts(config, chain_controller))
    }

    pub fn from_parts(config: Config, chain_controller: ChainController) -> Self {
        Self {
            config: Arc::new(config),
            chain_controller: Arc::new(chain_controller),
        }
    }
}
