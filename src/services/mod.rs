pub mod answer_resolver;
pub mod chain_controller;
pub mod code_extraction;
pub mod content_extractor;
pub mod data_processor;
pub mod llm_service;
pub mod matchers;
pub mod page_fetcher;
pub mod submission_client;

pub use answer_resolver::{AnswerResolver, ResolvedAnswer};
pub use chain_controller::ChainController;
pub use content_extractor::ContentExtractor;
pub use data_processor::{DataFileLoader, HttpDataFileLoader, ProcessedData};
pub use llm_service::{CompletionRequest, LlmClient, LlmService, OpenAiLlmClient};
pub use page_fetcher::{BrowserSettings, ChromiumPageFetcher, PageFetcher};
pub use submission_client::{AnswerSubmitter, HttpSubmissionClient};
