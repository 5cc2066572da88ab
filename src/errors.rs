use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the HTTP front door.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to the caller. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::InternalError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.public_message(),
            code: self.error_code(),
        })
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failures of a single quiz step.
///
/// Everything except `DataFileProcessing` aborts the step; the chain controller
/// records the error and stops the chain.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("submit URL not found in quiz page; refusing to guess an endpoint")]
    MissingSubmitUrl,

    #[error("scrape of '{path}' failed: {reason}")]
    ScrapeExtraction { path: String, reason: String },

    #[error("could not process data file '{url}': {reason}")]
    DataFileProcessing { url: String, reason: String },

    #[error("question analysis was not valid JSON: {0}")]
    LlmAnalysisParse(String),

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("answer submission to '{url}' failed: {reason}")]
    SubmissionTransport { url: String, reason: String },

    #[error("failed to fetch '{url}': {reason}")]
    PageFetch { url: String, reason: String },

    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("scrape directive present but resolution reached the {0} strategy")]
    ScrapePolicyViolation(&'static str),
}

impl SolverError {
    pub fn page_fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        SolverError::PageFetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn data_file(url: &str, reason: impl std::fmt::Display) -> Self {
        SolverError::DataFileProcessing {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Only data-file failures may be absorbed inside a step.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SolverError::DataFileProcessing { .. })
    }
}

pub type SolverResult<T> = Result<T, SolverError>;
