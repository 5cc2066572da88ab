use serde::{Deserialize, Serialize};

use crate::models::domain::Answer;

/// Body POSTed to the quiz server's submit endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionPayload<'a> {
    pub email: &'a str,
    pub secret: &'a str,
    pub url: &'a str,
    pub answer: &'a Answer,
}

/// Expected JSON reply from the submit endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionResponse {
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Interpreted result of a submission, with the raw reply kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub correct: bool,
    pub next_url: Option<String>,
    pub reason: Option<String>,
    pub raw: serde_json::Value,
}

impl SubmissionOutcome {
    pub fn rejected(reason: impl Into<String>, raw: serde_json::Value) -> Self {
        Self {
            correct: false,
            next_url: None,
            reason: Some(reason.into()),
            raw,
        }
    }
}

impl SubmissionResponse {
    pub fn into_outcome(self, raw: serde_json::Value) -> SubmissionOutcome {
        SubmissionOutcome {
            correct: self.correct,
            next_url: self.url.filter(|u| !u.trim().is_empty()),
            reason: self.reason,
            raw,
        }
    }
}
