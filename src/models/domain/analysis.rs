use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Expected shape of the final answer, as declared by the question analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnswerFormat {
    Number,
    Boolean,
    Json,
    Text,
}

impl AnswerFormat {
    /// Unknown or missing declarations fall back to plain text.
    pub fn from_declared(declared: Option<&str>) -> Self {
        match declared.map(|d| d.trim().to_ascii_lowercase()).as_deref() {
            Some("number") => AnswerFormat::Number,
            Some("boolean") => AnswerFormat::Boolean,
            Some("json") => AnswerFormat::Json,
            _ => AnswerFormat::Text,
        }
    }
}

impl fmt::Display for AnswerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerFormat::Number => write!(f, "number"),
            AnswerFormat::Boolean => write!(f, "boolean"),
            AnswerFormat::Json => write!(f, "json"),
            AnswerFormat::Text => write!(f, "string"),
        }
    }
}

/// Plan returned by the LLM before any answer is attempted.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct QuestionAnalysis {
    /// e.g. "data_analysis", "web_scraping", "pdf_processing"
    #[serde(default = "unknown_task_type")]
    pub task_type: String,
    #[serde(default)]
    pub steps: Vec<serde_json::Value>,
    /// URLs or files mentioned by the question.
    #[serde(default)]
    pub data_sources: Vec<serde_json::Value>,
    /// number, string, boolean, json or image
    #[serde(default)]
    pub answer_format: Option<String>,
    #[serde(default)]
    pub tools_needed: Vec<serde_json::Value>,
}

fn unknown_task_type() -> String {
    "unknown".to_string()
}

impl QuestionAnalysis {
    pub fn answer_format(&self) -> AnswerFormat {
        AnswerFormat::from_declared(self.answer_format.as_deref())
    }

    /// String entries of `data_sources`; anything else the model put there is ignored.
    pub fn data_source_urls(&self) -> Vec<String> {
        self.data_sources
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
