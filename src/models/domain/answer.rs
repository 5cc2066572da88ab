use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::analysis::AnswerFormat;

/// Free-text LLM output at or below this length is treated as a short token
/// and left alone by [`clean_llm_output`].
const LONG_OUTPUT_THRESHOLD: usize = 50;

const TRUTHY_TOKENS: [&str; 3] = ["true", "yes", "1"];

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?:json)?\s*").expect("LEADING_FENCE is a valid regex"));
static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*```$").expect("TRAILING_FENCE is a valid regex"));

/// A submitted answer. Serialized untagged, so the wire sees a bare JSON value.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Answer {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl Answer {
    /// The format this value satisfies.
    pub fn format(&self) -> AnswerFormat {
        match self {
            Answer::Integer(_) | Answer::Float(_) => AnswerFormat::Number,
            Answer::Boolean(_) => AnswerFormat::Boolean,
            Answer::Json(_) => AnswerFormat::Json,
            Answer::Text(_) => AnswerFormat::Text,
        }
    }

    /// Coerces raw text into the declared format. Never fails: text that does not
    /// fit the format is kept as text.
    pub fn coerce(raw: &str, format: AnswerFormat) -> Self {
        let trimmed = raw.trim();
        match format {
            AnswerFormat::Number => {
                if let Ok(n) = trimmed.parse::<i64>() {
                    Answer::Integer(n)
                } else {
                    match trimmed.parse::<f64>() {
                        Ok(f) if f.is_finite() => Answer::Float(f),
                        _ => Answer::Text(trimmed.to_string()),
                    }
                }
            }
            AnswerFormat::Boolean => {
                let lowered = trimmed.to_lowercase();
                Answer::Boolean(TRUTHY_TOKENS.contains(&lowered.as_str()))
            }
            AnswerFormat::Json => match serde_json::from_str(raw) {
                Ok(value) => Answer::Json(value),
                Err(_) => Answer::Text(raw.to_string()),
            },
            AnswerFormat::Text => Answer::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Boolean(b) => write!(f, "{}", b),
            Answer::Integer(n) => write!(f, "{}", n),
            Answer::Float(x) => write!(f, "{}", x),
            Answer::Text(s) => write!(f, "{}", s),
            Answer::Json(v) => write!(f, "{}", v),
        }
    }
}

/// Strips markdown fences from long LLM output.
///
/// JSON-looking output is only inspected, never unwrapped: picking fields out of a
/// model's JSON guess tends to submit template placeholders.
pub fn clean_llm_output(raw: &str) -> String {
    if raw.chars().count() <= LONG_OUTPUT_THRESHOLD {
        return raw.to_string();
    }

    let without_leading = LEADING_FENCE.replace(raw.trim(), "");
    let cleaned = TRAILING_FENCE
        .replace(without_leading.trim(), "")
        .into_owned();

    if cleaned.trim_start().starts_with('{')
        && serde_json::from_str::<serde_json::Value>(&cleaned).is_ok()
    {
        log::warn!("Answer looks like a JSON template; submitting it unchanged");
    }

    cleaned
}
