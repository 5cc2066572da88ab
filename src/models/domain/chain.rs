use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::answer::Answer;

/// Which resolution strategy produced an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    DirectedScrape,
    DataFiles,
    DirectLlm,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStrategy::DirectedScrape => write!(f, "directed_scrape"),
            ResolutionStrategy::DataFiles => write!(f, "data_files"),
            ResolutionStrategy::DirectLlm => write!(f, "direct_llm"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainState {
    Running,
    DoneSuccess,
    DoneWrongNoNext,
    DoneTimeout,
    DoneError,
}

impl fmt::Display for ChainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainState::Running => write!(f, "RUNNING"),
            ChainState::DoneSuccess => write!(f, "DONE_SUCCESS"),
            ChainState::DoneWrongNoNext => write!(f, "DONE_WRONG_NO_NEXT"),
            ChainState::DoneTimeout => write!(f, "DONE_TIMEOUT"),
            ChainState::DoneError => write!(f, "DONE_ERROR"),
        }
    }
}

/// Outcome of one visited quiz URL.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizStepResult {
    pub url: String,
    pub question_text: Option<String>,
    pub answer: Option<Answer>,
    pub strategy: Option<ResolutionStrategy>,
    pub correct: bool,
    pub next_url: Option<String>,
    /// Server-provided reason for a wrong answer, or the error that aborted the step.
    pub failure_reason: Option<String>,
    pub is_error: bool,
    pub raw_submission_response: Option<serde_json::Value>,
    pub completed_at: DateTime<Utc>,
}

impl QuizStepResult {
    pub fn failed(url: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            url: url.into(),
            question_text: None,
            answer: None,
            strategy: None,
            correct: false,
            next_url: None,
            failure_reason: Some(error.to_string()),
            is_error: true,
            raw_submission_response: None,
            completed_at: Utc::now(),
        }
    }
}

/// What the controller does after a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Continue(String),
    Stop(ChainState),
}

impl Transition {
    /// Decides the next move from a completed step.
    ///
    /// A wrong answer still advances when the server hands out a next URL.
    pub fn after(step: &QuizStepResult) -> Self {
        if step.is_error {
            return Transition::Stop(ChainState::DoneError);
        }

        match (step.correct, step.next_url.as_deref()) {
            (_, Some(next)) if !next.trim().is_empty() => Transition::Continue(next.to_string()),
            (true, _) => Transition::Stop(ChainState::DoneSuccess),
            (false, _) => Transition::Stop(ChainState::DoneWrongNoNext),
        }
    }
}

/// Aggregate over one chain run. `steps` is append-only and chronological.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ChainResult {
    pub run_id: Uuid,
    pub initial_url: String,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<QuizStepResult>,
    pub final_state: ChainState,
    pub elapsed_seconds: f64,
    pub total_steps: usize,
}

impl ChainResult {
    pub fn last_step(&self) -> Option<&QuizStepResult> {
        self.steps.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(correct: bool, next_url: Option<&str>) -> QuizStepResult {
        QuizStepResult {
            url: "https://quiz.example/q1".to_string(),
            question_text: Some("What is 2 + 2?".to_string()),
            answer: Some(Answer::Integer(4)),
            strategy: Some(ResolutionStrategy::DirectLlm),
            correct,
            next_url: next_url.map(str::to_string),
            failure_reason: None,
            is_error: false,
            raw_submission_response: None,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn correct_with_next_continues() {
        assert_eq!(
            Transition::after(&step(true, Some("https://quiz.example/q2"))),
            Transition::Continue("https://quiz.example/q2".to_string())
        );
    }

    #[test]
    fn wrong_with_next_still_continues() {
        assert_eq!(
            Transition::after(&step(false, Some("https://quiz.example/q2"))),
            Transition::Continue("https://quiz.example/q2".to_string())
        );
    }

    #[test]
    fn terminal_transitions() {
        assert_eq!(
            Transition::after(&step(true, None)),
            Transition::Stop(ChainState::DoneSuccess)
        );
        assert_eq!(
            Transition::after(&step(false, None)),
            Transition::Stop(ChainState::DoneWrongNoNext)
        );
        assert_eq!(
            Transition::after(&step(true, Some("  "))),
            Transition::Stop(ChainState::DoneSuccess)
        );
        assert_eq!(
            Transition::after(&QuizStepResult::failed("https://quiz.example/q1", "boom")),
            Transition::Stop(ChainState::DoneError)
        );
    }

    #[test]
    fn chain_state_serializes_in_screaming_case() {
        assert_eq!(
            serde_json::to_string(&ChainState::DoneWrongNoNext).unwrap(),
            "\"DONE_WRONG_NO_NEXT\""
        );
    }
}
