use serde::Serialize;

use crate::models::domain::ChainResult;

#[derive(Debug, Serialize)]
pub struct SolveQuizResponse {
    pub status: &'static str,
    pub message: String,
    pub result: ChainResult,
}

impl SolveQuizResponse {
    pub fn completed(result: ChainResult) -> Self {
        let message = format!(
            "Quiz chain finished in state {} after {} step(s)",
            result.final_state, result.total_steps
        );
        Self {
            status: "success",
            message,
            result,
        }
    }
}
