use serde::Deserialize;
use validator::Validate;

use crate::errors::{AppError, AppResult};

const REQUIRED_FIELDS: [&str; 3] = ["email", "secret", "url"];

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SolveQuizRequest {
    #[validate(length(min = 1, max = 320))]
    pub email: String,

    #[validate(length(min = 1))]
    pub secret: String,

    #[validate(url)]
    pub url: String,
}

impl SolveQuizRequest {
    /// Parses a raw request body, distinguishing malformed JSON from missing fields.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|_| AppError::BadRequest("Invalid JSON format".to_string()))?;

        if value.is_null() {
            return Err(AppError::BadRequest("Empty JSON payload".to_string()));
        }

        let has_all_fields = value.as_object().is_some_and(|fields| {
            REQUIRED_FIELDS
                .iter()
                .all(|name| fields.get(*name).is_some_and(|v| v.is_string()))
        });
        if !has_all_fields {
            return Err(AppError::BadRequest(
                "Missing required fields: email, secret, url".to_string(),
            ));
        }

        let request: SolveQuizRequest = serde_json::from_value(value)
            .map_err(|e| AppError::BadRequest(format!("Invalid request: {}", e)))?;
        request.validate()?;

        Ok(request)
    }
}
