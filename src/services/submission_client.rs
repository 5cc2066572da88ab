use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::{
    config::Config,
    errors::{SolverError, SolverResult},
    models::{
        domain::Answer,
        dto::submission::{SubmissionOutcome, SubmissionPayload, SubmissionResponse},
    },
};

/// Sends an answer for `quiz_url` to the page's submit endpoint.
#[async_trait]
pub trait AnswerSubmitter: Send + Sync {
    async fn submit(
        &self,
        submit_url: &str,
        quiz_url: &str,
        answer: &Answer,
    ) -> SolverResult<SubmissionOutcome>;
}

pub struct HttpSubmissionClient {
    client: reqwest::Client,
    email: String,
    secret: SecretString,
}

impl HttpSubmissionClient {
    pub fn new(client: reqwest::Client, email: impl Into<String>, secret: SecretString) -> Self {
        Self {
            client,
            email: email.into(),
            secret,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self::new(client, config.email.clone(), config.secret.clone())
    }
}

#[async_trait]
impl AnswerSubmitter for HttpSubmissionClient {
    async fn submit(
        &self,
        submit_url: &str,
        quiz_url: &str,
        answer: &Answer,
    ) -> SolverResult<SubmissionOutcome> {
        let transport_error = |e: reqwest::Error| SolverError::SubmissionTransport {
            url: submit_url.to_string(),
            reason: e.to_string(),
        };

        let payload = SubmissionPayload {
            email: &self.email,
            secret: self.secret.expose_secret(),
            url: quiz_url,
            answer,
        };
        log::info!("Submitting answer '{}' for {} to {}", answer, quiz_url, submit_url);

        let response = self
            .client
            .post(submit_url)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        let raw = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));

        if status != StatusCode::OK {
            log::warn!("Submission to {} returned HTTP {}", submit_url, status.as_u16());
            return Ok(SubmissionOutcome::rejected(
                format!("HTTP {}", status.as_u16()),
                raw,
            ));
        }

        match serde_json::from_value::<SubmissionResponse>(raw.clone()) {
            Ok(response) => {
                let outcome = response.into_outcome(raw);
                log::info!(
                    "Submission result: correct={}, next_url={:?}, reason={:?}",
                    outcome.correct,
                    outcome.next_url,
                    outcome.reason
                );
                Ok(outcome)
            }
            Err(e) => {
                log::warn!("Unexpected submission response from {}: {}", submit_url, e);
                Ok(SubmissionOutcome::rejected(
                    format!("unexpected response: {}", e),
                    raw,
                ))
            }
        }
    }
}
