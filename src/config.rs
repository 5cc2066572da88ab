use std::{env, str::FromStr, time::Duration};

use secrecy::{ExposeSecret, SecretString};

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct Config {
    pub email: String,
    pub secret: SecretString,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub quiz_timeout_secs: u64,
    pub llm_api_key: SecretString,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub llm_timeout_secs: u64,
    pub navigation_timeout_ms: u64,
    pub render_settle_ms: u64,
    pub http_timeout_secs: u64,
    pub browser_headless: bool,
    pub browser_no_sandbox: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            email: String::new(),
            secret: SecretString::from(String::new()),
            web_server_host: "0.0.0.0".to_string(),
            web_server_port: 5000,
            quiz_timeout_secs: 180,
            llm_api_key: SecretString::from(String::new()),
            llm_base_url: "https://aipipe.org/openai/v1".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_temperature: 0.1,
            llm_max_tokens: 4096,
            llm_timeout_secs: 120,
            navigation_timeout_ms: 30_000,
            render_settle_ms: 3_000,
            http_timeout_secs: 30,
            browser_headless: true,
            browser_no_sandbox: false,
        }
    }
}

fn parsed_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            email: env::var("EMAIL").unwrap_or_default(),
            secret: SecretString::from(env::var("SECRET").unwrap_or_default()),
            web_server_host: env::var("HOST").unwrap_or(defaults.web_server_host),
            web_server_port: parsed_var("PORT", defaults.web_server_port),
            quiz_timeout_secs: parsed_var("QUIZ_TIMEOUT", defaults.quiz_timeout_secs),
            llm_api_key: SecretString::from(env::var("AIPIPE_TOKEN").unwrap_or_default()),
            llm_base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: env::var("DEFAULT_MODEL").unwrap_or(defaults.llm_model),
            llm_temperature: parsed_var("TEMPERATURE", defaults.llm_temperature),
            llm_max_tokens: parsed_var("MAX_TOKENS", defaults.llm_max_tokens),
            llm_timeout_secs: parsed_var("LLM_TIMEOUT", defaults.llm_timeout_secs),
            navigation_timeout_ms: parsed_var(
                "NAVIGATION_TIMEOUT_MS",
                defaults.navigation_timeout_ms,
            ),
            render_settle_ms: parsed_var("RENDER_SETTLE_MS", defaults.render_settle_ms),
            http_timeout_secs: parsed_var("HTTP_TIMEOUT", defaults.http_timeout_secs),
            browser_headless: parsed_var("BROWSER_HEADLESS", defaults.browser_headless),
            browser_no_sandbox: parsed_var("BROWSER_NO_SANDBOX", defaults.browser_no_sandbox),
        }
    }

    /// Credentials are required both to authenticate callers and to sign submissions.
    pub fn validate_for_production(&self) -> AppResult<()> {
        if self.email.trim().is_empty() || self.secret.expose_secret().trim().is_empty() {
            return Err(AppError::ValidationError(
                "EMAIL and SECRET must be set in environment variables".to_string(),
            ));
        }

        if self.llm_api_key.expose_secret().is_empty() {
            log::warn!("AIPIPE_TOKEN is not set; every LLM-backed strategy will fail");
        }

        Ok(())
    }

    /// Exact, case-sensitive comparison against the configured identity.
    pub fn credentials_match(&self, email: &str, secret: &str) -> bool {
        self.email == email && self.secret.expose_secret() == secret
    }

    pub fn quiz_timeout(&self) -> Duration {
        Duration::from_secs(self.quiz_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn render_settle(&self) -> Duration {
        Duration::from_millis(self.render_settle_ms)
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            email: "student@example.com".to_string(),
            secret: SecretString::from("s3cret".to_string()),
            web_server_host: "127.0.0.1".to_string(),
            quiz_timeout_secs: 5,
            ..Self::default()
        }
    }
}
