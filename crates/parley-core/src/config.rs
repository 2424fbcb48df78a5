//! Configuration module
//!
//! Runtime settings for the attachment pipeline and the webhook relay, read
//! from the environment (and a `.env` file when present). The attachment
//! limits themselves are fixed in [`crate::constants`].

use std::env;
use std::time::Duration;

use crate::constants::MAX_FILES;

const HTTP_TIMEOUT_SECS: u64 = 60;
const EXTRACTION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_ATTACHMENT_QUERY: &str = "Attached files";

/// Settings a compose session needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound for one file's extraction. `None` disables the bound.
    pub extraction_timeout: Option<Duration>,
    /// Number of extractions allowed to run at the same time.
    pub max_concurrent_extractions: usize,
    /// Query sent when the user attaches files without typing anything.
    pub default_attachment_query: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            extraction_timeout: Some(Duration::from_secs(EXTRACTION_TIMEOUT_SECS)),
            max_concurrent_extractions: MAX_FILES,
            default_attachment_query: Some(DEFAULT_ATTACHMENT_QUERY.to_string()),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct ParleyConfig {
    pub environment: String,
    pub webhook_url: Option<String>,
    pub access_token: Option<String>,
    pub http_timeout_secs: u64,
    pub extraction_timeout_secs: u64,
    pub max_concurrent_extractions: usize,
    pub default_attachment_query: Option<String>,
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            webhook_url: None,
            access_token: None,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            extraction_timeout_secs: EXTRACTION_TIMEOUT_SECS,
            max_concurrent_extractions: MAX_FILES,
            default_attachment_query: Some(DEFAULT_ATTACHMENT_QUERY.to_string()),
        }
    }
}

impl ParleyConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or(defaults.environment);

        let webhook_url = lookup("PARLEY_WEBHOOK_URL")
            .or_else(|| lookup("N8N_WEBHOOK_URL"))
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let access_token = lookup("PARLEY_ACCESS_TOKEN").filter(|token| !token.trim().is_empty());

        let http_timeout_secs = lookup("PARLEY_HTTP_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(HTTP_TIMEOUT_SECS);

        let extraction_timeout_secs = lookup("PARLEY_EXTRACTION_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(EXTRACTION_TIMEOUT_SECS);

        let max_concurrent_extractions = lookup("PARLEY_MAX_CONCURRENT_EXTRACTIONS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(MAX_FILES);

        // An explicitly empty value turns the default query off.
        let default_attachment_query = match lookup("PARLEY_DEFAULT_ATTACHMENT_QUERY") {
            Some(query) if query.trim().is_empty() => None,
            Some(query) => Some(query),
            None => defaults.default_attachment_query,
        };

        let config = Self {
            environment,
            webhook_url,
            access_token,
            http_timeout_secs,
            extraction_timeout_secs,
            max_concurrent_extractions,
            default_attachment_query,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_concurrent_extractions == 0 {
            return Err(anyhow::anyhow!(
                "PARLEY_MAX_CONCURRENT_EXTRACTIONS must be at least 1"
            ));
        }

        if let Some(url) = &self.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!(
                    "PARLEY_WEBHOOK_URL must be an http(s) URL, got '{}'",
                    url
                ));
            }
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn extraction_timeout(&self) -> Option<Duration> {
        match self.extraction_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            extraction_timeout: self.extraction_timeout(),
            max_concurrent_extractions: self.max_concurrent_extractions,
            default_attachment_query: self.default_attachment_query.clone(),
        }
    }
}
