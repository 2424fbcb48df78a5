//! HTTP client for the automation webhook.
//!
//! Provides a minimal client with optional Bearer auth, a generic JSON POST
//! helper and the domain method that relays an outbound chat message.
//! The CLI uses this client directly.

pub mod api;

use std::time::Duration;

use anyhow::{Context, Result};
use parley_core::{AppError, ParleyConfig};
use reqwest::Client;
use serde::de::DeserializeOwned;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Authentication strategy for the webhook.
#[derive(Clone, Debug, Default)]
pub enum Auth {
    /// No credentials are sent.
    #[default]
    None,
    /// `Authorization: Bearer {token}`
    Bearer(String),
}

/// HTTP client for the automation webhook.
#[derive(Clone, Debug)]
pub struct WebhookClient {
    client: Client,
    webhook_url: String,
    auth: Auth,
}

impl WebhookClient {
    pub fn new(webhook_url: String, auth: Auth) -> Result<Self> {
        Self::with_timeout(webhook_url, auth, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(webhook_url: String, auth: Auth, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            webhook_url: webhook_url.trim().to_string(),
            auth,
        })
    }

    /// Create a client from configuration: webhook URL, optional access token
    /// and HTTP timeout.
    pub fn from_config(config: &ParleyConfig) -> Result<Self> {
        let webhook_url = config.webhook_url.clone().ok_or_else(|| {
            AppError::Config(
                "Missing webhook URL. Set PARLEY_WEBHOOK_URL or N8N_WEBHOOK_URL".to_string(),
            )
        })?;

        let auth = match &config.access_token {
            Some(token) => Auth::Bearer(token.clone()),
            None => Auth::None,
        };

        Self::with_timeout(webhook_url, auth, config.http_timeout())
    }

    /// Create a client from the environment (see [`ParleyConfig::from_env`]).
    pub fn from_env() -> Result<Self> {
        let config = ParleyConfig::from_env()?;
        Self::from_config(&config)
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
        }
    }

    /// POST JSON body to the webhook and deserialize the response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(&self, body: &B) -> Result<T> {
        let request = self.client.post(&self.webhook_url).json(body);
        let request = self.apply_auth(request);

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Webhook {
                status: status.as_u16(),
                message: error_text,
            }
            .into());
        }

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }
}

pub use parley_core::models::{ChatRequest, ChatResponse};
