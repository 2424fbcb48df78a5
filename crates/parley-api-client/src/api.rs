//! Domain methods for the webhook client.

use anyhow::Result;
use parley_core::models::{ChatRequest, ChatResponse};
use parley_core::{validate_outbound, AppError};

use crate::WebhookClient;

impl WebhookClient {
    /// Relay a chat message to the automation webhook.
    ///
    /// The attachment list is checked against the relay limits before
    /// anything is sent. The returned session id is trimmed, falling back to
    /// the one the request carried.
    #[tracing::instrument(skip(self, request), fields(request_id = %request.request_id, files = request.files.len()))]
    pub async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse> {
        validate_outbound(&request.files).map_err(AppError::Outbound)?;

        let response: ChatResponse = self.post_json(request).await?;
        let response = response.normalize_session_id(&request.session_id);

        tracing::info!(
            session_id = response.session_id.as_deref().unwrap_or_default(),
            "Webhook replied"
        );
        Ok(response)
    }
}
