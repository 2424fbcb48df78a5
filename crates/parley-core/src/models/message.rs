use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attachment::{ContentEncoding, ProcessedAttachment};

/// An attachment as forwarded to the automation webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFile {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(rename = "size")]
    pub byte_size: u64,
    #[serde(rename = "content")]
    pub text_content: String,
    pub encoding: ContentEncoding,
}

impl OutboundFile {
    /// The part of the file kept in message history.
    pub fn metadata(&self) -> FileMetadata {
        FileMetadata {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            byte_size: self.byte_size,
        }
    }
}

impl From<&ProcessedAttachment> for OutboundFile {
    fn from(processed: &ProcessedAttachment) -> Self {
        Self {
            name: processed.name.clone(),
            mime_type: processed.mime_type.clone(),
            byte_size: processed.byte_size,
            text_content: processed.text_content.clone(),
            encoding: processed.encoding,
        }
    }
}

/// File information shown alongside a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(rename = "size")]
    pub byte_size: u64,
}

/// Outbound message payload for the automation webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub request_id: Uuid,
    pub session_id: String,
    #[serde(default)]
    pub files: Vec<OutboundFile>,
}

impl ChatRequest {
    /// New request with a fresh request id.
    pub fn new(query: impl Into<String>, session_id: impl Into<String>, files: Vec<OutboundFile>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
            request_id: Uuid::new_v4(),
            session_id: session_id.into(),
            files,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn file_metadata(&self) -> Vec<FileMetadata> {
        self.files.iter().map(OutboundFile::metadata).collect()
    }
}

/// Reply returned by the automation webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(rename = "Output", default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ChatResponse {
    /// Trim the session id returned by the workflow engine, falling back to
    /// the id the request was sent with.
    pub fn normalize_session_id(mut self, fallback: &str) -> Self {
        let session_id = self
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| fallback.trim())
            .to_string();
        self.session_id = Some(session_id);
        self
    }
}
