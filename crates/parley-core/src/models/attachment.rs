use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::constants::{allowed_type_for_extension, normalize_mime};

/// A file selected by the user, not yet validated.
///
/// The bytes are reference counted, so cloning a candidate (for a snapshot or
/// an extraction task) never copies the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    name: String,
    mime_type: String,
    data: Bytes,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Build a candidate whose MIME type is inferred from the file name.
    pub fn with_guessed_type(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime_type = guess_mime_type(&name);
        Self::new(name, mime_type, data)
    }

    /// Read a file from disk. The MIME type is guessed from the extension
    /// unless `mime_override` is given.
    pub fn from_path(path: impl AsRef<Path>, mime_override: Option<&str>) -> io::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        Ok(Self::from_named_bytes(path, data, mime_override))
    }

    /// Build a candidate for bytes already read from `path`.
    pub fn from_named_bytes(
        path: &Path,
        data: impl Into<Bytes>,
        mime_override: Option<&str>,
    ) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = match mime_override {
            Some(mime) => normalize_mime(mime),
            None => guess_mime_type(&name),
        };
        Self::new(name, mime_type, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn byte_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lower-case text after the last `.` of the name, if there is one.
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.name)
    }
}

/// Lower-case extension of a file name, without the dot.
pub fn file_extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// MIME type a picker would report for a file name.
///
/// Extensions from the allowed table map to their table MIME type; anything
/// else falls back to `mime_guess` so rejections still name a real type.
pub fn guess_mime_type(name: &str) -> String {
    if let Some(allowed) = file_extension(name)
        .as_deref()
        .and_then(allowed_type_for_extension)
    {
        return allowed.mime_type.to_string();
    }

    let file_name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);
    normalize_mime(mime_guess::from_path(file_name).first_or_octet_stream().as_ref())
}

/// Identifier of an attachment within one compose session.
///
/// Allocated from a session-local counter, so two files with the same name
/// still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(pub u64);

impl Display for AttachmentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "att-{}", self.0)
    }
}

impl FromStr for AttachmentId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("att-").unwrap_or(s);
        raw.parse::<u64>()
            .map(AttachmentId)
            .map_err(|_| anyhow::anyhow!("Invalid attachment id: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentStatus {
    Pending,
    Processing,
    Ready,
    Error,
}

impl Display for AttachmentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AttachmentStatus::Pending => write!(f, "pending"),
            AttachmentStatus::Processing => write!(f, "processing"),
            AttachmentStatus::Ready => write!(f, "ready"),
            AttachmentStatus::Error => write!(f, "error"),
        }
    }
}

/// Tag documenting that only extracted text is ever forwarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    #[default]
    Text,
}

/// Output of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedAttachment {
    pub name: String,
    pub mime_type: String,
    pub byte_size: u64,
    pub text_content: String,
    pub encoding: ContentEncoding,
}

impl ProcessedAttachment {
    pub fn from_candidate(file: &CandidateFile, text_content: String) -> Self {
        Self {
            name: file.name().to_string(),
            mime_type: file.mime_type().to_string(),
            byte_size: file.byte_size(),
            text_content,
            encoding: ContentEncoding::Text,
        }
    }
}

/// Lifecycle state of an attachment.
///
/// The result only exists in `Ready` and the message only in `Error`, so a
/// record can never carry both or neither by mistake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentState {
    Pending,
    Processing,
    Ready(Arc<ProcessedAttachment>),
    Error(String),
}

impl AttachmentState {
    pub fn status(&self) -> AttachmentStatus {
        match self {
            AttachmentState::Pending => AttachmentStatus::Pending,
            AttachmentState::Processing => AttachmentStatus::Processing,
            AttachmentState::Ready(_) => AttachmentStatus::Ready,
            AttachmentState::Error(_) => AttachmentStatus::Error,
        }
    }
}

/// Tracked lifecycle entry for one accepted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRecord {
    pub id: AttachmentId,
    pub source: CandidateFile,
    pub state: AttachmentState,
    pub added_at: DateTime<Utc>,
}

impl AttachmentRecord {
    pub fn new(id: AttachmentId, source: CandidateFile) -> Self {
        Self {
            id,
            source,
            state: AttachmentState::Pending,
            added_at: Utc::now(),
        }
    }

    pub fn status(&self) -> AttachmentStatus {
        self.state.status()
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            AttachmentState::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&ProcessedAttachment> {
        match &self.state {
            AttachmentState::Ready(processed) => Some(processed),
            _ => None,
        }
    }

    /// Pending or processing: the file has not reached a terminal state yet.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self.state,
            AttachmentState::Pending | AttachmentState::Processing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_last_segment() {
        let file = CandidateFile::new("Report.Final.PDF", "application/pdf", Vec::new());
        assert_eq!(file.extension().as_deref(), Some("pdf"));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn guessed_type_prefers_allowed_table() {
        assert_eq!(guess_mime_type("notes.md"), "text/markdown");
        assert_eq!(guess_mime_type("letter.DOCX"), crate::constants::MIME_DOCX);
        assert_eq!(guess_mime_type("photo.png"), "image/png");
        assert_eq!(guess_mime_type("no_extension"), "application/octet-stream");
    }

    #[test]
    fn from_path_reads_bytes_and_guesses_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, b"a,b\n1,2\n").unwrap();

        let file = CandidateFile::from_path(&path, None).unwrap();
        assert_eq!(file.name(), "data.csv");
        assert_eq!(file.mime_type(), "text/csv");
        assert_eq!(file.byte_size(), 8);

        let overridden = CandidateFile::from_path(&path, Some(" Text/Plain ")).unwrap();
        assert_eq!(overridden.mime_type(), "text/plain");

        assert!(CandidateFile::from_path(dir.path().join("missing.txt"), None).is_err());
    }

    #[test]
    fn attachment_id_round_trips_through_display() {
        let id = AttachmentId(42);
        assert_eq!(id.to_string(), "att-42");
        assert_eq!("att-42".parse::<AttachmentId>().unwrap(), id);
        assert_eq!("7".parse::<AttachmentId>().unwrap(), AttachmentId(7));
        assert!("att-x".parse::<AttachmentId>().is_err());
    }

    #[test]
    fn record_projections_follow_state() {
        let file = CandidateFile::new("a.txt", "text/plain", b"hi".to_vec());
        let mut record = AttachmentRecord::new(AttachmentId(1), file.clone());
        assert_eq!(record.status(), AttachmentStatus::Pending);
        assert!(record.is_in_flight());
        assert!(record.result().is_none());
        assert!(record.error_message().is_none());

        let processed = ProcessedAttachment::from_candidate(&file, "hi".to_string());
        record.state = AttachmentState::Ready(Arc::new(processed));
        assert_eq!(record.status(), AttachmentStatus::Ready);
        assert_eq!(record.result().unwrap().text_content, "hi");
        assert!(record.error_message().is_none());
        assert!(!record.is_in_flight());

        record.state = AttachmentState::Error("boom".to_string());
        assert_eq!(record.error_message(), Some("boom"));
        assert!(record.result().is_none());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&AttachmentStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        assert_eq!(
            serde_json::to_string(&ContentEncoding::Text).unwrap(),
            "\"text\""
        );
    }
}
