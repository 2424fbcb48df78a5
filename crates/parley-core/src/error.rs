//! Error types module
//!
//! Each stage of the attachment pipeline has its own error enum: validation
//! failures block admission, extraction failures end up as the `error` status
//! of one record, and `NotReadyError` gates the send action. `AppError` unifies
//! them for the binaries and describes how each should be reported.

use std::io;

const MIB: u64 = 1024 * 1024;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like a document that failed to parse
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "FILE_TOO_LARGE")
    fn error_code(&self) -> &'static str;

    /// Whether repeating the action later can succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the user
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Admission policy violations. The candidate never enters the tracker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File size exceeds {}MB limit", .max / MIB)]
    TooLarge { size: u64, max: u64 },

    #[error("File type not supported: {mime_type} does not match {file_name}")]
    UnsupportedType {
        file_name: String,
        mime_type: String,
    },

    #[error("Maximum {max} files allowed")]
    TooManyFiles { count: usize, max: usize },

    #[error("Total file size exceeds {}MB limit", .max / MIB)]
    TotalTooLarge { total: u64, max: u64 },
}

/// A file turned away at admission, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub file_name: String,
    pub error: ValidationError,
}

/// Per-file extraction failures, recorded on the file's attachment record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("Failed to read {file_name} as UTF-8 text: invalid byte sequence at offset {valid_up_to}")]
    DecodeError {
        file_name: String,
        valid_up_to: usize,
    },

    #[error("Failed to extract text from {format}: {message}")]
    ParseError {
        format: &'static str,
        message: String,
    },

    #[error("Failed to extract text from {format}: {reason}")]
    UnsupportedStructure {
        format: &'static str,
        reason: String,
    },

    #[error("Text extraction timed out after {secs}s")]
    TimedOut { secs: u64 },

    /// A contract violation inside the pipeline, e.g. an unmapped MIME type
    /// reaching the extractor.
    #[error("Internal extraction error: {0}")]
    Internal(String),
}

/// Submission attempted while attachments are still being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{in_flight} attachment(s) still processing")]
pub struct NotReadyError {
    pub in_flight: usize,
}

/// Failures of compose-session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The batch as a whole broke a limit. Files that also failed their own
    /// checks are listed in `rejected`.
    #[error("{error}")]
    BatchRejected {
        error: ValidationError,
        rejected: Vec<Rejection>,
    },

    #[error(transparent)]
    NotReady(#[from] NotReadyError),

    #[error("Nothing to send: enter a message or attach a file")]
    NothingToSend,

    #[error("Attachment tracker has shut down")]
    TrackerClosed,
}

/// Relay-side re-check of an outbound payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutboundError {
    #[error("Maximum {max} files allowed")]
    TooManyFiles { count: usize, max: usize },

    #[error("Invalid file format: {name}")]
    InvalidFileFormat { name: String },

    #[error("File {name} exceeds size limit")]
    FileTooLarge { name: String },

    #[error("Total file size exceeds limit")]
    TotalTooLarge { total: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Not ready: {0}")]
    NotReady(#[from] NotReadyError),

    #[error("Nothing to send")]
    NothingToSend,

    #[error("Invalid outbound payload: {0}")]
    Outbound(#[from] OutboundError),

    #[error("Webhook error ({status}): {message}")]
    Webhook { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Validation(e) => AppError::Validation(e),
            SessionError::BatchRejected { error, .. } => AppError::Validation(error),
            SessionError::NotReady(e) => AppError::NotReady(e),
            SessionError::NothingToSend => AppError::NothingToSend,
            SessionError::TrackerClosed => AppError::Internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, bool, LogLevel) {
    match err {
        AppError::Validation(ValidationError::TooLarge { .. }) => (
            "FILE_TOO_LARGE",
            false,
            Some("Attach a file of at most 5MB"),
            false,
            LogLevel::Debug,
        ),
        AppError::Validation(ValidationError::UnsupportedType { .. }) => (
            "UNSUPPORTED_FILE_TYPE",
            false,
            Some("Attach a PDF, TXT, CSV, JSON, MD, DOC or DOCX file"),
            false,
            LogLevel::Debug,
        ),
        AppError::Validation(ValidationError::TooManyFiles { .. }) => (
            "TOO_MANY_FILES",
            false,
            Some("Remove an attachment before adding more"),
            false,
            LogLevel::Debug,
        ),
        AppError::Validation(ValidationError::TotalTooLarge { .. }) => (
            "TOTAL_TOO_LARGE",
            false,
            Some("Remove an attachment or attach smaller files"),
            false,
            LogLevel::Debug,
        ),
        AppError::Extraction(ExtractionError::Internal(_)) => (
            "EXTRACTION_INTERNAL_ERROR",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        AppError::Extraction(ExtractionError::TimedOut { .. }) => (
            "EXTRACTION_TIMED_OUT",
            true,
            Some("Remove the file and attach it again"),
            false,
            LogLevel::Warn,
        ),
        AppError::Extraction(_) => (
            "EXTRACTION_FAILED",
            false,
            Some("Check the file is not corrupt or password protected"),
            false,
            LogLevel::Warn,
        ),
        AppError::NotReady(_) => (
            "ATTACHMENTS_NOT_READY",
            true,
            Some("Wait for file processing to finish"),
            false,
            LogLevel::Debug,
        ),
        AppError::NothingToSend => (
            "NOTHING_TO_SEND",
            false,
            Some("Enter a message or attach a file"),
            false,
            LogLevel::Debug,
        ),
        AppError::Outbound(_) => (
            "INVALID_PAYLOAD",
            false,
            Some("Check attachment count and sizes"),
            false,
            LogLevel::Warn,
        ),
        AppError::Webhook { .. } => (
            "WEBHOOK_ERROR",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Error,
        ),
        AppError::Config(_) => (
            "CONFIG_ERROR",
            false,
            Some("Check PARLEY_* environment variables"),
            false,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Extraction(ExtractionError::Internal(_)) => {
                "Failed to process file".to_string()
            }
            AppError::Extraction(e) => e.to_string(),
            AppError::NotReady(_) => "Please wait for files to finish processing".to_string(),
            AppError::NothingToSend => "Nothing to send".to_string(),
            AppError::Outbound(e) => e.to_string(),
            AppError::Webhook { message, .. } => {
                if message.is_empty() {
                    "Failed to send message".to_string()
                } else {
                    message.clone()
                }
            }
            AppError::Config(msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_mention_limits() {
        let err = ValidationError::TooLarge {
            size: 6 * MIB,
            max: 5 * MIB,
        };
        assert_eq!(err.to_string(), "File size exceeds 5MB limit");

        let err = ValidationError::TotalTooLarge {
            total: 11 * MIB,
            max: 10 * MIB,
        };
        assert_eq!(err.to_string(), "Total file size exceeds 10MB limit");

        let err = ValidationError::TooManyFiles { count: 6, max: 5 };
        assert_eq!(err.to_string(), "Maximum 5 files allowed");
    }

    #[test]
    fn extraction_messages_name_the_format() {
        let err = ExtractionError::ParseError {
            format: "PDF",
            message: "invalid file header".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to extract text from PDF: invalid file header"
        );
    }

    #[test]
    fn test_error_metadata_validation() {
        let err = AppError::from(ValidationError::TooManyFiles { count: 6, max: 5 });
        assert_eq!(err.error_code(), "TOO_MANY_FILES");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Maximum 5 files allowed");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_internal_extraction_is_hidden() {
        let err = AppError::from(ExtractionError::Internal("unmapped type".to_string()));
        assert_eq!(err.error_code(), "EXTRACTION_INTERNAL_ERROR");
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to process file");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_not_ready() {
        let err = AppError::from(SessionError::NotReady(NotReadyError { in_flight: 2 }));
        assert_eq!(err.error_code(), "ATTACHMENTS_NOT_READY");
        assert!(err.is_recoverable());
        assert_eq!(
            err.suggested_action(),
            Some("Wait for file processing to finish")
        );
    }

    #[test]
    fn batch_rejection_reports_the_batch_limit() {
        let err = SessionError::BatchRejected {
            error: ValidationError::TooManyFiles { count: 6, max: 5 },
            rejected: vec![Rejection {
                file_name: "evil.pdf".to_string(),
                error: ValidationError::UnsupportedType {
                    file_name: "evil.pdf".to_string(),
                    mime_type: "text/plain".to_string(),
                },
            }],
        };
        assert_eq!(err.to_string(), "Maximum 5 files allowed");

        let app = AppError::from(err);
        assert_eq!(app.error_code(), "TOO_MANY_FILES");
    }

    #[test]
    fn session_error_maps_tracker_closed_to_internal() {
        let err = AppError::from(SessionError::TrackerClosed);
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert_eq!(err.client_message(), "Internal error");
    }

    #[test]
    fn detailed_message_includes_source_chain() {
        let source = anyhow::anyhow!("connection refused").context("sending request");
        let err = AppError::from(source);
        let details = err.detailed_message();
        assert!(details.starts_with("Internal error with source"));
        assert!(details.contains("Caused by"));
    }
}
