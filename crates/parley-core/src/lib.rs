//! Parley Core Library
//!
//! This crate provides the attachment domain models, limits, error types,
//! configuration and relay-side validation shared across all Parley components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{ParleyConfig, SessionConfig};
pub use constants::{FileCategory, MAX_FILES, MAX_FILE_SIZE, MAX_TOTAL_SIZE};
pub use error::{
    AppError, ErrorMetadata, ExtractionError, LogLevel, NotReadyError, OutboundError, Rejection,
    SessionError, ValidationError,
};
pub use validation::validate_outbound;
