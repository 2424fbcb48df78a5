//! Parley Processing Library
//!
//! Validation, text extraction and lifecycle tracking for chat attachments,
//! tied together by [`ComposeSession`].

pub mod assembler;
pub mod extract;
pub mod session;
pub mod source;
pub mod tracker;
pub mod validator;

pub use assembler::assemble;
pub use extract::{
    Extractor, LazyPdfEngine, PdfDocument, PdfEngine, PdfExtractEngine, TextExtractor,
};
pub use session::{Admission, ComposeSession};
pub use source::{read_candidate, read_candidates};
pub use tracker::{AttachmentTracker, Snapshot, SnapshotObserver, TrackerSummary};
pub use validator::{
    screen_batch, validate_batch, validate_single, AdmittedTotals, AttachmentValidator,
    Rejection, Screening,
};
