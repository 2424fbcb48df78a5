//! Per-format text extraction.

pub mod pdf;
pub mod text;
pub mod word;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::constants::{category_for_mime, FileCategory};
use parley_core::models::{CandidateFile, ProcessedAttachment};
use parley_core::ExtractionError;

pub use pdf::{LazyPdfEngine, PdfDocument, PdfEngine, PdfExtractEngine, PdfExtractor};
pub use text::PlainTextExtractor;
pub use word::WordExtractor;

/// Turns the bytes of one file category into UTF-8 text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Format label used in error messages.
    fn format(&self) -> &'static str;

    async fn extract(&self, file: &CandidateFile) -> Result<String, ExtractionError>;
}

/// Dispatches a validated file to the extractor for its MIME type.
#[derive(Clone)]
pub struct Extractor {
    text: PlainTextExtractor,
    pdf: PdfExtractor,
    word: WordExtractor,
    timeout: Option<Duration>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// Extractor with a lazily created `pdf-extract` engine and no timeout.
    pub fn new() -> Self {
        Self::with_pdf_engine(Arc::new(LazyPdfEngine::default()))
    }

    pub fn with_pdf_engine(engine: Arc<dyn PdfEngine>) -> Self {
        Self {
            text: PlainTextExtractor,
            pdf: PdfExtractor::new(engine),
            word: WordExtractor,
            timeout: None,
        }
    }

    /// Bound every extraction by `timeout`. `None` removes the bound.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn extractor_for(&self, mime_type: &str) -> Option<&dyn TextExtractor> {
        match category_for_mime(mime_type)? {
            FileCategory::PlainText => Some(&self.text),
            FileCategory::Pdf => Some(&self.pdf),
            FileCategory::Word => Some(&self.word),
        }
    }

    /// Extract the text of a validated file.
    #[tracing::instrument(skip(self, file), fields(file_name = %file.name(), mime_type = %file.mime_type()))]
    pub async fn extract(&self, file: &CandidateFile) -> Result<String, ExtractionError> {
        let Some(extractor) = self.extractor_for(file.mime_type()) else {
            tracing::error!("MIME type outside the allowed table reached the extractor");
            return Err(ExtractionError::Internal(format!(
                "no extractor for MIME type '{}'",
                file.mime_type()
            )));
        };

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, extractor.extract(file)).await {
                Ok(result) => result,
                Err(_) => Err(ExtractionError::TimedOut {
                    secs: limit.as_secs(),
                }),
            },
            None => extractor.extract(file).await,
        };

        match &result {
            Ok(text) => tracing::debug!(
                format = extractor.format(),
                chars = text.chars().count(),
                "Extracted text"
            ),
            Err(e) => tracing::warn!(format = extractor.format(), error = %e, "Extraction failed"),
        }

        result
    }

    /// Extract a file into its processed form.
    pub async fn process(&self, file: &CandidateFile) -> Result<ProcessedAttachment, ExtractionError> {
        let text = self.extract(file).await?;
        Ok(ProcessedAttachment::from_candidate(file, text))
    }
}
