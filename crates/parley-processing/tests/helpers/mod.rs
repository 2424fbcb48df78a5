//! Test helpers: scripted PDF engine and document fixtures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parley_core::models::CandidateFile;
use parley_core::{ExtractionError, SessionConfig};
use parley_processing::{ComposeSession, Extractor, PdfDocument, PdfEngine};
use tokio::sync::Semaphore;

/// PDF engine returning fixed pages. Later pages finish first.
///
/// A gated engine waits for a permit on its gate before opening a document,
/// so tests can hold an extraction in the `processing` state.
pub struct ScriptedPdfEngine {
    pages: Vec<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedPdfEngine {
    pub fn new(pages: &[&[&str]]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|page| page.iter().map(|item| item.to_string()).collect())
                .collect(),
            gate: None,
        }
    }

    pub fn gated(pages: &[&[&str]], gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(pages)
        }
    }
}

struct ScriptedDocument {
    pages: Vec<Vec<String>>,
}

#[async_trait]
impl PdfDocument for ScriptedDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page_items(&self, page: usize) -> Result<Vec<String>, ExtractionError> {
        let delay = (self.pages.len() - page) as u64 * 10;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(self.pages[page - 1].clone())
    }
}

#[async_trait]
impl PdfEngine for ScriptedPdfEngine {
    async fn open(&self, _data: Bytes) -> Result<Arc<dyn PdfDocument>, ExtractionError> {
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| ExtractionError::Internal(e.to_string()))?;
            permit.forget();
        }

        Ok(Arc::new(ScriptedDocument {
            pages: self.pages.clone(),
        }))
    }
}

/// Engine whose documents never finish opening.
pub struct StalledPdfEngine;

#[async_trait]
impl PdfEngine for StalledPdfEngine {
    async fn open(&self, _data: Bytes) -> Result<Arc<dyn PdfDocument>, ExtractionError> {
        std::future::pending().await
    }
}

pub fn session_with_engine(engine: impl PdfEngine + 'static, config: SessionConfig) -> ComposeSession {
    ComposeSession::with_extractor(config, Extractor::with_pdf_engine(Arc::new(engine)))
}

pub fn text_file(name: &str, mime_type: &str, body: &str) -> CandidateFile {
    CandidateFile::new(name, mime_type, body.as_bytes().to_vec())
}

pub fn pdf_file(name: &str) -> CandidateFile {
    CandidateFile::new(name, "application/pdf", b"%PDF-1.4\n%scripted".to_vec())
}

/// A `.docx` document with one paragraph per entry.
pub fn docx_file(name: &str, paragraphs: &[&str]) -> CandidateFile {
    let docx = paragraphs.iter().fold(docx_rs::Docx::new(), |docx, text| {
        docx.add_paragraph(docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*text)))
    });

    let mut cursor = std::io::Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .expect("failed to pack docx fixture");

    CandidateFile::new(
        name,
        parley_core::constants::MIME_DOCX,
        cursor.into_inner(),
    )
}
