//! PDF text extraction.
//!
//! The parser sits behind [`PdfEngine`] so it can be acquired lazily and
//! swapped out in tests. Pages are extracted concurrently and joined back in
//! page order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parley_core::models::CandidateFile;
use parley_core::ExtractionError;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;

use super::TextExtractor;

const FORMAT: &str = "PDF";

/// A parsed PDF document.
#[async_trait]
pub trait PdfDocument: Send + Sync {
    fn page_count(&self) -> usize;

    /// Text items of a page, numbered from 1.
    async fn page_items(&self, page: usize) -> Result<Vec<String>, ExtractionError>;
}

/// Something able to parse PDF bytes.
#[async_trait]
pub trait PdfEngine: Send + Sync {
    async fn open(&self, data: Bytes) -> Result<Arc<dyn PdfDocument>, ExtractionError>;
}

fn parse_error(message: impl Into<String>) -> ExtractionError {
    ExtractionError::ParseError {
        format: FORMAT,
        message: message.into(),
    }
}

/// Engine backed by the `pdf-extract` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractEngine;

/// Page texts produced by `pdf-extract`. Each non-blank line is one item.
struct ExtractedPdf {
    pages: Vec<Vec<String>>,
}

#[async_trait]
impl PdfDocument for ExtractedPdf {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page_items(&self, page: usize) -> Result<Vec<String>, ExtractionError> {
        page.checked_sub(1)
            .and_then(|index| self.pages.get(index))
            .cloned()
            .ok_or_else(|| {
                ExtractionError::Internal(format!(
                    "page {} out of range (document has {} pages)",
                    page,
                    self.pages.len()
                ))
            })
    }
}

#[async_trait]
impl PdfEngine for PdfExtractEngine {
    async fn open(&self, data: Bytes) -> Result<Arc<dyn PdfDocument>, ExtractionError> {
        let pages = tokio::task::spawn_blocking(move || {
            // pdf-extract can panic on malformed fonts and glyph tables
            match catch_unwind(AssertUnwindSafe(|| {
                pdf_extract::extract_text_from_mem_by_pages(&data)
            })) {
                Ok(Ok(pages)) => Ok(pages),
                Ok(Err(e)) => Err(parse_error(e.to_string())),
                Err(_panic) => {
                    tracing::error!("PDF parser panicked, likely malformed fonts");
                    Err(parse_error("parser panicked on malformed content"))
                }
            }
        })
        .await
        .map_err(|e| ExtractionError::Internal(format!("PDF task failed: {}", e)))??;

        let pages: Vec<Vec<String>> = pages
            .iter()
            .map(|page| {
                page.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .collect();

        Ok(Arc::new(ExtractedPdf { pages }))
    }
}

type EngineFactory = Arc<dyn Fn() -> Arc<dyn PdfEngine> + Send + Sync>;

/// A PDF engine created on first use and shared afterwards.
#[derive(Clone)]
pub struct LazyPdfEngine {
    cell: Arc<OnceCell<Arc<dyn PdfEngine>>>,
    factory: EngineFactory,
}

impl Default for LazyPdfEngine {
    fn default() -> Self {
        Self::new(|| Arc::new(PdfExtractEngine) as Arc<dyn PdfEngine>)
    }
}

impl LazyPdfEngine {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn PdfEngine> + Send + Sync + 'static,
    {
        Self {
            cell: Arc::new(OnceCell::new()),
            factory: Arc::new(factory),
        }
    }

    pub async fn get(&self) -> Arc<dyn PdfEngine> {
        let engine = self
            .cell
            .get_or_init(|| async {
                tracing::debug!("Initializing PDF engine");
                (self.factory)()
            })
            .await;
        Arc::clone(engine)
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[async_trait]
impl PdfEngine for LazyPdfEngine {
    async fn open(&self, data: Bytes) -> Result<Arc<dyn PdfDocument>, ExtractionError> {
        self.get().await.open(data).await
    }
}

/// Extracts PDF text page by page.
#[derive(Clone)]
pub struct PdfExtractor {
    engine: Arc<dyn PdfEngine>,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new(Arc::new(LazyPdfEngine::default()))
    }
}

impl PdfExtractor {
    pub fn new(engine: Arc<dyn PdfEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    fn format(&self) -> &'static str {
        FORMAT
    }

    async fn extract(&self, file: &CandidateFile) -> Result<String, ExtractionError> {
        let document = self.engine.open(file.data().clone()).await?;
        let page_count = document.page_count();

        let mut tasks = JoinSet::new();
        for page in 1..=page_count {
            let document = Arc::clone(&document);
            tasks.spawn(async move {
                let items = document.page_items(page).await?;
                Ok::<_, ExtractionError>((page, items.join(" ")))
            });
        }

        let mut pages = Vec::with_capacity(page_count);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(page)) => pages.push(page),
                Ok(Err(e)) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(ExtractionError::Internal(format!(
                        "PDF page task failed: {}",
                        e
                    )));
                }
            }
        }

        tracing::debug!(file_name = %file.name(), pages = page_count, "Extracted PDF pages");
        Ok(join_pages(pages))
    }
}

/// Concatenate page texts in page order, each followed by a blank line, and
/// trim the result. Empty pages still contribute their separator.
pub fn join_pages(mut pages: Vec<(usize, String)>) -> String {
    pages.sort_by_key(|(page, _)| *page);

    let mut text = String::new();
    for (_, page_text) in &pages {
        text.push_str(page_text);
        text.push_str("\n\n");
    }

    text.trim().to_string()
}
