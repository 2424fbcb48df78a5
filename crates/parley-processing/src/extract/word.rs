//! Word document extraction via `docx-rs`.
//!
//! Only raw text survives: paragraphs become blocks separated by a blank line
//! and table rows become lines of ` | `-separated cells.

use std::panic::{catch_unwind, AssertUnwindSafe};

use async_trait::async_trait;
use parley_core::models::CandidateFile;
use parley_core::ExtractionError;

use super::TextExtractor;

const FORMAT: &str = "Word";

/// Signature of an OLE compound file (legacy binary `.doc`).
const OLE_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Debug, Clone, Copy, Default)]
pub struct WordExtractor;

#[async_trait]
impl TextExtractor for WordExtractor {
    fn format(&self) -> &'static str {
        FORMAT
    }

    async fn extract(&self, file: &CandidateFile) -> Result<String, ExtractionError> {
        let data = file.data().clone();
        let file_name = file.name().to_string();

        tokio::task::spawn_blocking(move || extract_word_text(&file_name, &data))
            .await
            .map_err(|e| ExtractionError::Internal(format!("Word task failed: {}", e)))?
    }
}

/// Raw text of a `.docx` document held in memory.
pub fn extract_word_text(file_name: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    if bytes.starts_with(OLE_SIGNATURE) {
        return Err(ExtractionError::UnsupportedStructure {
            format: FORMAT,
            reason: "legacy binary .doc files are not supported, save the document as .docx"
                .to_string(),
        });
    }

    let docx = match catch_unwind(AssertUnwindSafe(|| docx_rs::read_docx(bytes))) {
        Ok(Ok(docx)) => docx,
        Ok(Err(e)) => {
            return Err(ExtractionError::ParseError {
                format: FORMAT,
                message: e.to_string(),
            })
        }
        Err(_panic) => {
            tracing::error!(file_name = %file_name, "Word parser panicked");
            return Err(ExtractionError::ParseError {
                format: FORMAT,
                message: "parser panicked on malformed content".to_string(),
            });
        }
    };

    let children = &docx.document.children;
    if children.is_empty() {
        return Err(ExtractionError::UnsupportedStructure {
            format: FORMAT,
            reason: "document has no body content".to_string(),
        });
    }

    let mut blocks = Vec::new();
    let mut skipped = 0usize;
    for child in children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                blocks.push(paragraph_text(para));
            }
            docx_rs::DocumentChild::Table(table) => {
                blocks.push(table_text(table, &mut skipped));
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!(
            file_name = %file_name,
            skipped,
            "Skipped Word elements without extractable text"
        );
    }

    Ok(blocks.join("\n\n").trim().to_string())
}

fn run_text(run: &docx_rs::Run, output: &mut String) {
    for run_child in &run.children {
        match run_child {
            docx_rs::RunChild::Text(text) => output.push_str(&text.text),
            docx_rs::RunChild::Tab(_) => output.push('\t'),
            docx_rs::RunChild::Break(_) => output.push('\n'),
            _ => {}
        }
    }
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut output = String::new();
    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => run_text(run, &mut output),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for link_child in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = link_child {
                        run_text(run, &mut output);
                    }
                }
            }
            _ => {}
        }
    }
    output
}

fn table_text(table: &docx_rs::Table, skipped: &mut usize) -> String {
    let mut rows = Vec::new();
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(tr) = row;
        let mut cells = Vec::new();
        for cell in &tr.cells {
            let docx_rs::TableRowChild::TableCell(tc) = cell;
            let mut paragraphs = Vec::new();
            for content in &tc.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(para) => {
                        paragraphs.push(paragraph_text(para));
                    }
                    _ => *skipped += 1,
                }
            }
            cells.push(paragraphs.join(" "));
        }
        rows.push(cells.join(" | "));
    }
    rows.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};

    fn build(docx: Docx) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let bytes = build(
            Docx::new()
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("First")))
                .add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text("Bold").bold())
                        .add_run(Run::new().add_text("Plain")),
                ),
        );

        let text = extract_word_text("letter.docx", &bytes).unwrap();
        assert_eq!(text, "First\n\nBoldPlain");
    }

    #[test]
    fn table_cells_are_pipe_separated() {
        let table = Table::new(vec![
            TableRow::new(vec![
                TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("Name"))),
                TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("Qty"))),
            ]),
            TableRow::new(vec![
                TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("Pens"))),
                TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("4"))),
            ]),
        ]);
        let bytes = build(
            Docx::new()
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Inventory")))
                .add_table(table),
        );

        let text = extract_word_text("stock.docx", &bytes).unwrap();
        assert_eq!(text, "Inventory\n\nName | Qty\nPens | 4");
    }

    #[test]
    fn legacy_doc_is_unsupported_structure() {
        let mut bytes = OLE_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        let err = extract_word_text("old.doc", &bytes).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::UnsupportedStructure { format: "Word", .. }
        ));
    }

    #[test]
    fn corrupt_archive_is_parse_error() {
        let err = extract_word_text("broken.docx", b"PK\x03\x04 definitely not a zip").unwrap_err();
        assert!(matches!(err, ExtractionError::ParseError { format: "Word", .. }));
    }

    #[test]
    fn empty_body_is_unsupported_structure() {
        let bytes = build(Docx::new());
        let err = extract_word_text("blank.docx", &bytes).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedStructure { .. }));
    }

    #[tokio::test]
    async fn extractor_runs_off_the_async_task() {
        let bytes = build(
            Docx::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text("Hi"))),
        );
        let file = CandidateFile::new(
            "hi.docx",
            parley_core::constants::MIME_DOCX,
            bytes,
        );
        assert_eq!(WordExtractor.extract(&file).await.unwrap(), "Hi");
    }
}
