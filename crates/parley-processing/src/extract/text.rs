//! Plain-text family: `.txt`, `.csv`, `.json` and `.md`.

use async_trait::async_trait;
use parley_core::models::CandidateFile;
use parley_core::ExtractionError;

use super::TextExtractor;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decodes the file verbatim as UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn format(&self) -> &'static str {
        "text"
    }

    async fn extract(&self, file: &CandidateFile) -> Result<String, ExtractionError> {
        decode_text(file.name(), file.data())
    }
}

/// Strict UTF-8 decode. A leading byte-order mark is dropped; any invalid
/// sequence fails the whole file instead of being replaced.
pub fn decode_text(file_name: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let offset = bytes.len() - body.len();

    std::str::from_utf8(body)
        .map(str::to_owned)
        .map_err(|e| ExtractionError::DecodeError {
            file_name: file_name.to_string(),
            valid_up_to: offset + e.valid_up_to(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf8_verbatim() {
        let text = "id,name\n1,Zoë\n";
        assert_eq!(decode_text("a.csv", text.as_bytes()).unwrap(), text);
    }

    #[test]
    fn keeps_surrounding_whitespace() {
        assert_eq!(decode_text("a.txt", b"  spaced  \n").unwrap(), "  spaced  \n");
    }

    #[test]
    fn drops_byte_order_mark() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"{\"a\":1}");
        assert_eq!(decode_text("a.json", &bytes).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn empty_file_is_empty_text() {
        assert_eq!(decode_text("empty.md", b"").unwrap(), "");
    }

    #[test]
    fn invalid_utf8_is_decode_error() {
        let err = decode_text("bad.txt", &[b'o', b'k', 0xFF, b'!']).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::DecodeError {
                file_name: "bad.txt".to_string(),
                valid_up_to: 2
            }
        );
    }

    #[test]
    fn decode_offset_counts_byte_order_mark() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.push(0xC3);
        let err = decode_text("bad.txt", &bytes).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::DecodeError { valid_up_to: 3, .. }
        ));
    }

    #[tokio::test]
    async fn extractor_reads_candidate_bytes() {
        let file = CandidateFile::new("notes.txt", "text/plain", "hello".as_bytes().to_vec());
        let text = PlainTextExtractor.extract(&file).await.unwrap();
        assert_eq!(text, "hello");
    }
}
