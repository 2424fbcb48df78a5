//! Relay-side re-check of an outbound payload.
//!
//! The relay never trusts the client's own validation: before a request is
//! forwarded to the automation webhook the attachment list is checked again
//! against the same limits.

use crate::constants::{MAX_FILES, MAX_FILE_SIZE, MAX_TOTAL_SIZE};
use crate::error::OutboundError;
use crate::models::OutboundFile;

/// Check count, shape and size limits of the files about to be forwarded.
///
/// Checks run in order: file count, then per-file shape and size, then the
/// combined size. A file without a name, type, size or content is malformed.
/// The first failure is returned.
pub fn validate_outbound(files: &[OutboundFile]) -> Result<(), OutboundError> {
    if files.len() > MAX_FILES {
        return Err(OutboundError::TooManyFiles {
            count: files.len(),
            max: MAX_FILES,
        });
    }

    let mut total: u64 = 0;
    for file in files {
        if file.name.trim().is_empty()
            || file.mime_type.trim().is_empty()
            || file.byte_size == 0
            || file.text_content.is_empty()
        {
            return Err(OutboundError::InvalidFileFormat {
                name: file.name.clone(),
            });
        }

        if file.byte_size > MAX_FILE_SIZE {
            return Err(OutboundError::FileTooLarge {
                name: file.name.clone(),
            });
        }

        total = total.saturating_add(file.byte_size);
    }

    if total > MAX_TOTAL_SIZE {
        return Err(OutboundError::TotalTooLarge { total });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentEncoding;

    fn file(name: &str, byte_size: u64) -> OutboundFile {
        OutboundFile {
            name: name.to_string(),
            mime_type: "text/plain".to_string(),
            byte_size,
            text_content: "content".to_string(),
            encoding: ContentEncoding::Text,
        }
    }

    #[test]
    fn accepts_empty_and_small_payloads() {
        assert!(validate_outbound(&[]).is_ok());
        assert!(validate_outbound(&[file("a.txt", 10), file("b.txt", 20)]).is_ok());
    }

    #[test]
    fn rejects_more_than_five_files() {
        let files: Vec<_> = (0..6).map(|i| file(&format!("{i}.txt"), 1)).collect();
        let err = validate_outbound(&files).unwrap_err();
        assert_eq!(err, OutboundError::TooManyFiles { count: 6, max: 5 });
        assert_eq!(err.to_string(), "Maximum 5 files allowed");
    }

    #[test]
    fn rejects_missing_name_or_type() {
        let mut nameless = file("", 1);
        nameless.name = "  ".to_string();
        assert!(matches!(
            validate_outbound(&[nameless]),
            Err(OutboundError::InvalidFileFormat { .. })
        ));

        let mut typeless = file("x.txt", 1);
        typeless.mime_type = String::new();
        assert_eq!(
            validate_outbound(&[typeless]).unwrap_err().to_string(),
            "Invalid file format: x.txt"
        );
    }

    #[test]
    fn rejects_empty_content_or_zero_size() {
        let mut blank = file("blank.txt", 3);
        blank.text_content = String::new();
        assert!(matches!(
            validate_outbound(&[blank]),
            Err(OutboundError::InvalidFileFormat { .. })
        ));
        assert!(matches!(
            validate_outbound(&[file("zero.txt", 0)]),
            Err(OutboundError::InvalidFileFormat { .. })
        ));
    }

    #[test]
    fn rejects_oversized_file() {
        let err = validate_outbound(&[file("big.pdf", MAX_FILE_SIZE + 1)]).unwrap_err();
        assert_eq!(err.to_string(), "File big.pdf exceeds size limit");
    }

    #[test]
    fn file_exactly_at_limit_passes() {
        assert!(validate_outbound(&[file("edge.pdf", MAX_FILE_SIZE)]).is_ok());
    }

    #[test]
    fn rejects_combined_size_over_limit() {
        let files = vec![
            file("a.pdf", MAX_FILE_SIZE),
            file("b.pdf", MAX_FILE_SIZE),
            file("c.txt", 1),
        ];
        assert_eq!(
            validate_outbound(&files).unwrap_err(),
            OutboundError::TotalTooLarge {
                total: MAX_TOTAL_SIZE + 1
            }
        );
    }
}
