//! Hard attachment limits and the allowed file type table.
//!
//! These values are shared with the relay and the automation webhook, so they
//! are constants rather than configuration.

const MIB: u64 = 1024 * 1024;

/// Maximum size of a single attachment in bytes (5 MiB).
pub const MAX_FILE_SIZE: u64 = 5 * MIB;

/// Maximum number of attachments per message.
pub const MAX_FILES: usize = 5;

/// Maximum combined size of all attachments in bytes (10 MiB).
pub const MAX_TOTAL_SIZE: u64 = 10 * MIB;

pub const MIME_TEXT_PLAIN: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_CSV: &str = "text/csv";
pub const MIME_JSON: &str = "application/json";
pub const MIME_MARKDOWN: &str = "text/markdown";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";

/// How the text of a file type is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    /// Decoded verbatim as UTF-8.
    PlainText,
    Pdf,
    Word,
}

/// One row of the allowed type table: a MIME type and the only extension it may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedType {
    pub mime_type: &'static str,
    pub extension: &'static str,
    pub category: FileCategory,
}

pub const ALLOWED_FILE_TYPES: &[AllowedType] = &[
    AllowedType {
        mime_type: MIME_TEXT_PLAIN,
        extension: "txt",
        category: FileCategory::PlainText,
    },
    AllowedType {
        mime_type: MIME_PDF,
        extension: "pdf",
        category: FileCategory::Pdf,
    },
    AllowedType {
        mime_type: MIME_CSV,
        extension: "csv",
        category: FileCategory::PlainText,
    },
    AllowedType {
        mime_type: MIME_JSON,
        extension: "json",
        category: FileCategory::PlainText,
    },
    AllowedType {
        mime_type: MIME_MARKDOWN,
        extension: "md",
        category: FileCategory::PlainText,
    },
    AllowedType {
        mime_type: MIME_DOCX,
        extension: "docx",
        category: FileCategory::Word,
    },
    AllowedType {
        mime_type: MIME_DOC,
        extension: "doc",
        category: FileCategory::Word,
    },
];

/// Normalize a guessed or user-supplied MIME type before it is stored on a
/// candidate. Lookups compare the stored string exactly.
pub fn normalize_mime(mime_type: &str) -> String {
    mime_type.trim().to_lowercase()
}

/// Look up the table row for a MIME type. The match is exact, so the type
/// accepted is the type forwarded.
pub fn allowed_type_for_mime(mime_type: &str) -> Option<&'static AllowedType> {
    ALLOWED_FILE_TYPES
        .iter()
        .find(|allowed| allowed.mime_type == mime_type)
}

/// Look up the table row for a lower-case extension without the leading dot.
pub fn allowed_type_for_extension(extension: &str) -> Option<&'static AllowedType> {
    let normalized = extension.trim_start_matches('.').to_lowercase();
    ALLOWED_FILE_TYPES
        .iter()
        .find(|allowed| allowed.extension == normalized)
}

/// Extraction category for a MIME type, if the type is allowed at all.
pub fn category_for_mime(mime_type: &str) -> Option<FileCategory> {
    allowed_type_for_mime(mime_type).map(|allowed| allowed.category)
}

/// Human-readable list of accepted extensions, e.g. for CLI help and error hints.
pub fn accepted_extensions() -> String {
    ALLOWED_FILE_TYPES
        .iter()
        .map(|allowed| allowed.extension.to_uppercase())
        .collect::<Vec<_>>()
        .join(", ")
}
