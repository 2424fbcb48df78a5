pub mod attachment;
pub mod message;

pub use attachment::{
    file_extension, guess_mime_type, AttachmentId, AttachmentRecord, AttachmentState,
    AttachmentStatus, CandidateFile, ContentEncoding, ProcessedAttachment,
};
pub use message::{ChatRequest, ChatResponse, FileMetadata, OutboundFile};
