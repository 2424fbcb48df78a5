use parley_core::models::{AttachmentRecord, AttachmentState};
use parley_core::Rejection;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Human-readable byte size: `512 B`, `1.5 KB`, `2.0 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / KB)
    } else {
        format!("{:.1} MB", bytes as f64 / MB)
    }
}

/// Status text shown next to an attachment.
pub fn status_label(record: &AttachmentRecord) -> String {
    match &record.state {
        AttachmentState::Pending => "Pending".to_string(),
        AttachmentState::Processing => "Processing...".to_string(),
        AttachmentState::Ready(_) => "Ready".to_string(),
        AttachmentState::Error(message) => message.clone(),
    }
}

/// One line describing an attachment: id, name, size and status.
pub fn describe_record(record: &AttachmentRecord) -> String {
    format!(
        "{:<7} {:<32} {:>9}  {}",
        record.id.to_string(),
        truncate_string(record.source.name(), 32),
        format_file_size(record.source.byte_size()),
        status_label(record)
    )
}

/// One line explaining why a file was not attached.
pub fn describe_rejection(rejection: &Rejection) -> String {
    format!("skipped {}: {}", rejection.file_name, rejection.error)
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
