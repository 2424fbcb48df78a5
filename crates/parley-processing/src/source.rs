//! Reading candidate files from disk.

use std::path::Path;

use anyhow::{Context, Result};
use parley_core::models::CandidateFile;

/// Read a file into a candidate. The MIME type is guessed from the extension
/// unless `mime_override` is given.
pub async fn read_candidate(path: impl AsRef<Path>, mime_override: Option<&str>) -> Result<CandidateFile> {
    let path = path.as_ref();
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(CandidateFile::from_named_bytes(path, data, mime_override))
}

/// Read several files, failing on the first unreadable path.
pub async fn read_candidates<P: AsRef<Path>>(
    paths: &[P],
    mime_override: Option<&str>,
) -> Result<Vec<CandidateFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(read_candidate(path, mime_override).await?);
    }
    Ok(files)
}
