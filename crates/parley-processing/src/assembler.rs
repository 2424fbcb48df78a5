use parley_core::models::{AttachmentRecord, OutboundFile};
use parley_core::NotReadyError;

/// Build the outbound file list from a tracker snapshot.
///
/// Fails while any file is still pending or processing. Otherwise only ready
/// records are forwarded; records in error are left out without complaint.
pub fn assemble(records: &[AttachmentRecord]) -> Result<Vec<OutboundFile>, NotReadyError> {
    let in_flight = records.iter().filter(|r| r.is_in_flight()).count();
    if in_flight > 0 {
        return Err(NotReadyError { in_flight });
    }

    Ok(records
        .iter()
        .filter_map(AttachmentRecord::result)
        .map(OutboundFile::from)
        .collect())
}
