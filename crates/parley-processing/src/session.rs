//! Compose session: admission, background extraction and submission of the
//! attachments of one message being written.

use std::sync::Arc;

use parley_core::models::{AttachmentId, CandidateFile, ChatRequest};
use parley_core::{SessionConfig, SessionError};
use tokio::sync::{watch, Semaphore};
use tracing::Instrument;

use crate::assembler::assemble;
use crate::extract::Extractor;
use crate::tracker::{AttachmentTracker, Snapshot, SnapshotObserver, TrackerSummary};
use crate::validator::{AttachmentValidator, Rejection};

/// Result of attaching a batch.
#[derive(Debug, Clone, Default)]
pub struct Admission {
    /// Ids of the records created, in the order the files were given.
    pub accepted: Vec<AttachmentId>,
    /// Files turned away individually.
    pub rejected: Vec<Rejection>,
}

pub struct ComposeSession {
    tracker: AttachmentTracker,
    validator: AttachmentValidator,
    extractor: Arc<Extractor>,
    permits: Arc<Semaphore>,
    config: SessionConfig,
}

impl ComposeSession {
    /// Create a session on the current Tokio runtime.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_extractor(config, Extractor::new())
    }

    /// Create a session with a custom extractor. The configured extraction
    /// timeout replaces the extractor's own.
    pub fn with_extractor(config: SessionConfig, extractor: Extractor) -> Self {
        let validator = AttachmentValidator::standard();
        let extractor = extractor.with_timeout(config.extraction_timeout);
        let permits = Arc::new(Semaphore::new(config.max_concurrent_extractions.max(1)));

        Self {
            tracker: AttachmentTracker::spawn(validator),
            validator,
            extractor: Arc::new(extractor),
            permits,
            config,
        }
    }

    pub fn tracker(&self) -> &AttachmentTracker {
        &self.tracker
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tracker.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tracker.subscribe()
    }

    pub fn observe(&self, observer: Arc<dyn SnapshotObserver>) -> Result<(), SessionError> {
        self.tracker.observe(observer)
    }

    pub fn summary(&self) -> TrackerSummary {
        self.tracker.summary()
    }

    /// Validate a batch and start extracting every accepted file.
    ///
    /// Files failing their own checks are reported in the admission and never
    /// tracked. If the remaining files do not fit next to the existing
    /// attachments the whole batch is refused with
    /// [`SessionError::BatchRejected`], which still lists those per-file
    /// rejections.
    #[tracing::instrument(skip_all, fields(files = files.len()))]
    pub async fn attach(&self, files: Vec<CandidateFile>) -> Result<Admission, SessionError> {
        let screening = self.validator.screen_files(files);
        if !screening.rejected.is_empty() {
            tracing::info!(
                rejected = screening.rejected.len(),
                "Some files were not attached"
            );
        }

        let accepted = match self.tracker.admit(screening.accepted.clone()).await {
            Ok(ids) => ids,
            Err(SessionError::Validation(error)) => {
                tracing::info!(error = %error, "Batch rejected");
                return Err(SessionError::BatchRejected {
                    error,
                    rejected: screening.rejected,
                });
            }
            Err(e) => return Err(e),
        };
        for (id, file) in accepted.iter().copied().zip(screening.accepted) {
            self.spawn_extraction(id, file);
        }

        Ok(Admission {
            accepted,
            rejected: screening.rejected,
        })
    }

    fn spawn_extraction(&self, id: AttachmentId, file: CandidateFile) {
        let tracker = self.tracker.clone();
        let extractor = Arc::clone(&self.extractor);
        let permits = Arc::clone(&self.permits);
        let span = tracing::info_span!(
            "extract_attachment",
            attachment_id = %id,
            file_name = %file.name(),
            mime_type = %file.mime_type()
        );

        let mut snapshots = tracker.subscribe();

        let work = async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::debug!("Extraction permits closed");
                    return;
                }
            };

            if tracker.start(id).is_err() {
                return;
            }

            let outcome = extractor.process(&file).await;
            if let Err(e) = &outcome {
                tracing::warn!(error = %e, "Attachment processing failed");
            }

            if tracker.complete(id, outcome).is_err() {
                tracing::debug!("Tracker closed before extraction finished");
            }
        };

        // Dropping `work` releases the permit, so a removed attachment does
        // not hold back the ones attached after it.
        let removed = async move {
            let _ = snapshots
                .wait_for(|records| records.iter().all(|r| r.id != id))
                .await;
        };

        tokio::spawn(
            async move {
                tokio::select! {
                    () = work => {}
                    () = removed => {
                        tracing::debug!("Attachment removed, extraction abandoned");
                    }
                }
            }
            .instrument(span),
        );
    }

    /// Remove an attachment in any state. An extraction still running for it
    /// is abandoned and gives up its permit; blocking parser work already
    /// started runs out on its own thread and its result is dropped.
    pub async fn remove(&self, id: AttachmentId) -> Result<bool, SessionError> {
        self.tracker.remove(id).await
    }

    /// Drop every attachment without sending.
    pub async fn cancel(&self) -> Result<(), SessionError> {
        self.tracker.reset().await
    }

    pub async fn wait_until_settled(&self) -> Result<Snapshot, SessionError> {
        self.tracker.wait_until_settled().await
    }

    /// Build the outbound request for `text` and the ready attachments
    /// without changing the session.
    pub async fn prepare_submission(
        &self,
        text: &str,
        session_id: &str,
    ) -> Result<ChatRequest, SessionError> {
        let snapshot = self.tracker.current().await?;
        let files = assemble(&snapshot)?;

        let text = text.trim();
        if text.is_empty() && files.is_empty() {
            return Err(SessionError::NothingToSend);
        }

        let query = if text.is_empty() {
            self.config
                .default_attachment_query
                .clone()
                .unwrap_or_default()
        } else {
            text.to_string()
        };

        Ok(ChatRequest::new(query, session_id, files))
    }

    /// Build the outbound request and clear the session.
    #[tracing::instrument(skip(self, text))]
    pub async fn submit(&self, text: &str, session_id: &str) -> Result<ChatRequest, SessionError> {
        let request = self.prepare_submission(text, session_id).await?;
        self.tracker.reset().await?;

        tracing::info!(
            request_id = %request.request_id,
            files = request.files.len(),
            "Message prepared"
        );
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::models::AttachmentStatus;
    use parley_core::ValidationError;

    fn session() -> ComposeSession {
        ComposeSession::new(SessionConfig::default())
    }

    #[tokio::test]
    async fn attach_reports_individual_rejections() {
        let session = session();
        let admission = session
            .attach(vec![
                CandidateFile::new("notes.txt", "text/plain", b"hello".to_vec()),
                CandidateFile::new("virus.pdf", "text/plain", b"MZ".to_vec()),
            ])
            .await
            .unwrap();

        assert_eq!(admission.accepted.len(), 1);
        assert_eq!(admission.rejected.len(), 1);
        assert_eq!(admission.rejected[0].file_name, "virus.pdf");

        let settled = session.wait_until_settled().await.unwrap();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].status(), AttachmentStatus::Ready);
        assert_eq!(settled[0].result().unwrap().text_content, "hello");
    }

    #[tokio::test]
    async fn attach_refuses_batch_over_limit() {
        let session = session();
        let files: Vec<_> = (0..6)
            .map(|i| CandidateFile::new(format!("{i}.txt"), "text/plain", b"x".to_vec()))
            .collect();

        let err = session.attach(files).await.unwrap_err();
        assert_eq!(
            err,
            SessionError::BatchRejected {
                error: ValidationError::TooManyFiles { count: 6, max: 5 },
                rejected: Vec::new(),
            }
        );
        assert!(session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn invalid_utf8_becomes_error_record() {
        let session = session();
        session
            .attach(vec![CandidateFile::new("bad.txt", "text/plain", vec![0xFF, 0xFE])])
            .await
            .unwrap();

        let settled = session.wait_until_settled().await.unwrap();
        assert_eq!(settled[0].status(), AttachmentStatus::Error);
        assert!(settled[0].error_message().unwrap().contains("UTF-8"));
    }

    #[tokio::test]
    async fn files_only_submission_uses_default_query() {
        let session = session();
        session
            .attach(vec![CandidateFile::new("a.md", "text/markdown", b"# A".to_vec())])
            .await
            .unwrap();
        session.wait_until_settled().await.unwrap();

        let request = session.submit("   ", "session-42").await.unwrap();
        assert_eq!(request.query, "Attached files");
        assert_eq!(request.session_id, "session-42");
        assert_eq!(request.files.len(), 1);
        assert!(session.tracker().current().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_default_query_is_respected() {
        let config = SessionConfig {
            default_attachment_query: None,
            ..SessionConfig::default()
        };
        let session = ComposeSession::new(config);
        session
            .attach(vec![CandidateFile::new("a.txt", "text/plain", b"a".to_vec())])
            .await
            .unwrap();
        session.wait_until_settled().await.unwrap();

        let request = session.prepare_submission("", "").await.unwrap();
        assert_eq!(request.query, "");
    }

    #[tokio::test]
    async fn nothing_to_send_keeps_session() {
        let session = session();
        session
            .attach(vec![CandidateFile::new("bad.txt", "text/plain", vec![0xC3])])
            .await
            .unwrap();
        session.wait_until_settled().await.unwrap();

        let err = session.submit("  ", "s").await.unwrap_err();
        assert_eq!(err, SessionError::NothingToSend);
        assert_eq!(session.tracker().current().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn text_only_submission_trims_and_stamps_request_id() {
        let session = session();
        let first = session.submit("  hello  ", "s").await.unwrap();
        let second = session.submit("hello", "s").await.unwrap();
        assert_eq!(first.query, "hello");
        assert!(first.files.is_empty());
        assert_ne!(first.request_id, second.request_id);
    }

    #[tokio::test]
    async fn cancel_clears_attachments() {
        let session = session();
        session
            .attach(vec![CandidateFile::new("a.csv", "text/csv", b"a,b".to_vec())])
            .await
            .unwrap();
        session.cancel().await.unwrap();
        assert!(session.tracker().current().await.unwrap().is_empty());
    }
}
