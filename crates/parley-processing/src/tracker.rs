//! Attachment state tracker.
//!
//! All mutations of the record list go through one command queue consumed by
//! a single task. After every applied change the full ordered snapshot is
//! published on a watch channel and handed to registered observers.

use std::sync::Arc;

use parley_core::models::{
    AttachmentId, AttachmentRecord, AttachmentState, AttachmentStatus, CandidateFile,
    ProcessedAttachment,
};
use parley_core::{ExtractionError, SessionError, ValidationError};
use tokio::sync::{mpsc, oneshot, watch};

use crate::validator::{AdmittedTotals, AttachmentValidator};

/// Ordered, immutable view of every record in the session.
pub type Snapshot = Arc<Vec<AttachmentRecord>>;

/// Callback interface for snapshot updates.
pub trait SnapshotObserver: Send + Sync {
    fn on_snapshot(&self, records: &[AttachmentRecord]);
}

/// Lifecycle events applied to a record.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    Started,
    Succeeded(Arc<ProcessedAttachment>),
    Failed(String),
}

impl TrackerEvent {
    fn name(&self) -> &'static str {
        match self {
            TrackerEvent::Started => "started",
            TrackerEvent::Succeeded(_) => "succeeded",
            TrackerEvent::Failed(_) => "failed",
        }
    }
}

/// Next state for `event`, or `None` when the transition is not allowed.
pub fn transition(state: &AttachmentState, event: TrackerEvent) -> Option<AttachmentState> {
    match (state, event) {
        (AttachmentState::Pending, TrackerEvent::Started) => Some(AttachmentState::Processing),
        (AttachmentState::Processing, TrackerEvent::Succeeded(processed)) => {
            Some(AttachmentState::Ready(processed))
        }
        (AttachmentState::Processing, TrackerEvent::Failed(message)) => {
            Some(AttachmentState::Error(message))
        }
        _ => None,
    }
}

/// Counts derived from a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerSummary {
    pub count: usize,
    pub total_bytes: u64,
    pub pending: usize,
    pub processing: usize,
    pub ready: usize,
    pub error: usize,
}

impl TrackerSummary {
    pub fn from_records(records: &[AttachmentRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            summary.count += 1;
            summary.total_bytes = summary.total_bytes.saturating_add(record.source.byte_size());
            match record.status() {
                AttachmentStatus::Pending => summary.pending += 1,
                AttachmentStatus::Processing => summary.processing += 1,
                AttachmentStatus::Ready => summary.ready += 1,
                AttachmentStatus::Error => summary.error += 1,
            }
            summary
        })
    }

    pub fn in_flight(&self) -> usize {
        self.pending + self.processing
    }

    pub fn is_settled(&self) -> bool {
        self.in_flight() == 0
    }

    pub fn totals(&self) -> AdmittedTotals {
        AdmittedTotals::new(self.count, self.total_bytes)
    }
}

enum Command {
    Admit {
        files: Vec<CandidateFile>,
        reply: oneshot::Sender<Result<Vec<AttachmentId>, ValidationError>>,
    },
    Apply {
        id: AttachmentId,
        event: TrackerEvent,
    },
    Remove {
        id: AttachmentId,
        reply: oneshot::Sender<bool>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Observe {
        observer: Arc<dyn SnapshotObserver>,
    },
    Current {
        reply: oneshot::Sender<Snapshot>,
    },
}

/// State owned by the tracker task.
struct TrackerState {
    records: Vec<AttachmentRecord>,
    next_id: u64,
    validator: AttachmentValidator,
    observers: Vec<Arc<dyn SnapshotObserver>>,
    snapshots: watch::Sender<Snapshot>,
}

impl TrackerState {
    fn new(validator: AttachmentValidator, snapshots: watch::Sender<Snapshot>) -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
            validator,
            observers: Vec::new(),
            snapshots,
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Admit { files, reply } => {
                let result = self.admit(files);
                let _ = reply.send(result);
            }
            Command::Apply { id, event } => self.apply(id, event),
            Command::Remove { id, reply } => {
                let _ = reply.send(self.remove(id));
            }
            Command::Reset { reply } => {
                self.reset();
                let _ = reply.send(());
            }
            Command::Observe { observer } => {
                observer.on_snapshot(&self.records);
                self.observers.push(observer);
            }
            Command::Current { reply } => {
                let _ = reply.send(self.snapshots.borrow().clone());
            }
        }
    }

    fn admit(&mut self, files: Vec<CandidateFile>) -> Result<Vec<AttachmentId>, ValidationError> {
        let existing = TrackerSummary::from_records(&self.records).totals();
        self.validator.validate_batch(existing, &files)?;

        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            let id = AttachmentId(self.next_id);
            self.next_id += 1;
            tracing::debug!(attachment_id = %id, file_name = %file.name(), "Attachment admitted");
            self.records.push(AttachmentRecord::new(id, file));
            ids.push(id);
        }

        self.publish();
        Ok(ids)
    }

    fn apply(&mut self, id: AttachmentId, event: TrackerEvent) {
        let Some(record) = self.records.iter_mut().find(|r| r.id == id) else {
            tracing::debug!(
                attachment_id = %id,
                event = event.name(),
                "Ignoring event for removed attachment"
            );
            return;
        };

        let event_name = event.name();
        match transition(&record.state, event) {
            Some(next) => {
                tracing::debug!(
                    attachment_id = %id,
                    from = %record.status(),
                    to = %next.status(),
                    "Attachment status changed"
                );
                record.state = next;
                self.publish();
            }
            None => {
                tracing::warn!(
                    attachment_id = %id,
                    status = %record.status(),
                    event = event_name,
                    "Ignoring illegal attachment transition"
                );
            }
        }
    }

    fn remove(&mut self, id: AttachmentId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        let removed = self.records.len() != before;
        if removed {
            tracing::debug!(attachment_id = %id, "Attachment removed");
            self.publish();
        }
        removed
    }

    fn reset(&mut self) {
        self.records.clear();
        self.publish();
    }

    fn publish(&self) {
        let snapshot: Snapshot = Arc::new(self.records.clone());
        for observer in &self.observers {
            observer.on_snapshot(&snapshot);
        }
        self.snapshots.send_replace(snapshot);
    }
}

/// Handle to the tracker task. Cheap to clone; the task stops once every
/// handle is dropped.
#[derive(Clone)]
pub struct AttachmentTracker {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
}

impl AttachmentTracker {
    /// Start the tracker task on the current Tokio runtime.
    pub fn spawn(validator: AttachmentValidator) -> Self {
        let (commands, mut command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(Snapshot::default());

        tokio::spawn(async move {
            let mut state = TrackerState::new(validator, snapshot_tx);
            while let Some(command) = command_rx.recv().await {
                state.handle(command);
            }
            tracing::debug!("Attachment tracker stopped");
        });

        Self {
            commands,
            snapshots,
        }
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::TrackerClosed)
    }

    /// Create records for `files` if the batch fits next to the existing
    /// records. The check and the insertion happen in one step.
    pub async fn admit(&self, files: Vec<CandidateFile>) -> Result<Vec<AttachmentId>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Admit { files, reply })?;
        let ids = rx.await.map_err(|_| SessionError::TrackerClosed)??;
        Ok(ids)
    }

    /// Mark a record as processing.
    pub fn start(&self, id: AttachmentId) -> Result<(), SessionError> {
        self.send(Command::Apply {
            id,
            event: TrackerEvent::Started,
        })
    }

    /// Record the outcome of an extraction.
    pub fn complete(
        &self,
        id: AttachmentId,
        outcome: Result<ProcessedAttachment, ExtractionError>,
    ) -> Result<(), SessionError> {
        let event = match outcome {
            Ok(processed) => TrackerEvent::Succeeded(Arc::new(processed)),
            Err(e) => TrackerEvent::Failed(e.to_string()),
        };
        self.send(Command::Apply { id, event })
    }

    /// Remove a record in any state. Returns whether it existed.
    pub async fn remove(&self, id: AttachmentId) -> Result<bool, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Remove { id, reply })?;
        rx.await.map_err(|_| SessionError::TrackerClosed)
    }

    /// Drop every record.
    pub async fn reset(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Reset { reply })?;
        rx.await.map_err(|_| SessionError::TrackerClosed)
    }

    /// Register a callback. It is called at once with the current records.
    pub fn observe(&self, observer: Arc<dyn SnapshotObserver>) -> Result<(), SessionError> {
        self.send(Command::Observe { observer })
    }

    /// Snapshot after every command queued so far has been applied.
    pub async fn current(&self) -> Result<Snapshot, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Current { reply })?;
        rx.await.map_err(|_| SessionError::TrackerClosed)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn summary(&self) -> TrackerSummary {
        TrackerSummary::from_records(&self.snapshot())
    }

    /// Wait until no record is pending or processing.
    pub async fn wait_until_settled(&self) -> Result<Snapshot, SessionError> {
        let mut snapshots = self.subscribe();
        let settled = snapshots
            .wait_for(|records| records.iter().all(|r| !r.is_in_flight()))
            .await
            .map_err(|_| SessionError::TrackerClosed)?;
        Ok(Arc::clone(&settled))
    }
}
