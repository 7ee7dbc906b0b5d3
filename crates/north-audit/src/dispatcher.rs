//! Fire-and-forget audit dispatch
//!
//! Evaluation never waits on persistence. Records are queued on a bounded
//! channel and written by a single background worker; a full or closed
//! queue drops the record with a warning.

use crate::store::AuditStore;
use north_policy::AuditRecord;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Outcome of handing a record to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Queued,
    /// Queue at capacity; record dropped
    QueueFull,
    /// Worker gone; record dropped
    Closed,
}

pub struct AuditDispatcher {
    sender: mpsc::Sender<AuditRecord>,
    worker: JoinHandle<()>,
}

impl AuditDispatcher {
    /// Start the persistence worker. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn AuditStore>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(store, receiver));
        Self { sender, worker }
    }

    /// Queue a record without waiting
    pub fn dispatch(&self, record: AuditRecord) -> DispatchOutcome {
        match self.sender.try_send(record) {
            Ok(()) => DispatchOutcome::Queued,
            Err(TrySendError::Full(record)) => {
                warn!(
                    decision_id = %record.decision_id,
                    request_id = %record.request_id,
                    "audit queue full, dropping record"
                );
                DispatchOutcome::QueueFull
            }
            Err(TrySendError::Closed(record)) => {
                warn!(
                    decision_id = %record.decision_id,
                    request_id = %record.request_id,
                    "audit worker stopped, dropping record"
                );
                DispatchOutcome::Closed
            }
        }
    }

    /// Close the queue and wait for everything already queued to be written
    pub async fn shutdown(self) {
        let Self { sender, worker } = self;
        drop(sender);
        if let Err(err) = worker.await {
            error!(error = %err, "audit worker panicked");
        }
    }
}

async fn run_worker(store: Arc<dyn AuditStore>, mut receiver: mpsc::Receiver<AuditRecord>) {
    while let Some(record) = receiver.recv().await {
        match store.persist(&record).await {
            Ok(receipt) => debug!(
                decision_id = %receipt.decision_id,
                location = %receipt.location,
                "audit record persisted"
            ),
            Err(err) => error!(
                decision_id = %err.decision_id,
                request_id = %record.request_id,
                error = %err.source,
                "audit persistence failed"
            ),
        }
    }
    debug!("audit worker drained");
}
