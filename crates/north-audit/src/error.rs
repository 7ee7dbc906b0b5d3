//! Persistence errors

use north_policy::DecisionId;
use thiserror::Error;

/// Failure inside an audit store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO/{0}")]
    Io(#[from] std::io::Error),

    #[error("SERIALIZE/{0}")]
    Serialize(#[from] serde_json::Error),

    #[error("STORE/{0}")]
    Rejected(String),
}

/// A record that could not be persisted.
///
/// Carries the decision id so the write can be retried without
/// re-evaluating the request.
#[derive(Debug, Error)]
#[error("failed to persist decision {decision_id}: {source}")]
pub struct PersistError {
    pub decision_id: DecisionId,
    #[source]
    pub source: StoreError,
}

impl PersistError {
    pub fn new(decision_id: DecisionId, source: impl Into<StoreError>) -> Self {
        Self {
            decision_id,
            source: source.into(),
        }
    }
}
