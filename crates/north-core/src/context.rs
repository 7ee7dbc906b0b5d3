//! Evaluation Context: correlation data supplied by the caller
//!
//! The engine never reads the clock or generates ids. Whoever calls it
//! builds one of these and hands it to the audit record builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    /// Component that produced the evaluation (ex: "evaluate-endpoint")
    pub source: String,
}

impl EvaluationContext {
    /// Fresh context with a random request id and the current time
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            source: source.into(),
        }
    }

    /// Context for a request id chosen upstream (ex: an `x-request-id` header)
    pub fn with_request_id(source: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            created_at: Utc::now(),
            source: source.into(),
        }
    }

    /// RFC 3339 timestamp with millisecond precision
    pub fn timestamp(&self) -> String {
        self.created_at
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}
