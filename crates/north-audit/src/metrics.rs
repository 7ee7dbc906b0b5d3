//! Decision metrics over stored audit records

use crate::error::StoreError;
use crate::store::AuditStore;
use chrono::{DateTime, Utc};
use north_policy::AUDIT_RECORD_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const UNKNOWN: &str = "UNKNOWN";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionMetrics {
    pub total_decisions: u64,
    pub by_risk_level: BTreeMap<String, u64>,
    pub by_decision: BTreeMap<String, u64>,
    pub by_policy_version: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_created_at: Option<String>,
}

impl DecisionMetrics {
    /// Count one document. Returns false (and counts nothing) for anything
    /// that is not a v1.0 audit record.
    pub fn record(&mut self, document: &Value) -> bool {
        let is_record = document
            .get("auditRecordVersion")
            .and_then(Value::as_str)
            .is_some_and(|v| v == AUDIT_RECORD_VERSION);
        if !is_record {
            return false;
        }

        self.total_decisions += 1;
        bump(&mut self.by_risk_level, document.pointer("/policy/riskLevel"));
        bump(&mut self.by_decision, document.pointer("/policy/decision"));
        bump(&mut self.by_policy_version, document.get("policyVersion"));

        if let Some(created_at) = document.get("createdAt").and_then(Value::as_str) {
            if self.is_later(created_at) {
                self.latest_created_at = Some(created_at.to_string());
            }
        }
        true
    }

    fn is_later(&self, candidate: &str) -> bool {
        let Some(current) = &self.latest_created_at else {
            return true;
        };
        match (parse_time(candidate), parse_time(current)) {
            (Some(candidate), Some(current)) => candidate > current,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => candidate > current.as_str(),
        }
    }
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn bump(counts: &mut BTreeMap<String, u64>, key: Option<&Value>) {
    let key = key.and_then(Value::as_str).unwrap_or(UNKNOWN);
    *counts.entry(key.to_string()).or_insert(0) += 1;
}

/// Aggregate raw documents into decision metrics
pub fn aggregate<'a>(documents: impl IntoIterator<Item = &'a Value>) -> DecisionMetrics {
    let mut metrics = DecisionMetrics::default();
    for document in documents {
        metrics.record(document);
    }
    metrics
}

/// Load every document from a store and aggregate it
pub async fn collect(store: &dyn AuditStore) -> Result<DecisionMetrics, StoreError> {
    let documents = store.load_all().await?;
    Ok(aggregate(&documents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(level: &str, decision: &str, created_at: &str) -> Value {
        json!({
            "auditRecordVersion": "1.0",
            "policyVersion": "2026.02",
            "createdAt": created_at,
            "policy": {"riskLevel": level, "decision": decision}
        })
    }

    #[test]
    fn test_counts() {
        let docs = vec![
            doc("LOW", "AUTO", "2026-02-01T10:00:00.000Z"),
            doc("LOW", "APPROVAL", "2026-02-03T10:00:00.000Z"),
            doc("CRITICAL", "BLOCK", "2026-02-02T10:00:00.000Z"),
        ];
        let metrics = aggregate(&docs);

        assert_eq!(metrics.total_decisions, 3);
        assert_eq!(metrics.by_risk_level["LOW"], 2);
        assert_eq!(metrics.by_decision["BLOCK"], 1);
        assert_eq!(metrics.by_policy_version["2026.02"], 3);
        assert_eq!(metrics.latest_created_at.as_deref(), Some("2026-02-03T10:00:00.000Z"));
    }

    #[test]
    fn test_latest_compares_instants() {
        let docs = vec![
            doc("LOW", "AUTO", "2026-02-01T12:00:00+02:00"),
            doc("LOW", "AUTO", "2026-02-01T11:00:00Z"),
        ];
        let metrics = aggregate(&docs);
        assert_eq!(metrics.latest_created_at.as_deref(), Some("2026-02-01T11:00:00Z"));
    }

    #[test]
    fn test_missing_keys_are_unknown() {
        let docs = vec![json!({"auditRecordVersion": "1.0"})];
        let metrics = aggregate(&docs);

        assert_eq!(metrics.total_decisions, 1);
        assert_eq!(metrics.by_risk_level[UNKNOWN], 1);
        assert_eq!(metrics.by_decision[UNKNOWN], 1);
        assert_eq!(metrics.by_policy_version[UNKNOWN], 1);
        assert_eq!(metrics.latest_created_at, None);
    }

    #[test]
    fn test_other_documents_skipped() {
        let docs = vec![
            json!({"auditRecordVersion": "0.9", "policy": {"decision": "AUTO"}}),
            json!({"auditRecordVersion": 1.0}),
            json!([1, 2]),
            json!("text"),
        ];
        assert_eq!(aggregate(&docs), DecisionMetrics::default());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(aggregate(&Vec::<Value>::new())).unwrap();
        assert_eq!(json["totalDecisions"], 0);
        assert!(json["byRiskLevel"].as_object().unwrap().is_empty());
        assert!(json.get("latestCreatedAt").is_none());
    }
}
