//! Decision records
//!
//! Deterministic decision identifiers and the immutable audit record that is
//! handed to persistence. Building a record never touches I/O.

use crate::config::PolicyConfig;
use crate::evaluation::PolicyEvaluation;
use chrono::{DateTime, Utc};
use north_core::{canonical_json, digest_hex, EvaluationContext, NORTH_VERSION};
use north_in::ChangeRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema version written into every record
pub const AUDIT_RECORD_VERSION: &str = "1.0";

/// Hex characters kept from the BLAKE3 digest
pub const DECISION_ID_LEN: usize = 32;

/// Content-derived identifier of a (policy version, request) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(String);

impl DecisionId {
    /// Same policy version and same canonical request always give the same id
    pub fn compute(policy_version: &str, request: &ChangeRequest) -> Self {
        let value = serde_json::to_value(request).unwrap_or_default();
        let canonical = canonical_json(&value);
        Self(digest_hex(
            &[policy_version.as_bytes(), b"\n", canonical.as_bytes()],
            DECISION_ID_LEN,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a record came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMeta {
    pub source: String,
    pub runtime: String,
}

impl Default for AuditMeta {
    fn default() -> Self {
        Self {
            source: "unknown".to_string(),
            runtime: runtime(),
        }
    }
}

fn runtime() -> String {
    format!("north/{}", NORTH_VERSION)
}

fn default_true() -> bool {
    true
}

/// Audit record, schema v1.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub audit_record_version: String,
    pub decision_id: DecisionId,
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    pub policy_version: String,
    #[serde(default = "default_true")]
    pub strict_production: bool,
    pub input: ChangeRequest,
    pub policy: PolicyEvaluation,
    #[serde(default)]
    pub meta: AuditMeta,
}

impl AuditRecord {
    /// `<decisionId>/<requestId>.json`
    pub fn relative_path(&self) -> String {
        format!("{}/{}.json", self.decision_id, self.request_id)
    }
}

/// Assemble the audit record for an evaluation
pub fn build_record(
    config: &PolicyConfig,
    context: &EvaluationContext,
    request: &ChangeRequest,
    evaluation: &PolicyEvaluation,
) -> AuditRecord {
    AuditRecord {
        audit_record_version: AUDIT_RECORD_VERSION.to_string(),
        decision_id: DecisionId::compute(&config.policy_version, request),
        request_id: context.request_id.clone(),
        created_at: context.created_at,
        policy_version: config.policy_version.clone(),
        strict_production: config.strict_production,
        input: request.clone(),
        policy: evaluation.clone(),
        meta: AuditMeta {
            source: context.source.clone(),
            runtime: runtime(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::evaluate;
    use north_in::{BlastRadius, Environment};
    use serde_json::json;

    fn request() -> ChangeRequest {
        ChangeRequest::new(Environment::Prod, "deploy").with_blast_radius(BlastRadius::numeric(4.0))
    }

    #[test]
    fn test_decision_id_shape() {
        let id = DecisionId::compute("2026.02", &request());
        assert_eq!(id.as_str().len(), DECISION_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_decision_id_depends_on_policy_version() {
        let a = DecisionId::compute("2026.02", &request());
        let b = DecisionId::compute("2026.03", &request());
        assert_ne!(a, b);
    }

    #[test]
    fn test_decision_id_ignores_extra_key_order() {
        let a = request()
            .with_extra("ticket", json!({"id": 1, "system": "snow"}))
            .with_extra("owner", json!("sre"));
        let b = request()
            .with_extra("owner", json!("sre"))
            .with_extra("ticket", json!({"system": "snow", "id": 1}));
        assert_eq!(DecisionId::compute("v", &a), DecisionId::compute("v", &b));
    }

    #[test]
    fn test_record_ignores_context_for_id() {
        let config = PolicyConfig::weighted_v1();
        let evaluation = evaluate(&request(), &config);
        let first = build_record(&config, &EvaluationContext::new("api"), &request(), &evaluation);
        let second = build_record(&config, &EvaluationContext::new("cli"), &request(), &evaluation);

        assert_ne!(first.request_id, second.request_id);
        assert_eq!(first.decision_id, second.decision_id);
        assert_eq!(first.meta.source, "api");
        assert!(first.meta.runtime.starts_with("north/"));
    }

    #[test]
    fn test_record_serialized_shape() {
        let config = PolicyConfig::weighted_v1();
        let evaluation = evaluate(&request(), &config);
        let context = EvaluationContext::with_request_id("api", "req-1");
        let record = build_record(&config, &context, &request(), &evaluation);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["auditRecordVersion"], "1.0");
        assert_eq!(json["requestId"], "req-1");
        assert_eq!(json["policyVersion"], "2026.02");
        assert_eq!(json["strictProduction"], true);
        assert_eq!(json["input"]["environment"], "prod");
        assert!(json["policy"]["riskScore"].is_u64());
        assert_eq!(record.relative_path(), format!("{}/req-1.json", record.decision_id));

        let back: AuditRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.decision_id, record.decision_id);
        assert_eq!(back.created_at, record.created_at);
        assert_eq!(back.policy.decision, record.policy.decision);
    }

    #[test]
    fn test_older_records_without_meta_still_read() {
        let config = PolicyConfig::weighted_v1();
        let evaluation = evaluate(&request(), &config);
        let record = build_record(&config, &EvaluationContext::new("api"), &request(), &evaluation);
        let mut json = serde_json::to_value(&record).unwrap();
        let map = json.as_object_mut().unwrap();
        map.remove("meta");
        map.remove("strictProduction");

        let back: AuditRecord = serde_json::from_value(json).unwrap();
        assert!(back.strict_production);
        assert_eq!(back.meta.source, "unknown");
    }
}
