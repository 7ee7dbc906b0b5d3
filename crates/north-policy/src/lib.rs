//! North Policy: risk scoring, guardrails and decisions
//!
//! Evaluates canonical change requests against a versioned policy.
//!
//! # Architecture
//!
//! ```text
//! ChangeRequest → Risk Scoring → Guardrails → Decision & Confidence → PolicyEvaluation
//!                     ↓              ↓                  ↓                    ↓
//!              breakdown +      GuardrailHit      AUTO/APPROVAL/BLOCK   Audit Record
//!               synergies
//! ```
//!
//! Every stage is a pure function of the request and the [`PolicyConfig`];
//! the caller's request id and timestamp only reach the audit record.
//!
//! # Example
//!
//! ```
//! use north_policy::{Decision, PolicyEngine, RiskLevel};
//! use serde_json::json;
//!
//! let engine = PolicyEngine::builtin();
//!
//! let (request, evaluation) = engine.evaluate_raw(&json!({
//!     "env": "prod",
//!     "actionCategory": "delete",
//!     "reversible": false,
//!     "blastRadius": 10,
//!     "governanceMissing": ["approval"]
//! }));
//!
//! assert_eq!(evaluation.risk_level, RiskLevel::Critical);
//! assert_eq!(evaluation.decision, Decision::Block);
//! assert!(evaluation.has_guardrail("GR_PROD_DESTRUCTIVE_GLOBAL_IRREV"));
//!
//! let id = engine.decision_id(&request);
//! assert_eq!(id.as_str().len(), 32);
//! ```
//!
//! # Custom policies
//!
//! ```
//! use north_policy::PolicyConfig;
//!
//! let mut config = PolicyConfig::weighted_v1();
//! config.strict_production = false;
//! config.weights.change_window = 8.0;
//!
//! let yaml = config.to_yaml().unwrap();
//! assert_eq!(PolicyConfig::from_yaml(&yaml).unwrap(), config);
//! ```

pub mod audit;
pub mod config;
pub mod decision;
pub mod evaluation;
pub mod guardrail;
pub mod risk;

pub use audit::{build_record, AuditMeta, AuditRecord, DecisionId, AUDIT_RECORD_VERSION};
pub use config::{
    ActionSeverity, ConfidenceBand, EnvironmentSeverity, FactorWeights, Penalties, PolicyConfig,
    Thresholds,
};
pub use decision::{base_decision, confidence, decide, reasons, Decision};
pub use evaluation::{evaluate, PolicyEngine, PolicyEvaluation};
pub use guardrail::{evaluate_guardrails, guardrails, Guardrail, GuardrailEffect, GuardrailHit};
pub use risk::{
    score, synergies, Factor, RiskCalculator, RiskFactorContribution, RiskLevel, RiskScore,
    SynergyAdjustment,
};

#[cfg(test)]
mod tests {
    use super::*;
    use north_in::{BlastRadius, ChangeRequest, Environment};

    #[test]
    fn test_full_workflow() {
        let engine = PolicyEngine::builtin();
        let request = ChangeRequest::new(Environment::Staging, "terraform apply")
            .with_blast_radius(BlastRadius::descriptive("eu region"))
            .missing("runbook");

        let evaluation = engine.evaluate(&request);
        let record = engine.record(
            &north_core::EvaluationContext::new("test"),
            &request,
            &evaluation,
        );

        assert_eq!(record.decision_id, engine.decision_id(&request));
        assert_eq!(record.policy, evaluation);
        assert!(evaluation.decision.requires_human());
    }
}
