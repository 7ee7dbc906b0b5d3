//! Policy evaluation
//!
//! Runs the pipeline: score, guardrails, decision, confidence, reasons.

use crate::audit::{build_record, AuditRecord, DecisionId};
use crate::config::PolicyConfig;
use crate::decision::{confidence, decide, reasons, Decision};
use crate::guardrail::{evaluate_guardrails, GuardrailEffect, GuardrailHit};
use crate::risk::{score, RiskFactorContribution, RiskLevel, SynergyAdjustment};
use north_core::{EvaluationContext, NorthError};
use north_in::{normalize, ChangeRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Complete result of evaluating one change request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEvaluation {
    pub policy_version: String,
    pub risk_model: String,
    /// 0..100
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub decision: Decision,
    /// Within the configured confidence band
    pub confidence: f64,
    pub breakdown: Vec<RiskFactorContribution>,
    pub synergy_adjustments: Vec<SynergyAdjustment>,
    pub guardrail_hits: Vec<GuardrailHit>,
    pub reasons: Vec<String>,
}

impl PolicyEvaluation {
    pub fn next_steps(&self) -> Vec<&'static str> {
        self.decision.next_steps()
    }

    pub fn is_blocked(&self) -> bool {
        self.decision.is_blocked()
    }

    pub fn has_guardrail(&self, id: &str) -> bool {
        self.guardrail_hits.iter().any(|h| h.id == id)
    }

    /// One-line description
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} risk ({}/100) -> {} (confidence {:.2})",
            self.risk_level, self.risk_score, self.decision, self.confidence
        );

        let top: Vec<&str> = self
            .reasons
            .iter()
            .filter_map(|r| r.strip_prefix("factor_"))
            .collect();
        if !top.is_empty() {
            summary.push_str(&format!("; top factors: {}", top.join(", ")));
        }

        let guardrails: Vec<&str> = self
            .guardrail_hits
            .iter()
            .map(|h| h.id.as_str())
            .collect();
        if !guardrails.is_empty() {
            summary.push_str(&format!("; guardrails: {}", guardrails.join(", ")));
        }

        summary
    }
}

/// Evaluate a canonical request under a policy
pub fn evaluate(request: &ChangeRequest, config: &PolicyConfig) -> PolicyEvaluation {
    let risk = score(request, config);
    let risk_level = RiskLevel::from_score(risk.score, config);
    let guardrail_hits = evaluate_guardrails(request);
    let decision = decide(risk_level, request, &guardrail_hits, config);
    let reasons = reasons(&risk.breakdown, &risk.synergy_adjustments, &guardrail_hits);

    debug!(
        raw_score = risk.raw_score,
        risk_score = risk.score,
        risk_level = %risk_level,
        decision = %decision,
        blocking_guardrails = guardrail_hits
            .iter()
            .filter(|h| h.effect == GuardrailEffect::Block)
            .count(),
        "evaluated change request"
    );

    PolicyEvaluation {
        policy_version: config.policy_version.clone(),
        risk_model: config.risk_model.clone(),
        risk_score: risk.score,
        risk_level,
        decision,
        confidence: confidence(request, &config.confidence),
        breakdown: risk.breakdown,
        synergy_adjustments: risk.synergy_adjustments,
        guardrail_hits,
        reasons,
    }
}

/// A validated policy and the operations that use it
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    config: PolicyConfig,
}

impl PolicyEngine {
    /// Validate and take ownership of a policy
    pub fn new(config: PolicyConfig) -> Result<Self, NorthError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine over the built-in `weighted_v1` policy
    pub fn builtin() -> Self {
        Self {
            config: PolicyConfig::weighted_v1(),
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn policy_version(&self) -> &str {
        &self.config.policy_version
    }

    pub fn evaluate(&self, request: &ChangeRequest) -> PolicyEvaluation {
        evaluate(request, &self.config)
    }

    /// Normalize loosely-typed input, then evaluate it
    pub fn evaluate_raw(&self, raw: &Value) -> (ChangeRequest, PolicyEvaluation) {
        let request = normalize(raw);
        let evaluation = self.evaluate(&request);
        (request, evaluation)
    }

    pub fn decision_id(&self, request: &ChangeRequest) -> DecisionId {
        DecisionId::compute(&self.config.policy_version, request)
    }

    pub fn record(
        &self,
        context: &EvaluationContext,
        request: &ChangeRequest,
        evaluation: &PolicyEvaluation,
    ) -> AuditRecord {
        build_record(&self.config, context, request, evaluation)
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_rejects_invalid_policy() {
        let mut config = PolicyConfig::weighted_v1();
        config.thresholds.medium = 0;
        assert!(PolicyEngine::new(config).is_err());
    }

    #[test]
    fn test_evaluate_raw_normalizes() {
        let engine = PolicyEngine::builtin();
        let (request, evaluation) = engine.evaluate_raw(&json!({
            "env": "dev",
            "actionType": "Restart",
            "reversible": "true",
            "blastRadius": 1
        }));
        assert_eq!(request.action_category, "restart");
        assert_eq!(evaluation.risk_level, RiskLevel::Low);
        assert_eq!(evaluation.decision, Decision::Auto);
        assert_eq!(evaluation.policy_version, "2026.02");
        assert_eq!(evaluation.risk_model, "weighted_v1");
    }

    #[test]
    fn test_summary_mentions_decision_and_guardrails() {
        let engine = PolicyEngine::builtin();
        let (_, evaluation) = engine.evaluate_raw(&json!({
            "env": "prod",
            "action": "grant-role",
            "reversible": true,
            "blastRadius": 3
        }));
        let summary = evaluation.summary();
        assert!(summary.contains("APPROVAL"));
        assert!(summary.contains("GR_PROD_ACCESS_CONTROL"));
        assert!(summary.contains("top factors: "));
    }

    #[test]
    fn test_serialized_evaluation_shape() {
        let (_, evaluation) = PolicyEngine::builtin().evaluate_raw(&json!({"env": "prod"}));
        let json = serde_json::to_value(&evaluation).unwrap();
        for key in [
            "policyVersion",
            "riskModel",
            "riskScore",
            "riskLevel",
            "decision",
            "confidence",
            "breakdown",
            "synergyAdjustments",
            "guardrailHits",
            "reasons",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["breakdown"][0]["factor"], "environment");
        assert!(json["breakdown"][0].get("reasonTag").is_some());
    }
}
