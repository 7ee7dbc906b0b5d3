//! Decision and confidence
//!
//! Turns a risk level, guardrail hits and governance signals into the final
//! execution decision, plus a bounded confidence value and the ordered
//! reason list.

use crate::config::{ConfidenceBand, PolicyConfig};
use crate::guardrail::{GuardrailEffect, GuardrailHit};
use crate::risk::{RiskFactorContribution, RiskLevel, SynergyAdjustment};
use north_in::{ActionClass, ChangeRequest, Environment};
use serde::{Deserialize, Serialize};
use std::fmt;

const CONFIDENCE_NO_ACTION: f64 = 0.12;
const CONFIDENCE_NO_BLAST_RADIUS: f64 = 0.08;
const CONFIDENCE_GOVERNANCE_CLEAN: f64 = 0.04;
const CONFIDENCE_UNKNOWN_BUCKET: f64 = 0.04;

/// How many top factors are named in the reasons
const TOP_FACTORS: usize = 3;

/// Execution decision, ordered from least to most restrictive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Execute without human involvement
    Auto,
    /// Human sign-off required
    Approval,
    /// Disallowed
    Block,
}

impl Decision {
    /// Take the more restrictive of two decisions
    pub fn escalate(self, other: Decision) -> Decision {
        self.max(other)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Decision::Block)
    }

    pub fn requires_human(&self) -> bool {
        !matches!(self, Decision::Auto)
    }

    /// Operator checklist for this decision
    pub fn next_steps(&self) -> Vec<&'static str> {
        match self {
            Decision::Auto => vec!["execute_change", "monitor"],
            Decision::Approval => vec![
                "request_human_approval",
                "verify_backup",
                "confirm_change_ticket",
            ],
            Decision::Block => vec!["block_execution", "escalate_to_oncall"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Auto => "AUTO",
            Decision::Approval => "APPROVAL",
            Decision::Block => "BLOCK",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decision implied by the risk level alone
pub fn base_decision(level: RiskLevel, environment: Environment, strict_production: bool) -> Decision {
    match level {
        RiskLevel::Low => Decision::Auto,
        RiskLevel::Medium => {
            let relaxed = matches!(environment, Environment::Dev | Environment::Staging);
            if !strict_production && relaxed {
                Decision::Auto
            } else {
                Decision::Approval
            }
        }
        RiskLevel::High => Decision::Approval,
        RiskLevel::Critical => Decision::Block,
    }
}

/// Final decision: base, then the governance floor, then guardrails.
/// Each step can only escalate.
pub fn decide(
    level: RiskLevel,
    request: &ChangeRequest,
    hits: &[GuardrailHit],
    config: &PolicyConfig,
) -> Decision {
    let mut decision = base_decision(level, request.environment, config.strict_production);

    if decision == Decision::Auto && !request.governance_missing.is_empty() {
        decision = Decision::Approval;
    }

    for hit in hits {
        let forced = match hit.effect {
            GuardrailEffect::Block => Decision::Block,
            GuardrailEffect::RequireApproval => Decision::Approval,
        };
        decision = decision.escalate(forced);
    }

    decision
}

/// Confidence in the evaluation given how much signal the request carried
pub fn confidence(request: &ChangeRequest, band: &ConfidenceBand) -> f64 {
    let mut value = band.baseline;

    if request.action_category.is_empty() {
        value -= CONFIDENCE_NO_ACTION;
    }
    if request.blast_radius.is_unknown() {
        value -= CONFIDENCE_NO_BLAST_RADIUS;
    }
    if request.governance_missing.is_empty() {
        value += CONFIDENCE_GOVERNANCE_CLEAN;
    }
    if request.action_class() == ActionClass::Unknown {
        value -= CONFIDENCE_UNKNOWN_BUCKET;
    }
    if request.blast_radius.is_unknown() {
        value -= CONFIDENCE_UNKNOWN_BUCKET;
    }

    round2(value.clamp(band.min, band.max))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Ordered, duplicate-free reasons: top factors, factor tags, synergies, guardrails
pub fn reasons(
    breakdown: &[RiskFactorContribution],
    synergies: &[SynergyAdjustment],
    hits: &[GuardrailHit],
) -> Vec<String> {
    let mut ranked: Vec<&RiskFactorContribution> = breakdown.iter().collect();
    // stable: ties keep breakdown order
    ranked.sort_by(|a, b| b.contribution.cmp(&a.contribution));

    let candidates = ranked
        .iter()
        .take(TOP_FACTORS)
        .map(|c| format!("factor_{}", c.factor))
        .chain(breakdown.iter().map(|c| c.reason_tag.clone()))
        .chain(synergies.iter().map(|s| s.id.clone()))
        .chain(hits.iter().map(|h| h.id.clone()));

    let mut reasons = Vec::new();
    for reason in candidates {
        if !reasons.contains(&reason) {
            reasons.push(reason);
        }
    }
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::Factor;
    use north_in::BlastRadius;
    use serde_json::Value;

    fn hit(id: &str, effect: GuardrailEffect) -> GuardrailHit {
        GuardrailHit {
            id: id.to_string(),
            effect,
            rationale: String::new(),
        }
    }

    fn contribution(factor: Factor, points: u32, tag: &str) -> RiskFactorContribution {
        RiskFactorContribution {
            factor,
            input_value: Value::Null,
            severity: 0.5,
            weight: 10.0,
            contribution: points,
            rationale: String::new(),
            reason_tag: tag.to_string(),
        }
    }

    #[test]
    fn test_decision_ordering() {
        assert!(Decision::Auto < Decision::Approval);
        assert!(Decision::Approval < Decision::Block);
        assert_eq!(Decision::Approval.escalate(Decision::Auto), Decision::Approval);
        assert_eq!(Decision::Approval.escalate(Decision::Block), Decision::Block);
    }

    #[test]
    fn test_base_decision() {
        assert_eq!(base_decision(RiskLevel::Low, Environment::Prod, true), Decision::Auto);
        assert_eq!(base_decision(RiskLevel::Medium, Environment::Dev, true), Decision::Approval);
        assert_eq!(base_decision(RiskLevel::High, Environment::Dev, false), Decision::Approval);
        assert_eq!(base_decision(RiskLevel::Critical, Environment::Dev, false), Decision::Block);
    }

    #[test]
    fn test_relaxed_medium_only_outside_production() {
        assert_eq!(base_decision(RiskLevel::Medium, Environment::Staging, false), Decision::Auto);
        assert_eq!(base_decision(RiskLevel::Medium, Environment::Prod, false), Decision::Approval);
        assert_eq!(base_decision(RiskLevel::Medium, Environment::Unknown, false), Decision::Approval);
    }

    #[test]
    fn test_governance_floor() {
        let config = PolicyConfig::weighted_v1();
        let request = ChangeRequest::new(Environment::Dev, "restart").missing("runbook");
        assert_eq!(decide(RiskLevel::Low, &request, &[], &config), Decision::Approval);
    }

    #[test]
    fn test_block_guardrail_wins_at_low() {
        let config = PolicyConfig::weighted_v1();
        let request = ChangeRequest::new(Environment::Dev, "restart");
        let hits = [hit("GR_X", GuardrailEffect::Block)];
        assert_eq!(decide(RiskLevel::Low, &request, &hits, &config), Decision::Block);
    }

    #[test]
    fn test_guardrails_never_deescalate() {
        let config = PolicyConfig::weighted_v1();
        let request = ChangeRequest::new(Environment::Prod, "drop table");
        let hits = [hit("GR_Y", GuardrailEffect::RequireApproval)];
        assert_eq!(decide(RiskLevel::Critical, &request, &hits, &config), Decision::Block);
        assert_eq!(decide(RiskLevel::Low, &request, &hits, &config), Decision::Approval);
    }

    #[test]
    fn test_next_steps() {
        assert_eq!(Decision::Auto.next_steps(), vec!["execute_change", "monitor"]);
        assert_eq!(Decision::Block.next_steps()[0], "block_execution");
        assert_eq!(Decision::Approval.next_steps().len(), 3);
    }

    #[test]
    fn test_confidence_well_specified() {
        let band = ConfidenceBand::default();
        let request = ChangeRequest::new(Environment::Dev, "restart")
            .with_blast_radius(BlastRadius::numeric(1.0));
        assert_eq!(confidence(&request, &band), 0.82);
    }

    #[test]
    fn test_confidence_empty_request_hits_floor() {
        let band = ConfidenceBand::default();
        // 0.78 - 0.12 - 0.08 + 0.04 - 0.04 - 0.04 = 0.54
        assert_eq!(confidence(&ChangeRequest::default(), &band), 0.55);
    }

    #[test]
    fn test_confidence_unknown_action_and_governance() {
        let band = ConfidenceBand::default();
        let request = ChangeRequest::new(Environment::Prod, "xyzzy")
            .with_blast_radius(BlastRadius::numeric(3.0))
            .missing("approval");
        assert_eq!(confidence(&request, &band), 0.74);
    }

    #[test]
    fn test_reasons_order_and_dedup() {
        let breakdown = vec![
            contribution(Factor::Environment, 3, "dev_environment"),
            contribution(Factor::ActionCategory, 7, "restart_action"),
            contribution(Factor::BlastRadius, 7, "restart_action"),
            contribution(Factor::Reversible, 1, "reversible"),
        ];
        let synergies = vec![SynergyAdjustment {
            id: "prod_global".to_string(),
            delta: 5,
            rationale: String::new(),
        }];
        let hits = vec![hit("GR_PROD_ACCESS_CONTROL", GuardrailEffect::RequireApproval)];

        assert_eq!(
            reasons(&breakdown, &synergies, &hits),
            vec![
                "factor_actionCategory",
                "factor_blastRadius",
                "factor_environment",
                "dev_environment",
                "restart_action",
                "reversible",
                "prod_global",
                "GR_PROD_ACCESS_CONTROL",
            ]
        );
    }
}
