//! Risk scoring
//!
//! Weighted multi-factor score on a 0..100 scale, followed by a synergy pass
//! that adds points for dangerous factor combinations.

use crate::config::PolicyConfig;
use north_in::{
    AssetCriticality, BlastSource, ChangeRequest, ChangeWindow, GovernanceGap, PrivilegeLevel,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Severity of an optional factor that was supplied but not recognized
const OPTIONAL_UNKNOWN_SEVERITY: f64 = 0.6;

/// Risk level of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl RiskLevel {
    /// Level for a score under the given policy thresholds
    pub fn from_score(score: u32, config: &PolicyConfig) -> Self {
        config.thresholds.level_for(score)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scored dimension of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Factor {
    Environment,
    ActionCategory,
    BlastRadius,
    Reversible,
    GovernanceMissing,
    AssetCriticality,
    ChangeWindow,
    PrivilegeLevel,
}

impl Factor {
    pub const ALL: [Factor; 8] = [
        Factor::Environment,
        Factor::ActionCategory,
        Factor::BlastRadius,
        Factor::Reversible,
        Factor::GovernanceMissing,
        Factor::AssetCriticality,
        Factor::ChangeWindow,
        Factor::PrivilegeLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Environment => "environment",
            Factor::ActionCategory => "actionCategory",
            Factor::BlastRadius => "blastRadius",
            Factor::Reversible => "reversible",
            Factor::GovernanceMissing => "governanceMissing",
            Factor::AssetCriticality => "assetCriticality",
            Factor::ChangeWindow => "changeWindow",
            Factor::PrivilegeLevel => "privilegeLevel",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of the score breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactorContribution {
    pub factor: Factor,
    /// The normalized input the severity was derived from
    pub input_value: Value,
    /// 0..1
    pub severity: f64,
    pub weight: f64,
    /// `round(weight * severity)` points, at most 100
    pub contribution: u32,
    pub rationale: String,
    pub reason_tag: String,
}

impl RiskFactorContribution {
    fn new(
        factor: Factor,
        input_value: Value,
        severity: f64,
        config: &PolicyConfig,
        rationale: impl Into<String>,
        reason_tag: impl Into<String>,
    ) -> Self {
        let severity = severity.clamp(0.0, 1.0);
        let weight = config.weights.get(factor);
        Self {
            factor,
            input_value,
            severity,
            weight,
            contribution: (weight * severity).round().clamp(0.0, 100.0) as u32,
            rationale: rationale.into(),
            reason_tag: reason_tag.into(),
        }
    }
}

/// Score correction for a dangerous combination of factors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynergyAdjustment {
    pub id: String,
    pub delta: i32,
    pub rationale: String,
}

impl SynergyAdjustment {
    fn new(id: &str, delta: i32, rationale: &str) -> Self {
        Self {
            id: id.to_string(),
            delta,
            rationale: rationale.to_string(),
        }
    }
}

/// Output of the scoring stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskScore {
    /// Final score after synergies, 0..100
    pub score: u32,
    /// Weighted sum before synergies, 0..100
    pub raw_score: u32,
    pub breakdown: Vec<RiskFactorContribution>,
    pub synergy_adjustments: Vec<SynergyAdjustment>,
}

/// Scores change requests against one policy
pub struct RiskCalculator<'a> {
    config: &'a PolicyConfig,
}

impl<'a> RiskCalculator<'a> {
    pub fn new(config: &'a PolicyConfig) -> Self {
        Self { config }
    }

    pub fn calculate(&self, request: &ChangeRequest) -> RiskScore {
        let breakdown = self.breakdown(request);
        let raw_score = breakdown
            .iter()
            .fold(0u32, |total, c| total.saturating_add(c.contribution))
            .min(100);

        let synergy_adjustments = synergies(request);
        let delta: i64 = synergy_adjustments.iter().map(|s| s.delta as i64).sum();
        let score = (raw_score as i64 + delta).clamp(0, 100) as u32;

        RiskScore {
            score,
            raw_score,
            breakdown,
            synergy_adjustments,
        }
    }

    /// Mandatory factors always, optional factors only when supplied
    pub fn breakdown(&self, request: &ChangeRequest) -> Vec<RiskFactorContribution> {
        let mut factors = vec![
            self.environment(request),
            self.action_category(request),
            self.blast_radius(request),
            self.reversible(request),
            self.governance(request),
        ];

        if let Some(value) = request.asset_criticality {
            factors.push(self.asset_criticality(value));
        }
        if let Some(value) = request.change_window {
            factors.push(self.change_window(value));
        }
        if let Some(value) = request.privilege_level {
            factors.push(self.privilege_level(value));
        }

        factors
    }

    fn environment(&self, request: &ChangeRequest) -> RiskFactorContribution {
        let env = request.environment;
        let rationale = match env {
            north_in::Environment::Prod => "production changes carry the highest impact",
            north_in::Environment::Staging => "staging changes have moderate impact",
            north_in::Environment::Dev => "development changes have low impact",
            north_in::Environment::Unknown => "unknown environment defaults to moderate risk",
        };
        RiskFactorContribution::new(
            Factor::Environment,
            json!(env.as_str()),
            self.config.environment_severity.get(env) / 100.0,
            self.config,
            rationale,
            format!("{}_environment", env),
        )
    }

    fn action_category(&self, request: &ChangeRequest) -> RiskFactorContribution {
        let class = request.action_class();
        RiskFactorContribution::new(
            Factor::ActionCategory,
            json!(request.action_category),
            self.config.action_severity.get(class) / 100.0,
            self.config,
            class.rationale(),
            class.reason_tag(),
        )
    }

    fn blast_radius(&self, request: &ChangeRequest) -> RiskFactorContribution {
        let br = &request.blast_radius;
        let points = (br.clamped() * self.config.blast_radius_multiplier).min(self.config.blast_radius_max);
        let input_value = match (br.source, &br.label) {
            (BlastSource::Numeric, _) => json!(br.magnitude),
            (_, Some(label)) => json!(label),
            (_, None) => Value::Null,
        };
        RiskFactorContribution::new(
            Factor::BlastRadius,
            input_value,
            points / 100.0,
            self.config,
            br.scope.rationale(),
            br.scope.reason_tag(),
        )
    }

    fn reversible(&self, request: &ChangeRequest) -> RiskFactorContribution {
        let penalties = &self.config.penalties;
        let (severity, rationale, tag) = if request.reversible {
            (penalties.reversible, "change can be rolled back", "reversible")
        } else {
            (
                penalties.irreversible,
                "irreversible changes cannot be rolled back",
                "not_reversible",
            )
        };
        RiskFactorContribution::new(
            Factor::Reversible,
            json!(request.reversible),
            severity / 100.0,
            self.config,
            rationale,
            tag,
        )
    }

    fn governance(&self, request: &ChangeRequest) -> RiskFactorContribution {
        let penalties = &self.config.penalties;
        let (severity, rationale, tag) = match request.governance_gap() {
            None => (0.0, "required governance controls are present", "governance_ok"),
            Some(gap) => {
                let severity = match gap {
                    GovernanceGap::Critical => penalties.governance_missing,
                    GovernanceGap::Operational => penalties.governance_operational,
                    GovernanceGap::Minor => penalties.governance_minor,
                };
                (severity, gap.rationale(), "governance_requirements_missing")
            }
        };
        RiskFactorContribution::new(
            Factor::GovernanceMissing,
            json!(request.governance_missing),
            severity / 100.0,
            self.config,
            rationale,
            tag,
        )
    }

    fn asset_criticality(&self, value: AssetCriticality) -> RiskFactorContribution {
        let severity = match value {
            AssetCriticality::Tier0 => 1.0,
            AssetCriticality::Tier1 => 0.7,
            AssetCriticality::Tier2 => 0.4,
            AssetCriticality::Unknown => OPTIONAL_UNKNOWN_SEVERITY,
        };
        RiskFactorContribution::new(
            Factor::AssetCriticality,
            json!(value),
            severity,
            self.config,
            "criticality of the affected asset",
            "asset_criticality",
        )
    }

    fn change_window(&self, value: ChangeWindow) -> RiskFactorContribution {
        let severity = match value {
            ChangeWindow::Freeze => 1.0,
            ChangeWindow::OffHours => 0.6,
            ChangeWindow::BusinessHours => 0.3,
            ChangeWindow::Unknown => OPTIONAL_UNKNOWN_SEVERITY,
        };
        RiskFactorContribution::new(
            Factor::ChangeWindow,
            json!(value),
            severity,
            self.config,
            "timing of the change relative to the change calendar",
            "change_window",
        )
    }

    fn privilege_level(&self, value: PrivilegeLevel) -> RiskFactorContribution {
        let severity = match value {
            PrivilegeLevel::High => 1.0,
            PrivilegeLevel::Medium => 0.6,
            PrivilegeLevel::Low => 0.3,
            PrivilegeLevel::Unknown => OPTIONAL_UNKNOWN_SEVERITY,
        };
        RiskFactorContribution::new(
            Factor::PrivilegeLevel,
            json!(value),
            severity,
            self.config,
            "privilege required to perform the change",
            "privilege_level",
        )
    }
}

/// Score a request under a policy
pub fn score(request: &ChangeRequest, config: &PolicyConfig) -> RiskScore {
    RiskCalculator::new(config).calculate(request)
}

/// Additive corrections for production combinations the weighted sum underrates
pub fn synergies(request: &ChangeRequest) -> Vec<SynergyAdjustment> {
    if !request.environment.is_production() {
        return Vec::new();
    }

    let mut adjustments = Vec::new();
    if !request.reversible {
        adjustments.push(SynergyAdjustment::new(
            "prod_irreversible",
            6,
            "irreversible change in production",
        ));
    }
    if request.blast_radius.is_global() {
        adjustments.push(SynergyAdjustment::new(
            "prod_global",
            5,
            "global blast radius in production",
        ));
    }
    if request.is_destructive() {
        adjustments.push(SynergyAdjustment::new(
            "prod_destructive",
            6,
            "destructive action in production",
        ));
    }
    if request.is_access_control() {
        adjustments.push(SynergyAdjustment::new(
            "prod_access_control",
            6,
            "access control change in production",
        ));
    }
    if request.missing_critical_governance() {
        adjustments.push(SynergyAdjustment::new(
            "prod_missing_critical_governance",
            7,
            "critical governance missing in production",
        ));
    }
    adjustments
}

#[cfg(test)]
mod tests {
    use super::*;
    use north_in::{BlastRadius, Environment};

    fn config() -> PolicyConfig {
        PolicyConfig::weighted_v1()
    }

    #[test]
    fn test_dev_restart_scores_low() {
        let request = ChangeRequest::new(Environment::Dev, "restart")
            .with_blast_radius(BlastRadius::numeric(1.0));
        let result = score(&request, &config());

        // 3 + 7 + 2 + 3 + 0
        assert_eq!(result.raw_score, 15);
        assert_eq!(result.score, 15);
        assert!(result.synergy_adjustments.is_empty());
        assert_eq!(RiskLevel::from_score(result.score, &config()), RiskLevel::Low);
    }

    #[test]
    fn test_breakdown_has_mandatory_factors_in_order() {
        let request = ChangeRequest::default();
        let factors: Vec<Factor> = score(&request, &config())
            .breakdown
            .iter()
            .map(|c| c.factor)
            .collect();
        assert_eq!(
            factors,
            vec![
                Factor::Environment,
                Factor::ActionCategory,
                Factor::BlastRadius,
                Factor::Reversible,
                Factor::GovernanceMissing,
            ]
        );
    }

    #[test]
    fn test_optional_factors_only_when_supplied() {
        let request = ChangeRequest::new(Environment::Dev, "deploy")
            .with_change_window(ChangeWindow::Freeze);
        let breakdown = score(&request, &config()).breakdown;
        assert_eq!(breakdown.len(), 6);

        let window = &breakdown[5];
        assert_eq!(window.factor, Factor::ChangeWindow);
        assert_eq!(window.severity, 1.0);
        // weighted_v1 gives optional factors no weight
        assert_eq!(window.contribution, 0);
    }

    #[test]
    fn test_optional_factor_weight_counts_when_configured() {
        let mut cfg = config();
        cfg.weights.asset_criticality = 10.0;
        let request = ChangeRequest::new(Environment::Dev, "restart")
            .with_blast_radius(BlastRadius::numeric(1.0))
            .with_asset_criticality(AssetCriticality::Tier1);
        let result = score(&request, &cfg);
        assert_eq!(result.raw_score, 15 + 7);
    }

    #[test]
    fn test_unknown_action_has_moderate_severity() {
        let request = ChangeRequest::new(Environment::Dev, "xyzzy");
        let action = &score(&request, &config()).breakdown[1];
        assert_eq!(action.reason_tag, "unknown_action_type");
        assert!(action.severity > 0.0);
        assert!(action.severity < 1.0);
    }

    #[test]
    fn test_blast_radius_clamped_on_use() {
        let big = ChangeRequest::new(Environment::Dev, "deploy")
            .with_blast_radius(BlastRadius::numeric(50.0));
        let ten = ChangeRequest::new(Environment::Dev, "deploy")
            .with_blast_radius(BlastRadius::numeric(10.0));
        assert_eq!(score(&big, &config()).score, score(&ten, &config()).score);

        let blast = &score(&big, &config()).breakdown[2];
        assert_eq!(blast.severity, 1.0);
        assert_eq!(blast.input_value, json!(50.0));
    }

    #[test]
    fn test_governance_severity_by_gap() {
        let base = ChangeRequest::new(Environment::Dev, "deploy");
        let gov = |r: &ChangeRequest| score(r, &config()).breakdown[4].contribution;

        assert_eq!(gov(&base), 0);
        assert_eq!(gov(&base.clone().missing("backup check")), 13);
        assert_eq!(gov(&base.clone().missing("runbook")), 17);
        assert_eq!(gov(&base.clone().missing("approval")), 24);
    }

    #[test]
    fn test_synergies_only_in_production() {
        let request = ChangeRequest::new(Environment::Staging, "delete")
            .irreversible()
            .with_blast_radius(BlastRadius::numeric(10.0))
            .missing("approval");
        assert!(synergies(&request).is_empty());
    }

    #[test]
    fn test_all_production_synergies() {
        let request = ChangeRequest::new(Environment::Prod, "delete")
            .irreversible()
            .with_blast_radius(BlastRadius::numeric(10.0))
            .missing("approval");
        let ids: Vec<String> = synergies(&request).into_iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec![
                "prod_irreversible",
                "prod_global",
                "prod_destructive",
                "prod_missing_critical_governance",
            ]
        );
    }

    #[test]
    fn test_score_clamped_to_100() {
        let request = ChangeRequest::new(Environment::Prod, "delete")
            .irreversible()
            .with_blast_radius(BlastRadius::numeric(10.0))
            .missing("approval");
        let result = score(&request, &config());
        assert_eq!(result.score, 100);
        assert!(result.raw_score <= 100);
    }

    #[test]
    fn test_huge_weights_saturate_instead_of_overflowing() {
        let mut cfg = config();
        cfg.weights.environment = 5e9;
        cfg.weights.action_category = 5e9;
        let request = ChangeRequest::new(Environment::Prod, "delete")
            .irreversible()
            .with_blast_radius(BlastRadius::numeric(10.0));
        let result = score(&request, &cfg);

        assert_eq!(result.breakdown[0].contribution, 100);
        assert_eq!(result.breakdown[1].contribution, 100);
        assert_eq!(result.raw_score, 100);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_destructive_access_change_gets_both_synergies() {
        let request = ChangeRequest::new(Environment::Prod, "delete iam role")
            .irreversible()
            .with_blast_radius(BlastRadius::numeric(10.0));
        let ids: Vec<String> = synergies(&request).into_iter().map(|s| s.id).collect();
        assert!(ids.contains(&"prod_destructive".to_string()));
        assert!(ids.contains(&"prod_access_control".to_string()));
    }

    #[test]
    fn test_irreversible_never_lower() {
        let reversible = ChangeRequest::new(Environment::Staging, "deploy");
        let irreversible = reversible.clone().irreversible();
        assert!(score(&irreversible, &config()).score >= score(&reversible, &config()).score);
    }

    #[test]
    fn test_environment_reason_tag() {
        let request = ChangeRequest::new(Environment::Prod, "deploy");
        assert_eq!(score(&request, &config()).breakdown[0].reason_tag, "prod_environment");
    }
}
