//! Policy configuration
//!
//! Versioned weights, severities and thresholds. A config is loaded once at
//! startup (built-in or from YAML), validated, and then only ever read.

use crate::risk::{Factor, RiskLevel};
use north_core::NorthError;
use north_in::{ActionClass, Environment};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete, immutable policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    /// Version stamped on every evaluation (ex: "2026.02")
    pub policy_version: String,

    /// Scoring model identifier
    #[serde(default = "default_risk_model")]
    pub risk_model: String,

    /// Points per factor at full severity
    pub weights: FactorWeights,

    /// Base severity per environment (0..100)
    pub environment_severity: EnvironmentSeverity,

    /// Base severity per action bucket (0..100)
    pub action_severity: ActionSeverity,

    /// Blast radius magnitude (0..10) is multiplied by this...
    pub blast_radius_multiplier: f64,

    /// ...and capped at this (0..100)
    pub blast_radius_max: f64,

    pub penalties: Penalties,

    pub thresholds: Thresholds,

    #[serde(default)]
    pub confidence: ConfidenceBand,

    /// When set, MEDIUM risk never auto-executes in any environment
    #[serde(default = "default_true")]
    pub strict_production: bool,
}

fn default_risk_model() -> String {
    "weighted_v1".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorWeights {
    pub environment: f64,
    pub action_category: f64,
    pub blast_radius: f64,
    pub reversible: f64,
    pub governance_missing: f64,
    #[serde(default)]
    pub asset_criticality: f64,
    #[serde(default)]
    pub change_window: f64,
    #[serde(default)]
    pub privilege_level: f64,
}

impl FactorWeights {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Environment => self.environment,
            Factor::ActionCategory => self.action_category,
            Factor::BlastRadius => self.blast_radius,
            Factor::Reversible => self.reversible,
            Factor::GovernanceMissing => self.governance_missing,
            Factor::AssetCriticality => self.asset_criticality,
            Factor::ChangeWindow => self.change_window,
            Factor::PrivilegeLevel => self.privilege_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSeverity {
    pub dev: f64,
    pub staging: f64,
    pub prod: f64,
    pub unknown: f64,
}

impl EnvironmentSeverity {
    pub fn get(&self, environment: Environment) -> f64 {
        match environment {
            Environment::Dev => self.dev,
            Environment::Staging => self.staging,
            Environment::Prod => self.prod,
            Environment::Unknown => self.unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSeverity {
    pub access_control: f64,
    pub destructive: f64,
    pub network: f64,
    pub infrastructure: f64,
    pub deploy: f64,
    pub restart: f64,
    pub unknown: f64,
}

impl ActionSeverity {
    pub fn get(&self, class: ActionClass) -> f64 {
        match class {
            ActionClass::AccessControl => self.access_control,
            ActionClass::Destructive => self.destructive,
            ActionClass::Network => self.network,
            ActionClass::Infrastructure => self.infrastructure,
            ActionClass::Deploy => self.deploy,
            ActionClass::Restart => self.restart,
            ActionClass::Unknown => self.unknown,
        }
    }
}

/// Severities (0..100) for reversibility and governance gaps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Penalties {
    pub irreversible: f64,
    /// Residual risk of a change that can be rolled back
    pub reversible: f64,
    /// Critical control missing (approval, ticket, CAB, policy)
    pub governance_missing: f64,
    /// Operational control missing (runbook, alerts, rollback readiness)
    pub governance_operational: f64,
    /// Anything else missing
    pub governance_minor: f64,
}

/// Ascending score cut points; a score at or above a cut point reaches that level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Thresholds {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl Thresholds {
    pub fn level_for(&self, score: u32) -> RiskLevel {
        if score >= self.critical {
            RiskLevel::Critical
        } else if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Confidence never reaches 0 or 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub baseline: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for ConfidenceBand {
    fn default() -> Self {
        Self {
            baseline: 0.78,
            min: 0.55,
            max: 0.95,
        }
    }
}

impl PolicyConfig {
    /// Built-in weighted model, weights summing to 100 points
    pub fn weighted_v1() -> Self {
        Self {
            policy_version: "2026.02".to_string(),
            risk_model: default_risk_model(),
            weights: FactorWeights {
                environment: 22.0,
                action_category: 20.0,
                blast_radius: 20.0,
                reversible: 14.0,
                governance_missing: 24.0,
                asset_criticality: 0.0,
                change_window: 0.0,
                privilege_level: 0.0,
            },
            environment_severity: EnvironmentSeverity {
                dev: 15.0,
                staging: 45.0,
                prod: 100.0,
                unknown: 60.0,
            },
            action_severity: ActionSeverity {
                access_control: 100.0,
                destructive: 95.0,
                network: 90.0,
                infrastructure: 80.0,
                deploy: 65.0,
                restart: 35.0,
                unknown: 55.0,
            },
            blast_radius_multiplier: 10.0,
            blast_radius_max: 100.0,
            penalties: Penalties {
                irreversible: 100.0,
                reversible: 20.0,
                governance_missing: 100.0,
                governance_operational: 70.0,
                governance_minor: 55.0,
            },
            thresholds: Thresholds {
                low: 0,
                medium: 35,
                high: 65,
                critical: 85,
            },
            confidence: ConfidenceBand::default(),
            strict_production: true,
        }
    }

    /// Parse and validate a YAML policy
    pub fn from_yaml(yaml: &str) -> Result<Self, NorthError> {
        let config: PolicyConfig =
            serde_yaml::from_str(yaml).map_err(|e| NorthError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML policy file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NorthError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            NorthError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&text)
    }

    pub fn to_yaml(&self) -> Result<String, NorthError> {
        serde_yaml::to_string(self).map_err(|e| NorthError::SerializeError(e.to_string()))
    }

    /// Check the structural invariants of the policy
    pub fn validate(&self) -> Result<(), NorthError> {
        if self.policy_version.trim().is_empty() {
            return Err(invalid("policyVersion must not be empty"));
        }

        for factor in Factor::ALL {
            let weight = self.weights.get(factor);
            if !(0.0..=100.0).contains(&weight) {
                return Err(invalid(format!("weight for {} must be within 0..100, got {}", factor, weight)));
            }
        }

        let severities = [
            ("environmentSeverity.dev", self.environment_severity.dev),
            ("environmentSeverity.staging", self.environment_severity.staging),
            ("environmentSeverity.prod", self.environment_severity.prod),
            ("environmentSeverity.unknown", self.environment_severity.unknown),
            ("actionSeverity.accessControl", self.action_severity.access_control),
            ("actionSeverity.destructive", self.action_severity.destructive),
            ("actionSeverity.network", self.action_severity.network),
            ("actionSeverity.infrastructure", self.action_severity.infrastructure),
            ("actionSeverity.deploy", self.action_severity.deploy),
            ("actionSeverity.restart", self.action_severity.restart),
            ("actionSeverity.unknown", self.action_severity.unknown),
            ("blastRadiusMax", self.blast_radius_max),
            ("penalties.irreversible", self.penalties.irreversible),
            ("penalties.reversible", self.penalties.reversible),
            ("penalties.governanceMissing", self.penalties.governance_missing),
            ("penalties.governanceOperational", self.penalties.governance_operational),
            ("penalties.governanceMinor", self.penalties.governance_minor),
        ];
        for (name, value) in severities {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(format!("{} must be within 0..100, got {}", name, value)));
            }
        }

        if !self.blast_radius_multiplier.is_finite() || self.blast_radius_multiplier < 0.0 {
            return Err(invalid("blastRadiusMultiplier must be a non-negative number"));
        }

        // Irreversible must never score below reversible
        if self.penalties.reversible > self.penalties.irreversible {
            return Err(invalid("penalties.reversible must not exceed penalties.irreversible"));
        }

        let t = &self.thresholds;
        if !(t.low < t.medium && t.medium < t.high && t.high < t.critical) {
            return Err(invalid("thresholds must be strictly ascending LOW < MEDIUM < HIGH < CRITICAL"));
        }
        if t.critical > 100 {
            return Err(invalid("thresholds must lie within 0..100"));
        }

        let c = &self.confidence;
        let ordered = 0.0 < c.min && c.min <= c.baseline && c.baseline <= c.max && c.max < 1.0;
        if !ordered {
            return Err(invalid("confidence band must satisfy 0 < min <= baseline <= max < 1"));
        }

        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::weighted_v1()
    }
}

fn invalid(message: impl Into<String>) -> NorthError {
    NorthError::ConfigError(message.into())
}
