//! Canonical change request
//!
//! The single shape every downstream stage consumes. Built by the
//! normalizer (or the builder methods below) and never mutated afterwards.

use crate::normalizer::normalize_token;
use crate::vocabulary::{ActionClass, BlastScope, GovernanceGap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Target environment of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    Prod,
    /// Missing or unrecognized environment
    #[default]
    Unknown,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" | "local" => Environment::Dev,
            "staging" | "stage" | "stg" | "preprod" => Environment::Staging,
            "prod" | "production" | "prd" => Environment::Prod,
            _ => Environment::Unknown,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Prod)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
            Environment::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the caller expressed the blast radius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlastSource {
    Numeric,
    Categorical,
    Descriptive,
    Missing,
}

/// Unified blast radius on the 0..10 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlastRadius {
    /// Magnitude as supplied (or anchored); clamped only when used
    pub magnitude: f64,
    pub scope: BlastScope,
    pub source: BlastSource,
    /// Original descriptor for categorical and descriptive input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl BlastRadius {
    pub fn numeric(magnitude: f64) -> Self {
        Self {
            magnitude,
            scope: BlastScope::from_magnitude(magnitude),
            source: BlastSource::Numeric,
            label: None,
        }
    }

    /// `low | medium | high`, anchored at 1 / 5 / 10
    pub fn categorical(level: &str) -> Option<Self> {
        let magnitude = match level {
            "low" => 1.0,
            "medium" => 5.0,
            "high" => 10.0,
            _ => return None,
        };
        Some(Self {
            magnitude,
            scope: BlastScope::from_magnitude(magnitude),
            source: BlastSource::Categorical,
            label: Some(level.to_string()),
        })
    }

    pub fn descriptive(descriptor: &str) -> Self {
        let scope = BlastScope::classify(descriptor);
        Self {
            magnitude: scope.anchor(),
            scope,
            source: BlastSource::Descriptive,
            label: Some(descriptor.to_string()),
        }
    }

    pub fn missing() -> Self {
        Self {
            magnitude: BlastScope::Unknown.anchor(),
            scope: BlastScope::Unknown,
            source: BlastSource::Missing,
            label: None,
        }
    }

    /// Magnitude clamped to the 0..10 scale
    pub fn clamped(&self) -> f64 {
        if self.magnitude.is_finite() {
            self.magnitude.clamp(0.0, 10.0)
        } else {
            0.0
        }
    }

    pub fn is_global(&self) -> bool {
        self.scope == BlastScope::Global
    }

    /// No usable signal: absent, or a descriptor we could not place
    pub fn is_unknown(&self) -> bool {
        self.source == BlastSource::Missing || self.scope == BlastScope::Unknown
    }
}

impl Default for BlastRadius {
    fn default() -> Self {
        Self::missing()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetCriticality {
    #[serde(rename = "TIER_0")]
    Tier0,
    #[serde(rename = "TIER_1")]
    Tier1,
    #[serde(rename = "TIER_2")]
    Tier2,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl AssetCriticality {
    pub fn parse(value: &str) -> Self {
        match compact(value).as_str() {
            "tier0" | "t0" => AssetCriticality::Tier0,
            "tier1" | "t1" => AssetCriticality::Tier1,
            "tier2" | "t2" => AssetCriticality::Tier2,
            _ => AssetCriticality::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeWindow {
    BusinessHours,
    OffHours,
    Freeze,
    Unknown,
}

impl ChangeWindow {
    pub fn parse(value: &str) -> Self {
        match compact(value).as_str() {
            "businesshours" | "business" => ChangeWindow::BusinessHours,
            "offhours" | "afterhours" => ChangeWindow::OffHours,
            "freeze" | "changefreeze" => ChangeWindow::Freeze,
            _ => ChangeWindow::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivilegeLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl PrivilegeLevel {
    pub fn parse(value: &str) -> Self {
        match compact(value).as_str() {
            "low" => PrivilegeLevel::Low,
            "medium" | "med" => PrivilegeLevel::Medium,
            "high" => PrivilegeLevel::High,
            _ => PrivilegeLevel::Unknown,
        }
    }
}

/// Lower-case and drop everything that is not alphanumeric ("TIER_0" -> "tier0")
fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A proposed operational change in canonical form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub environment: Environment,
    pub action_category: String,
    pub reversible: bool,
    pub blast_radius: BlastRadius,
    /// Named governance controls that are missing; empty means none
    pub governance_missing: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_criticality: Option<AssetCriticality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_window: Option<ChangeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privilege_level: Option<PrivilegeLevel>,
    /// Caller fields kept for the audit trail; never scored
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Default for ChangeRequest {
    fn default() -> Self {
        Self {
            environment: Environment::Unknown,
            action_category: String::new(),
            reversible: false,
            blast_radius: BlastRadius::missing(),
            governance_missing: BTreeSet::new(),
            asset_criticality: None,
            change_window: None,
            privilege_level: None,
            extra: BTreeMap::new(),
        }
    }
}

impl ChangeRequest {
    /// Reversible change with an unknown blast radius and no governance gaps
    pub fn new(environment: Environment, action_category: impl Into<String>) -> Self {
        Self {
            environment,
            action_category: normalize_token(&action_category.into()),
            reversible: true,
            ..Default::default()
        }
    }

    pub fn irreversible(mut self) -> Self {
        self.reversible = false;
        self
    }

    pub fn with_blast_radius(mut self, blast_radius: BlastRadius) -> Self {
        self.blast_radius = blast_radius;
        self
    }

    pub fn missing(mut self, control: impl Into<String>) -> Self {
        let control = normalize_token(&control.into());
        if !control.is_empty() {
            self.governance_missing.insert(control);
        }
        self
    }

    pub fn with_asset_criticality(mut self, value: AssetCriticality) -> Self {
        self.asset_criticality = Some(value);
        self
    }

    pub fn with_change_window(mut self, value: ChangeWindow) -> Self {
        self.change_window = Some(value);
        self
    }

    pub fn with_privilege_level(mut self, value: PrivilegeLevel) -> Self {
        self.privilege_level = Some(value);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn action_class(&self) -> ActionClass {
        ActionClass::classify(&self.action_category)
    }

    pub fn governance_gap(&self) -> Option<GovernanceGap> {
        GovernanceGap::worst(&self.governance_missing)
    }

    /// Destructive keywords, independent of the scoring bucket
    pub fn is_destructive(&self) -> bool {
        ActionClass::mentions_destructive(&self.action_category)
    }

    /// Access-control keywords, independent of the scoring bucket
    pub fn is_access_control(&self) -> bool {
        ActionClass::mentions_access_control(&self.action_category)
    }

    pub fn missing_critical_governance(&self) -> bool {
        self.governance_gap() == Some(GovernanceGap::Critical)
    }
}
