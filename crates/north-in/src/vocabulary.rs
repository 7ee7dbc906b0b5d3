//! Impact vocabulary
//!
//! Keyword tables that turn free-form operator text into the buckets the
//! scorer and the guardrails reason about. Matching is case-insensitive and
//! expects already-normalized (lower-cased) input.

use serde::{Deserialize, Serialize};
use std::fmt;

const ACCESS_CONTROL: &[&str] = &["iam", "permission", "role", "rbac", "policy", "grant", "revoke"];
const DESTRUCTIVE: &[&str] = &["delete", "drop", "destroy", "purge", "truncate"];
const NETWORK: &[&str] = &["network", "firewall", "security group", "nsg", "route", "dns"];
const INFRASTRUCTURE: &[&str] = &["infra", "terraform", "bicep", "arm", "k8s", "cluster"];
const DEPLOY: &[&str] = &["deploy", "release", "rollout"];
const RESTART: &[&str] = &["restart", "reboot", "roll", "cycle"];

const SCOPE_GLOBAL: &[&str] = &["global", "org", "all", "tenant", "entire", "world"];
const SCOPE_MULTI: &[&str] = &["multi", "cluster", "platform", "shared", "fleet"];
const SCOPE_REGIONAL: &[&str] = &["region", "zone"];
const SCOPE_SERVICE: &[&str] = &["service", "app"];
const SCOPE_SINGLE: &[&str] = &["single", "one", "node", "instance"];

const GOVERNANCE_CRITICAL: &[&str] = &["approval", "ticket", "cab", "policy"];
const GOVERNANCE_OPERATIONAL: &[&str] = &["runbook", "alert", "monitor", "rollback", "owner", "slo"];

/// True if `haystack` contains any of the needles
pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Substring match for scope descriptors. "all" only counts when it is not
/// part of "small".
fn scope_mentions(descriptor: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| {
        if *n == "all" {
            descriptor.replace("small", "").contains(n)
        } else {
            descriptor.contains(n)
        }
    })
}

/// Action bucket derived from a free-form action category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    AccessControl,
    Destructive,
    Network,
    Infrastructure,
    Deploy,
    Restart,
    Unknown,
}

impl ActionClass {
    /// Classify by substring, most dangerous bucket first
    pub fn classify(action: &str) -> Self {
        let table: [(&[&str], ActionClass); 6] = [
            (ACCESS_CONTROL, ActionClass::AccessControl),
            (DESTRUCTIVE, ActionClass::Destructive),
            (NETWORK, ActionClass::Network),
            (INFRASTRUCTURE, ActionClass::Infrastructure),
            (DEPLOY, ActionClass::Deploy),
            (RESTART, ActionClass::Restart),
        ];

        table
            .iter()
            .find(|(needles, _)| contains_any(action, needles))
            .map(|(_, class)| *class)
            .unwrap_or(ActionClass::Unknown)
    }

    /// Any destructive keyword, whatever bucket the action scores in
    pub fn mentions_destructive(action: &str) -> bool {
        contains_any(action, DESTRUCTIVE)
    }

    /// Any access-control keyword, whatever bucket the action scores in
    pub fn mentions_access_control(action: &str) -> bool {
        contains_any(action, ACCESS_CONTROL)
    }

    pub fn reason_tag(&self) -> &'static str {
        match self {
            ActionClass::AccessControl => "access_control_change",
            ActionClass::Destructive => "destructive_action",
            ActionClass::Network => "network_security_change",
            ActionClass::Infrastructure => "infrastructure_change",
            ActionClass::Deploy => "deploy_action",
            ActionClass::Restart => "restart_action",
            ActionClass::Unknown => "unknown_action_type",
        }
    }

    pub fn rationale(&self) -> &'static str {
        match self {
            ActionClass::AccessControl => "access control changes are high impact",
            ActionClass::Destructive => "destructive actions are high risk",
            ActionClass::Network => "network/security changes can cause broad outages",
            ActionClass::Infrastructure => "infrastructure changes carry systemic risk",
            ActionClass::Deploy => "deployments can introduce regressions",
            ActionClass::Restart => "restart is usually recoverable but can cause downtime",
            ActionClass::Unknown => "unknown action type defaults to moderate risk",
        }
    }
}

impl fmt::Display for ActionClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ActionClass::AccessControl => "access_control",
            ActionClass::Destructive => "destructive",
            ActionClass::Network => "network",
            ActionClass::Infrastructure => "infrastructure",
            ActionClass::Deploy => "deploy",
            ActionClass::Restart => "restart",
            ActionClass::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Impact scope of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlastScope {
    Single,
    Service,
    Regional,
    MultiService,
    Global,
    Unknown,
}

impl BlastScope {
    /// Classify a descriptive string ("tenant-wide", "single node", ...)
    pub fn classify(descriptor: &str) -> Self {
        let table: [(&[&str], BlastScope); 5] = [
            (SCOPE_GLOBAL, BlastScope::Global),
            (SCOPE_MULTI, BlastScope::MultiService),
            (SCOPE_REGIONAL, BlastScope::Regional),
            (SCOPE_SERVICE, BlastScope::Service),
            (SCOPE_SINGLE, BlastScope::Single),
        ];

        table
            .iter()
            .find(|(needles, _)| scope_mentions(descriptor, needles))
            .map(|(_, scope)| *scope)
            .unwrap_or(BlastScope::Unknown)
    }

    /// Scope implied by a magnitude on the 0..10 scale
    pub fn from_magnitude(magnitude: f64) -> Self {
        let m = if magnitude.is_finite() { magnitude.clamp(0.0, 10.0) } else { 0.0 };
        if m >= 10.0 {
            BlastScope::Global
        } else if m >= 8.0 {
            BlastScope::MultiService
        } else if m >= 7.0 {
            BlastScope::Regional
        } else if m >= 5.0 {
            BlastScope::Service
        } else {
            BlastScope::Single
        }
    }

    /// Representative magnitude used when the caller only described the scope
    pub fn anchor(&self) -> f64 {
        match self {
            BlastScope::Global => 10.0,
            BlastScope::MultiService => 8.0,
            BlastScope::Regional => 7.0,
            BlastScope::Unknown => 6.0,
            BlastScope::Service => 5.0,
            BlastScope::Single => 3.0,
        }
    }

    pub fn reason_tag(&self) -> &'static str {
        match self {
            BlastScope::Global => "global_impact",
            BlastScope::MultiService => "multi_service_impact",
            BlastScope::Regional => "regional_impact",
            BlastScope::Service => "service_level_impact",
            BlastScope::Single => "single_instance_impact",
            BlastScope::Unknown => "unknown_blast_radius",
        }
    }

    pub fn rationale(&self) -> &'static str {
        match self {
            BlastScope::Global => "global impact affects many services/users",
            BlastScope::MultiService => "multi-service/platform impact is high",
            BlastScope::Regional => "regional impact is significant",
            BlastScope::Service => "service-level impact is moderate",
            BlastScope::Single => "single instance impact is lower",
            BlastScope::Unknown => "unknown blast radius defaults to moderate-high",
        }
    }
}

/// Worst kind of governance control missing from a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceGap {
    Minor,
    Operational,
    Critical,
}

impl GovernanceGap {
    /// Classify a single missing control
    pub fn classify(control: &str) -> Self {
        if contains_any(control, GOVERNANCE_CRITICAL) {
            GovernanceGap::Critical
        } else if contains_any(control, GOVERNANCE_OPERATIONAL) {
            GovernanceGap::Operational
        } else {
            GovernanceGap::Minor
        }
    }

    /// Worst gap across all missing controls, `None` when nothing is missing
    pub fn worst<'a>(controls: impl IntoIterator<Item = &'a String>) -> Option<Self> {
        controls.into_iter().map(|c| Self::classify(c)).max()
    }

    pub fn rationale(&self) -> &'static str {
        match self {
            GovernanceGap::Critical => "missing critical governance (approval/ticket/policy)",
            GovernanceGap::Operational => {
                "missing operational governance (runbook/alerts/rollback readiness)"
            }
            GovernanceGap::Minor => "governance gaps detected",
        }
    }
}
