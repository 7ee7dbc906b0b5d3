//! Guardrails
//!
//! Hard rules that escalate a decision regardless of the numeric score.
//! Every rule is evaluated; hits come back in rule order.

use north_in::ChangeRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a guardrail forces when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardrailEffect {
    RequireApproval,
    Block,
}

impl fmt::Display for GuardrailEffect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GuardrailEffect::RequireApproval => write!(f, "REQUIRE_APPROVAL"),
            GuardrailEffect::Block => write!(f, "BLOCK"),
        }
    }
}

/// A guardrail that fired for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailHit {
    pub id: String,
    pub effect: GuardrailEffect,
    pub rationale: String,
}

/// A single guardrail rule
#[derive(Clone, Copy)]
pub struct Guardrail {
    pub id: &'static str,
    pub effect: GuardrailEffect,
    pub rationale: &'static str,
    applies: fn(&ChangeRequest) -> bool,
}

impl Guardrail {
    pub fn check(&self, request: &ChangeRequest) -> Option<GuardrailHit> {
        (self.applies)(request).then(|| GuardrailHit {
            id: self.id.to_string(),
            effect: self.effect,
            rationale: self.rationale.to_string(),
        })
    }
}

const GUARDRAILS: [Guardrail; 3] = [
    Guardrail {
        id: "GR_PROD_MISSING_CRITICAL_GOV",
        effect: GuardrailEffect::RequireApproval,
        rationale: "production change is missing critical governance controls",
        applies: |r| r.environment.is_production() && r.missing_critical_governance(),
    },
    Guardrail {
        id: "GR_PROD_ACCESS_CONTROL",
        effect: GuardrailEffect::RequireApproval,
        rationale: "production access control changes always need a human",
        applies: |r| r.environment.is_production() && r.is_access_control(),
    },
    Guardrail {
        id: "GR_PROD_DESTRUCTIVE_GLOBAL_IRREV",
        effect: GuardrailEffect::Block,
        rationale: "irreversible destructive change with global blast radius in production",
        applies: |r| {
            r.environment.is_production()
                && r.is_destructive()
                && r.blast_radius.is_global()
                && !r.reversible
        },
    },
];

/// The built-in guardrail set, in evaluation order
pub fn guardrails() -> &'static [Guardrail] {
    &GUARDRAILS
}

/// Evaluate every guardrail against a request
pub fn evaluate_guardrails(request: &ChangeRequest) -> Vec<GuardrailHit> {
    GUARDRAILS.iter().filter_map(|g| g.check(request)).collect()
}
