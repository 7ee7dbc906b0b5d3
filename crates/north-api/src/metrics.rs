//! Live prometheus counters for `/metrics`
use north_policy::PolicyEvaluation;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub struct DecisionCounters {
    registry: Registry,
    decisions: IntCounterVec,
    guardrail_hits: IntCounterVec,
}

impl DecisionCounters {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let decisions = IntCounterVec::new(
            Opts::new("north_decisions_total", "Policy decisions by outcome and risk level"),
            &["decision", "risk_level"],
        )?;
        let guardrail_hits = IntCounterVec::new(
            Opts::new("north_guardrail_hits_total", "Guardrail hits by guardrail id"),
            &["guardrail"],
        )?;

        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(guardrail_hits.clone()))?;

        Ok(Self {
            registry,
            decisions,
            guardrail_hits,
        })
    }

    pub fn observe(&self, evaluation: &PolicyEvaluation) {
        self.decisions
            .with_label_values(&[evaluation.decision.as_str(), evaluation.risk_level.as_str()])
            .inc();
        for hit in &evaluation.guardrail_hits {
            self.guardrail_hits.with_label_values(&[hit.id.as_str()]).inc();
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use north_policy::PolicyEngine;
    use serde_json::json;

    #[test]
    fn test_counts_decisions_and_guardrails() {
        let counters = DecisionCounters::new().unwrap();
        let (_, evaluation) = PolicyEngine::builtin().evaluate_raw(&json!({
            "env": "prod",
            "action": "grant-role",
            "reversible": true,
            "blastRadius": 3
        }));
        counters.observe(&evaluation);
        counters.observe(&evaluation);

        let text = encode(counters.registry()).unwrap();
        assert!(text.contains(r#"north_decisions_total{decision="APPROVAL",risk_level="MEDIUM"} 2"#));
        assert!(text.contains(r#"north_guardrail_hits_total{guardrail="GR_PROD_ACCESS_CONTROL"} 2"#));
    }
}
