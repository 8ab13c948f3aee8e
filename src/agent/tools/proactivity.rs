//! Decision classifier exposed as a capability.
//!
//! Runs the shared [`DecisionEngine`] so a direct caller sees the same
//! act/ask/wait verdict the orchestrator would reach.

use std::sync::Arc;

use serde_json::json;

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::decision::DecisionEngine;
use crate::agent::error::AgentResult;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

pub struct ProactivityTool {
    engine: Arc<DecisionEngine>,
}

impl ProactivityTool {
    pub fn new(engine: Arc<DecisionEngine>) -> Self {
        Self { engine }
    }
}

impl Capability for ProactivityTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "proactivity".into(),
            description: "Decide whether to act, ask, or wait given some context.".into(),
            parameters: vec![CapabilityParam::required("context", "Situation to classify.")],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Safe, [Effect::ModelCall])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let context = input.require_str("context", "proactivity")?;
        let decision = self.engine.classify(context);
        Ok(CapabilityResult::ok(json!({
            "decision": decision.verdict,
            "reason": decision.rationale,
        })))
    }
}
