//! Research plan generator.

use std::sync::Arc;

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::llm::CompletionGateway;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::model_reply;

/// Ask the model for an N-step research plan on a topic.
pub struct ResearchPlanTool {
    gateway: Arc<dyn CompletionGateway>,
    default_depth: u64,
}

impl ResearchPlanTool {
    pub fn new(gateway: Arc<dyn CompletionGateway>, default_depth: u64) -> Self {
        Self {
            gateway,
            default_depth,
        }
    }
}

impl Capability for ResearchPlanTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "research_plan".into(),
            description: "Create a step-by-step research plan for a topic.".into(),
            parameters: vec![
                CapabilityParam::required("topic", "Topic to research."),
                CapabilityParam::optional("depth", "Number of steps (default: 3)."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Safe, [Effect::ModelCall])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let topic = input.require_str("topic", "research_plan")?;
        let depth = input
            .get_u64("depth")
            .filter(|d| *d > 0)
            .unwrap_or(self.default_depth);
        let prompt = format!("Create a {depth}-step research plan for: {topic}");
        Ok(model_reply(self.gateway.as_ref(), &prompt).with_metadata("depth", depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_depth_falls_back_to_default() {
        let tool = ResearchPlanTool::new(Arc::new(|p: &str| p.to_string()), 3);
        let out = tool
            .run(&CapabilityInput::new().with_param("topic", "rust").with_param("depth", 0))
            .unwrap();
        assert_eq!(out.output_text(), "Create a 3-step research plan for: rust");
    }
}
