//! Sentiment classifier capability.

use std::sync::Arc;

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::llm::CompletionGateway;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::model_reply;

pub struct SentimentTool {
    gateway: Arc<dyn CompletionGateway>,
}

impl SentimentTool {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { gateway }
    }
}

impl Capability for SentimentTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "sentiment".into(),
            description: "Determine the sentiment of text and explain why.".into(),
            parameters: vec![CapabilityParam::required("text", "Text to classify.")],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Safe, [Effect::ModelCall])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let text = input.require_str("text", "sentiment")?;
        let prompt = format!("Determine sentiment and reason for: {text}");
        Ok(model_reply(self.gateway.as_ref(), &prompt))
    }
}
