//! Translation capability.

use std::sync::Arc;

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::llm::CompletionGateway;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::model_reply;

pub struct TranslateTool {
    gateway: Arc<dyn CompletionGateway>,
}

impl TranslateTool {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { gateway }
    }
}

impl Capability for TranslateTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "translate".into(),
            description: "Translate text into a target language.".into(),
            parameters: vec![
                CapabilityParam::required("text", "Text to translate."),
                CapabilityParam::optional("target_lang", "Target language (default: en)."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Safe, [Effect::ModelCall])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let text = input.require_str("text", "translate")?;
        let target = input.get_str("target_lang").unwrap_or("en");
        let prompt = format!("Translate this to {target}:\n{text}");
        Ok(model_reply(self.gateway.as_ref(), &prompt).with_metadata("target_lang", target))
    }
}
