//! Text summarizer capability.

use std::sync::Arc;

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::llm::CompletionGateway;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::model_reply;

/// Summarize text in a bounded number of sentences.
pub struct SummarizerTool {
    gateway: Arc<dyn CompletionGateway>,
    default_sentences: u64,
}

impl SummarizerTool {
    pub fn new(gateway: Arc<dyn CompletionGateway>, default_sentences: u64) -> Self {
        Self {
            gateway,
            default_sentences,
        }
    }
}

impl Capability for SummarizerTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "summarizer".into(),
            description: "Summarize text in a few sentences.".into(),
            parameters: vec![
                CapabilityParam::required("text", "Text to summarize."),
                CapabilityParam::optional("max_sentences", "Sentence budget (default: 4)."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Safe, [Effect::ModelCall])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let text = input.require_str("text", "summarizer")?;
        let max_sentences = input
            .get_u64("max_sentences")
            .unwrap_or(self.default_sentences);
        let prompt = format!("Summarize in {max_sentences} sentences:\n{text}");
        Ok(model_reply(self.gateway.as_ref(), &prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_default_sentence_budget() {
        let tool = SummarizerTool::new(Arc::new(|p: &str| p.to_string()), 4);
        let out = tool
            .run(&CapabilityInput::new().with_param("text", "long text"))
            .unwrap();
        assert_eq!(out.output_text(), "Summarize in 4 sentences:\nlong text");
    }
}
