//! Web search capability.
//!
//! There is no search backend: the model is asked for plausible current
//! results as JSON. Callers should treat the output as unverified.

use std::sync::Arc;

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::llm::CompletionGateway;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::model_reply;

/// Model-simulated web search.
pub struct WebSearchTool {
    gateway: Arc<dyn CompletionGateway>,
    default_top_k: u64,
}

impl WebSearchTool {
    pub fn new(gateway: Arc<dyn CompletionGateway>, default_top_k: u64) -> Self {
        Self {
            gateway,
            default_top_k,
        }
    }
}

impl Capability for WebSearchTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "web_search".into(),
            description: "Return likely current web results for a query as JSON.".into(),
            parameters: vec![
                CapabilityParam::required("query", "Search query."),
                CapabilityParam::optional("top_k", "Number of results (default: 3)."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Safe, [Effect::ModelCall])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let query = input.require_str("query", "web_search")?;
        let top_k = input.get_u64("top_k").unwrap_or(self.default_top_k);
        let prompt = format!(
            "You are a web researcher. Provide {top_k} likely current results for '{query}', \
             formatted as JSON: {{\"results\": [{{\"title\":..., \"snippet\":..., \"url\":...}}]}}"
        );
        Ok(model_reply(self.gateway.as_ref(), &prompt)
            .with_metadata("query", query)
            .with_metadata("top_k", top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_query_and_count() {
        let tool = WebSearchTool::new(Arc::new(|p: &str| p.to_string()), 3);
        let out = tool
            .run(&CapabilityInput::new().with_param("query", "vector databases").with_param("top_k", 5))
            .unwrap();
        assert!(out.succeeded());
        let text = out.output_text();
        assert!(text.contains("Provide 5 likely current results for 'vector databases'"));
        assert_eq!(out.metadata()["top_k"], 5);
    }

    #[test]
    fn missing_query_is_an_error() {
        let tool = WebSearchTool::new(Arc::new(|_: &str| String::new()), 3);
        assert!(tool.run(&CapabilityInput::new()).is_err());
    }
}
