//! URL fetch simulator.
//!
//! Nothing is downloaded. The model describes what the page plausibly holds
//! and lists claims worth verifying.

use std::sync::Arc;

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::llm::CompletionGateway;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::model_reply;

pub struct FetchTool {
    gateway: Arc<dyn CompletionGateway>,
}

impl FetchTool {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self { gateway }
    }
}

impl Capability for FetchTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "fetch".into(),
            description: "Describe a URL's likely title and content (simulated).".into(),
            parameters: vec![CapabilityParam::required("url", "URL to describe.")],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Safe, [Effect::ModelCall])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let url = input.require_str("url", "fetch")?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Ok(CapabilityResult::failure(format!(
                "Invalid URL: \"{url}\". Must start with http:// or https://."
            )));
        }
        let prompt = format!(
            "Pretend you fetched {url}. Provide plausible title, summary, and 3 things to verify."
        );
        Ok(model_reply(self.gateway.as_ref(), &prompt)
            .with_metadata("url", url)
            .with_metadata("simulated", true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_urls() {
        let tool = FetchTool::new(Arc::new(|_: &str| "page".to_string()));
        let out = tool
            .run(&CapabilityInput::new().with_param("url", "file:///etc/passwd"))
            .unwrap();
        assert!(!out.succeeded());
    }

    #[test]
    fn marks_output_as_simulated() {
        let tool = FetchTool::new(Arc::new(|_: &str| "page".to_string()));
        let out = tool
            .run(&CapabilityInput::new().with_param("url", "https://example.com"))
            .unwrap();
        assert!(out.succeeded());
        assert_eq!(out.metadata()["simulated"], true);
    }
}
