//! Email notification simulator. Nothing is sent; the message is logged.

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

pub struct EmailTool;

impl Capability for EmailTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "email".into(),
            description: "Simulate sending an email (logged, not delivered).".into(),
            parameters: vec![
                CapabilityParam::required("to", "Recipient address."),
                CapabilityParam::required("subject", "Subject line."),
                CapabilityParam::required("body", "Message body."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Cautious, [Effect::Notification])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let to = input.require_str("to", "email")?;
        let subject = input.require_str("subject", "email")?;
        let body = input.require_str("body", "email")?;

        if !to.contains('@') {
            return Ok(CapabilityResult::failure(format!(
                "Invalid recipient \"{to}\": expected an email address."
            )));
        }

        tracing::info!(%to, %subject, body_len = body.len(), "email simulation");
        Ok(CapabilityResult::ok("Email simulated")
            .with_metadata("to", to)
            .with_metadata("subject", subject))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(to: &str) -> CapabilityInput {
        CapabilityInput::new()
            .with_param("to", to)
            .with_param("subject", "Hi")
            .with_param("body", "Hello there")
    }

    #[test]
    fn simulates_delivery() {
        let out = EmailTool.run(&input("a@example.com")).unwrap();
        assert!(out.succeeded());
        assert_eq!(out.output_text(), "Email simulated");
    }

    #[test]
    fn rejects_bad_recipient() {
        assert!(!EmailTool.run(&input("nobody")).unwrap().succeeded());
    }
}
