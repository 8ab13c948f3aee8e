//! Audit logger exposed as a capability.

use std::sync::Arc;

use crate::agent::audit::AuditSink;
use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

pub struct LoggerTool {
    sink: Arc<dyn AuditSink>,
}

impl LoggerTool {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }
}

impl Capability for LoggerTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "logger".into(),
            description: "Append a line to the agent's audit log.".into(),
            parameters: vec![
                CapabilityParam::required("level", "Level, e.g. info or warn."),
                CapabilityParam::required("message", "Message to record."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Cautious, [Effect::Audit])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let level = input.require_str("level", "logger")?;
        let message = input.require_str("message", "logger")?;
        let record = self.sink.record(level, message)?;
        Ok(CapabilityResult::ok("Logged").with_metadata("line", record.to_line()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::audit::MemoryAuditSink;

    #[test]
    fn writes_through_to_sink() {
        let sink = Arc::new(MemoryAuditSink::new());
        let out = LoggerTool::new(sink.clone())
            .run(
                &CapabilityInput::new()
                    .with_param("level", "warn")
                    .with_param("message", "disk low"),
            )
            .unwrap();
        assert_eq!(out.output_text(), "Logged");
        assert_eq!(sink.records()[0].level, "WARN");
    }
}
