//! Deferred-task simulator.
//!
//! Blocks for at most one second regardless of the requested delay, then
//! reports the task as executed.

use std::time::Duration;

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;

/// Upper bound on the simulated wait.
const MAX_SLEEP: Duration = Duration::from_secs(1);

pub struct SchedulerTool;

impl Capability for SchedulerTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "scheduler".into(),
            description: "Simulate running a named task after a delay (waits at most 1s).".into(),
            parameters: vec![
                CapabilityParam::required("task_name", "Task identifier."),
                CapabilityParam::optional("run_after_seconds", "Requested delay (default: 1)."),
            ],
        }
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let task_name = input.require_str("task_name", "scheduler")?;
        let delay = input.get_u64("run_after_seconds").unwrap_or(1);

        std::thread::sleep(Duration::from_secs(delay).min(MAX_SLEEP));

        Ok(CapabilityResult::ok(format!(
            "Executed '{task_name}' after {delay}s (simulated)"
        ))
        .with_metadata("simulated", true))
    }
}
