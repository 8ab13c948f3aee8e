//! Terminal capability: shell commands behind an explicit opt-in.
//!
//! `dry_run` defaults to true, in which case the command is only echoed
//! back. Passing `dry_run=false` executes it via `/bin/sh -c` with a timeout
//! and an output cap. There is no sandbox beyond that.

use std::process::Command;
use std::time::Duration;

use serde_json::json;

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::process::run_with_timeout;

pub struct TerminalTool {
    default_timeout_secs: u64,
}

impl TerminalTool {
    pub fn new(default_timeout_secs: u64) -> Self {
        Self {
            default_timeout_secs,
        }
    }
}

impl Capability for TerminalTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "terminal".into(),
            description: "Run a shell command. Dry-run unless dry_run=false is passed.".into(),
            parameters: vec![
                CapabilityParam::required("command", "Shell command."),
                CapabilityParam::optional("dry_run", "Set to false to actually execute (default: true)."),
                CapabilityParam::optional("timeout", "Timeout in seconds (default: 30)."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Critical, [Effect::ProcessExec]).with_opt_in("dry_run=false")
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let command = input.require_str("command", "terminal")?;
        let dry_run = input.get_bool("dry_run").unwrap_or(true);

        if dry_run {
            return Ok(
                CapabilityResult::ok(format!("Dry-run: would execute '{command}'"))
                    .with_metadata("dry_run", true),
            );
        }

        let timeout_secs = input.get_u64("timeout").unwrap_or(self.default_timeout_secs);
        tracing::warn!(%command, "executing shell command");

        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command);

        Ok(match run_with_timeout(cmd, Duration::from_secs(timeout_secs)) {
            Ok(out) => {
                let exit_code = out.exit_code();
                let envelope = if out.status.success() {
                    CapabilityResult::ok(out.stdout.clone())
                } else {
                    CapabilityResult::failure(format!(
                        "Command exited with {exit_code}: {}",
                        if out.stderr.is_empty() { &out.stdout } else { &out.stderr }
                    ))
                };
                envelope
                    .with_metadata("dry_run", false)
                    .with_metadata("exit_code", exit_code)
                    .with_metadata("stderr", json!(out.stderr))
            }
            Err(failure) => CapabilityResult::failure(format!("Command '{command}' {failure}")),
        })
    }
}
