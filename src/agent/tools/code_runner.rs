//! Sandboxed code runner behind an explicit opt-in.
//!
//! Code only runs when the call passes `execute=true`; otherwise the
//! capability reports what it would have run. Execution uses a separate
//! interpreter process (`python3 -I` by default) with a cleared environment,
//! the scratch directory as working directory, closed stdin, and a timeout.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde_json::json;

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::process::run_with_timeout;
use super::truncate;

/// Maximum code size accepted.
const MAX_CODE_BYTES: usize = 32 * 1024;

pub struct CodeRunnerTool {
    interpreter: String,
    workdir: Option<PathBuf>,
    timeout_secs: u64,
}

impl CodeRunnerTool {
    pub fn new(interpreter: impl Into<String>, workdir: Option<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            interpreter: interpreter.into(),
            workdir,
            timeout_secs,
        }
    }

    fn command(&self, code: &str) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        // -I: isolated mode, ignores PYTHON* env vars and user site-packages.
        cmd.arg("-I").arg("-c").arg(code).env_clear();
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Capability for CodeRunnerTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "code_runner".into(),
            description: "Run a Python snippet in an isolated interpreter. Requires execute=true."
                .into(),
            parameters: vec![
                CapabilityParam::required("code", "Source code to run."),
                CapabilityParam::optional("execute", "Set to true to actually run (default: false)."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Critical, [Effect::ProcessExec]).with_opt_in("execute=true")
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let code = input.require_str("code", "code_runner")?;
        if code.len() > MAX_CODE_BYTES {
            return Ok(CapabilityResult::failure(format!(
                "Code too large: {} bytes (max {MAX_CODE_BYTES}).",
                code.len()
            )));
        }

        if !input.get_bool("execute").unwrap_or(false) {
            return Ok(CapabilityResult::ok(format!(
                "Not executed (pass execute=true to run): {}",
                truncate(code, 200)
            ))
            .with_metadata("executed", false));
        }

        if let Some(dir) = &self.workdir {
            if let Err(e) = std::fs::create_dir_all(dir) {
                return Ok(CapabilityResult::failure(format!(
                    "Failed to prepare working directory \"{}\": {e}",
                    dir.display()
                )));
            }
        }

        tracing::warn!(interpreter = %self.interpreter, code_len = code.len(), "executing code");

        Ok(
            match run_with_timeout(self.command(code), Duration::from_secs(self.timeout_secs)) {
                Ok(out) if out.status.success() => CapabilityResult::ok(json!({
                    "stdout": out.stdout,
                    "stderr": out.stderr,
                    "exit_code": out.exit_code(),
                }))
                .with_metadata("executed", true),
                Ok(out) => CapabilityResult::failure(if out.stderr.trim().is_empty() {
                    format!("Code exited with {}", out.exit_code())
                } else {
                    out.stderr.trim().to_string()
                })
                .with_metadata("executed", true)
                .with_metadata("exit_code", out.exit_code()),
                Err(failure) => CapabilityResult::failure(format!(
                    "{} {failure}",
                    self.interpreter
                ))
                .with_metadata("executed", false),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn does_not_execute_without_opt_in() {
        let tool = CodeRunnerTool::new("python3", None, 5);
        let out = tool
            .run(&CapabilityInput::new().with_param("code", "print(1)"))
            .unwrap();
        assert!(out.succeeded());
        assert_eq!(out.metadata()["executed"], false);
        assert!(out.output_text().starts_with("Not executed"));
    }

    #[test]
    fn missing_interpreter_is_a_failure() {
        let tool = CodeRunnerTool::new("definitely-not-an-interpreter-xyz", None, 5);
        let out = tool
            .run(
                &CapabilityInput::new()
                    .with_param("code", "print(1)")
                    .with_param("execute", true),
            )
            .unwrap();
        assert!(!out.succeeded());
        assert!(out.output_text().contains("failed to spawn"));
    }

    #[test]
    fn declares_opt_in() {
        let safety = CodeRunnerTool::new("python3", None, 5).safety();
        assert!(safety.requires_opt_in());
        assert_eq!(safety.level, DangerLevel::Critical);
    }
}
