//! Agent configuration, persisted as TOML.
//!
//! Every field has a default, so a missing file or a partial file both work.
//! The API key itself never lives here: `[model].api_key_env` names the
//! environment variable that holds it.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::decision::VerdictParsing;
use crate::agent::llm::ChatConfig;
use crate::paths::AgentPaths;

/// Errors from loading or rendering configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(agent::config::read),
        help("Ensure the config file is readable, or remove it to use defaults.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(agent::config::parse),
        help("Check the TOML syntax. Run `proact config` to print a valid default file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to render config: {message}")]
    #[diagnostic(code(agent::config::render))]
    Render { message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Orchestrator behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviourConfig {
    /// Preamble for free-form proposals on the ask/wait branch.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// How decision replies are parsed.
    #[serde(default)]
    pub verdict_parsing: VerdictParsing,
}

fn default_system_prompt() -> String {
    "You are a proactive AI agent. Take initiative when safe, ask if unsure, and log actions."
        .into()
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            verdict_parsing: VerdictParsing::default(),
        }
    }
}

/// Where capability state and the audit log live. Unset means XDG default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kv_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

/// Capability tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_search_top_k")]
    pub search_top_k: u64,
    #[serde(default = "default_summary_sentences")]
    pub summary_sentences: u64,
    #[serde(default = "default_plan_depth")]
    pub plan_depth: u64,
    #[serde(default = "default_terminal_timeout_secs")]
    pub terminal_timeout_secs: u64,
    #[serde(default = "default_code_timeout_secs")]
    pub code_timeout_secs: u64,
    /// Interpreter used by `code_runner`.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
}

fn default_search_top_k() -> u64 {
    3
}
fn default_summary_sentences() -> u64 {
    4
}
fn default_plan_depth() -> u64 {
    3
}
fn default_terminal_timeout_secs() -> u64 {
    30
}
fn default_code_timeout_secs() -> u64 {
    10
}
fn default_interpreter() -> String {
    "python3".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            search_top_k: default_search_top_k(),
            summary_sentences: default_summary_sentences(),
            plan_depth: default_plan_depth(),
            terminal_timeout_secs: default_terminal_timeout_secs(),
            code_timeout_secs: default_code_timeout_secs(),
            interpreter: default_interpreter(),
        }
    }
}

/// Top-level settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub model: ChatConfig,
    #[serde(default)]
    pub agent: BehaviourConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl AgentSettings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Load settings, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Render as pretty TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Render {
            message: e.to_string(),
        })
    }

    /// Resolved key-value store path.
    pub fn kv_path(&self, paths: &AgentPaths) -> PathBuf {
        self.storage
            .kv_path
            .clone()
            .unwrap_or_else(|| paths.kv_store_file())
    }

    /// Resolved audit log path.
    pub fn audit_log(&self, paths: &AgentPaths) -> PathBuf {
        self.storage
            .audit_log
            .clone()
            .unwrap_or_else(|| paths.audit_log_file())
    }

    /// Resolved scratch directory.
    pub fn scratch_dir(&self, paths: &AgentPaths) -> PathBuf {
        self.storage
            .scratch_dir
            .clone()
            .unwrap_or_else(|| paths.scratch_dir())
    }
}
