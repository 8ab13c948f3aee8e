//! Agent-specific error types with rich miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised inside the agent layer.
///
/// None of these cross the dispatch boundary: [`CapabilityRegistry::dispatch`]
/// folds them into failed envelopes, and the orchestrator downgrades audit
/// failures to warnings.
///
/// [`CapabilityRegistry::dispatch`]: super::capability::CapabilityRegistry::dispatch
#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    #[error("unknown capability: {name}")]
    #[diagnostic(
        code(agent::capability::not_found),
        help("Register the capability first or list available ones with `proact tools`.")
    )]
    CapabilityNotFound { name: String },

    #[error("{message}")]
    #[diagnostic(
        code(agent::capability::execution),
        help("The capability `{capability}` could not complete. Check its parameters.")
    )]
    CapabilityExecution { capability: String, message: String },

    #[error("audit log write failed: {path}")]
    #[diagnostic(
        code(agent::audit::write),
        help("Ensure the audit log directory exists and is writable. The agent keeps running.")
    )]
    AuditWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Llm(#[from] super::llm::LlmError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] crate::paths::PathError),
}

impl AgentError {
    /// Shorthand for a capability-local failure.
    pub fn execution(capability: &str, message: impl Into<String>) -> Self {
        Self::CapabilityExecution {
            capability: capability.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for agent operations.
pub type AgentResult<T> = std::result::Result<T, AgentError>;
