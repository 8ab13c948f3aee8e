//! Agent layer: capabilities, the model gateway, and the proactive loop.
//!
//! - **Capabilities** (trait objects in a name-keyed registry, total dispatch)
//! - **Completion gateway** (the only path to the language model)
//! - **Decision engine** (act / ask / wait classification)
//! - **Orchestrator** (plan, search, summarize, note on act; proposal otherwise)
//! - **Audit sink** (append-only record of every decision)

pub mod audit;
pub mod capability;
pub mod decision;
pub mod error;
pub mod llm;
pub mod manifest;
pub mod orchestrator;
pub mod tools;

pub use audit::{AuditRecord, AuditSink, FileAuditSink, MemoryAuditSink};
pub use capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityRegistry, CapabilityResult,
    CapabilitySignature,
};
pub use decision::{Decision, DecisionEngine, Verdict, VerdictParsing};
pub use error::{AgentError, AgentResult};
pub use llm::{ChatClient, ChatConfig, CompletionGateway, LlmError, is_error_sentinel};
pub use manifest::{DangerLevel, Effect, Safety};
pub use orchestrator::{AgentOutcome, Orchestrator, OrchestratorBuilder};
