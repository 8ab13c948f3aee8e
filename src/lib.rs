// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # proactive-agent
//!
//! A tool-using conversational agent that decides for itself whether to act,
//! ask, or wait, and on "act" chains its capabilities into a small research
//! pipeline.
//!
//! ## Architecture
//!
//! - **Capabilities** (`agent::capability`): uniform envelope, name-keyed registry
//! - **Gateway** (`agent::llm`): OpenAI-compatible chat completions over `ureq`
//! - **Decisions** (`agent::decision`): strict or legacy verdict parsing
//! - **Orchestrator** (`agent::orchestrator`): the per-instruction control loop
//! - **Built-ins** (`agent::tools`): eighteen capabilities, one file each
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use proactive_agent::agent::{CompletionGateway, Orchestrator};
//!
//! let gateway: Arc<dyn CompletionGateway> =
//!     Arc::new(|_: &str| r#"{"decision": "ask", "reason": "unclear"}"#.to_string());
//! let agent = Orchestrator::builder(gateway).build();
//! let outcome = agent.handle("Translate hello to French");
//! println!("{}", outcome.headline());
//! ```

pub mod agent;
pub mod config;
pub mod paths;
