//! Built-in capabilities: search, calculator, filesystem, email, terminal,
//! calendar, notes, summarizer, fetch, code runner, image placeholder,
//! key-value db, scheduler, translate, sentiment, research plan,
//! proactivity, and logger.

pub mod calculator;
pub mod calendar;
pub mod code_runner;
pub mod email;
pub mod fetch;
pub mod file_io;
pub mod image_gen;
pub mod kv_store;
pub mod logger;
pub mod notes;
mod process;
pub mod proactivity;
pub mod research_plan;
pub mod scheduler;
pub mod sentiment;
pub mod summarizer;
pub mod terminal;
pub mod translate;
pub mod web_search;

pub use calculator::CalculatorTool;
pub use calendar::CalendarTool;
pub use code_runner::CodeRunnerTool;
pub use email::EmailTool;
pub use fetch::FetchTool;
pub use file_io::FileIoTool;
pub use image_gen::ImageGenTool;
pub use kv_store::KvStoreTool;
pub use logger::LoggerTool;
pub use notes::NotesTool;
pub use proactivity::ProactivityTool;
pub use research_plan::ResearchPlanTool;
pub use scheduler::SchedulerTool;
pub use sentiment::SentimentTool;
pub use summarizer::SummarizerTool;
pub use terminal::TerminalTool;
pub use translate::TranslateTool;
pub use web_search::WebSearchTool;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ToolsConfig;

use super::audit::AuditSink;
use super::capability::{CapabilityRegistry, CapabilityResult};
use super::decision::DecisionEngine;
use super::llm::{CompletionGateway, is_error_sentinel};

/// Shared collaborators handed to the built-in capabilities at start-up.
#[derive(Clone)]
pub struct BuiltinDeps {
    pub gateway: Arc<dyn CompletionGateway>,
    pub decision: Arc<DecisionEngine>,
    pub audit: Arc<dyn AuditSink>,
    pub tools: ToolsConfig,
    pub kv_path: PathBuf,
    pub scratch_dir: Option<PathBuf>,
}

/// Register all eighteen built-in capabilities, plus the `python_runner`
/// alias for `code_runner`.
pub fn register_builtins(registry: &mut CapabilityRegistry, deps: &BuiltinDeps) {
    let g = &deps.gateway;
    let cfg = &deps.tools;

    registry.register(Box::new(WebSearchTool::new(g.clone(), cfg.search_top_k)));
    registry.register(Box::new(CalculatorTool));
    registry.register(Box::new(FileIoTool::new(deps.scratch_dir.clone())));
    registry.register(Box::new(EmailTool));
    registry.register(Box::new(TerminalTool::new(cfg.terminal_timeout_secs)));
    registry.register(Box::new(CalendarTool::new()));
    registry.register(Box::new(NotesTool::new()));
    registry.register(Box::new(SummarizerTool::new(g.clone(), cfg.summary_sentences)));
    registry.register(Box::new(FetchTool::new(g.clone())));
    registry.register(Box::new(CodeRunnerTool::new(
        cfg.interpreter.clone(),
        deps.scratch_dir.clone(),
        cfg.code_timeout_secs,
    )));
    registry.register(Box::new(ImageGenTool));
    registry.register(Box::new(KvStoreTool::new(deps.kv_path.clone())));
    registry.register(Box::new(SchedulerTool));
    registry.register(Box::new(TranslateTool::new(g.clone())));
    registry.register(Box::new(SentimentTool::new(g.clone())));
    registry.register(Box::new(ResearchPlanTool::new(g.clone(), cfg.plan_depth)));
    registry.register(Box::new(ProactivityTool::new(deps.decision.clone())));
    registry.register(Box::new(LoggerTool::new(deps.audit.clone())));

    registry.alias("python_runner", "code_runner");
}

/// Send `prompt` through the gateway and wrap the reply.
///
/// An error sentinel becomes a failed envelope.
pub(crate) fn model_reply(gateway: &dyn CompletionGateway, prompt: &str) -> CapabilityResult {
    let reply = gateway.complete(prompt);
    if is_error_sentinel(&reply) {
        CapabilityResult::failure(reply)
    } else {
        CapabilityResult::ok(reply)
    }
}

/// Lock capability-owned state, recovering from a poisoned mutex.
///
/// A panic inside one invocation is already reported as a failed envelope;
/// the state it guarded stays usable for the next call.
pub(crate) fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cut `s` to at most `max` bytes without splitting a character.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
