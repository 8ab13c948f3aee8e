//! Top-level control loop: one instruction in, one [`AgentOutcome`] out.
//!
//! Each call to [`Orchestrator::handle`] classifies the instruction, writes
//! exactly one audit record for the decision, then either runs the fixed
//! research chain (plan, search, summarize, note) or asks the model for a
//! proposal. Nothing here returns an error: partial failures surface as
//! failed envelopes inside the outcome.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{AgentSettings, ToolsConfig};
use crate::paths::AgentPaths;

use super::audit::{AuditSink, FileAuditSink, MemoryAuditSink};
use super::capability::{
    CapabilityInput, CapabilityRegistry, CapabilityResult, CapabilitySignature,
};
use super::decision::{Decision, DecisionEngine, Verdict, VerdictParsing};
use super::llm::CompletionGateway;
use super::manifest::Safety;
use super::tools::{BuiltinDeps, register_builtins};

/// Result of handling one instruction. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision")]
pub enum AgentOutcome {
    /// The research chain ran to completion.
    #[serde(rename = "act")]
    Acted {
        plan: CapabilityResult,
        search: CapabilityResult,
        summary: CapabilityResult,
        note: CapabilityResult,
    },
    /// The agent asked or waited and proposed next steps instead.
    #[serde(rename = "ask")]
    Deferred { proposal: String },
}

impl AgentOutcome {
    pub fn is_acted(&self) -> bool {
        matches!(self, Self::Acted { .. })
    }

    /// Most readable single line for a front-end.
    ///
    /// Prefers the first successful step of the chain in the order plan,
    /// summary, note. Falls back to the plan text when every step failed.
    pub fn headline(&self) -> String {
        match self {
            Self::Acted {
                plan,
                summary,
                note,
                ..
            } => [plan, summary, note]
                .into_iter()
                .find(|r| r.succeeded())
                .unwrap_or(plan)
                .output_text(),
            Self::Deferred { proposal } => proposal.clone(),
        }
    }
}

/// The agent: capabilities, model gateway, decision engine, and audit sink.
pub struct Orchestrator {
    registry: CapabilityRegistry,
    gateway: Arc<dyn CompletionGateway>,
    decision: Arc<DecisionEngine>,
    audit: Arc<dyn AuditSink>,
    system_prompt: String,
}

impl Orchestrator {
    /// Start building an orchestrator around `gateway`.
    pub fn builder(gateway: Arc<dyn CompletionGateway>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(gateway)
    }

    /// Handle one instruction.
    pub fn handle(&self, instruction: &str) -> AgentOutcome {
        let decision = self.decision.classify(instruction);
        self.record_decision(&decision);

        match decision.verdict {
            Verdict::Act => self.research(instruction),
            Verdict::Ask | Verdict::Wait => AgentOutcome::Deferred {
                proposal: self.propose(instruction),
            },
        }
    }

    /// Invoke one capability directly, bypassing the decision step.
    pub fn dispatch(&self, name: &str, input: CapabilityInput) -> CapabilityResult {
        self.registry.dispatch(name, input)
    }

    /// Signatures and safety metadata of every registered capability.
    pub fn capabilities(&self) -> Vec<(CapabilitySignature, Safety)> {
        self.registry.list()
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Mutable access for registering extra capabilities after build.
    pub fn registry_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.registry
    }

    pub fn decision_engine(&self) -> &DecisionEngine {
        &self.decision
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn record_decision(&self, decision: &Decision) {
        let message = format!("Decision: {} - {}", decision.verdict, decision.rationale);
        if let Err(e) = self.audit.record("info", &message) {
            tracing::warn!(error = %e, "audit record failed, continuing");
        }
    }

    /// Plan, search, summarize, note. Every step runs whatever the previous
    /// one returned.
    fn research(&self, instruction: &str) -> AgentOutcome {
        let plan = self.dispatch(
            "research_plan",
            CapabilityInput::new().with_param("topic", instruction),
        );
        let search = self.dispatch(
            "web_search",
            CapabilityInput::new().with_param("query", instruction),
        );
        let summary = self.dispatch(
            "summarizer",
            CapabilityInput::new().with_param("text", search.output_text()),
        );
        let note = self.dispatch(
            "notes",
            CapabilityInput::new()
                .with_param("note", format!("Auto-summary: {}", summary.output_text())),
        );

        AgentOutcome::Acted {
            plan,
            search,
            summary,
            note,
        }
    }

    fn propose(&self, instruction: &str) -> String {
        let prompt = format!(
            "{}\nUser: Instruction: {instruction}. Suggest next actions.",
            self.system_prompt
        );
        tracing::debug!(prompt_len = prompt.len(), "requesting proposal");
        self.gateway.complete(&prompt)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("capabilities", &self.registry.len())
            .field("decision", &self.decision)
            .finish()
    }
}

/// Assembles an [`Orchestrator`] with every built-in capability registered.
pub struct OrchestratorBuilder {
    gateway: Arc<dyn CompletionGateway>,
    audit: Option<Arc<dyn AuditSink>>,
    parsing: VerdictParsing,
    system_prompt: Option<String>,
    tools: ToolsConfig,
    kv_path: PathBuf,
    scratch_dir: Option<PathBuf>,
}

impl OrchestratorBuilder {
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            gateway,
            audit: None,
            parsing: VerdictParsing::default(),
            system_prompt: None,
            tools: ToolsConfig::default(),
            kv_path: default_kv_path(),
            scratch_dir: None,
        }
    }

    /// Builder preloaded from a settings file and resolved paths.
    ///
    /// The audit log is file-backed at the configured location.
    pub fn from_settings(
        settings: &AgentSettings,
        paths: &AgentPaths,
        gateway: Arc<dyn CompletionGateway>,
    ) -> Self {
        Self::new(gateway)
            .audit(Arc::new(FileAuditSink::new(settings.audit_log(paths))))
            .parsing(settings.agent.verdict_parsing)
            .system_prompt(settings.agent.system_prompt.clone())
            .tools(settings.tools.clone())
            .kv_path(settings.kv_path(paths))
            .scratch_dir(Some(settings.scratch_dir(paths)))
    }

    /// Audit sink for decisions and the `logger` capability.
    /// Defaults to an in-memory sink.
    pub fn audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn parsing(mut self, parsing: VerdictParsing) -> Self {
        self.parsing = parsing;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn tools(mut self, tools: ToolsConfig) -> Self {
        self.tools = tools;
        self
    }

    /// Backing file of the `db` capability. Defaults to a per-process file
    /// under the system temp directory.
    pub fn kv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kv_path = path.into();
        self
    }

    /// Directory `filesystem` may write into and `code_runner` runs in.
    pub fn scratch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scratch_dir = dir;
        self
    }

    pub fn build(self) -> Orchestrator {
        let audit = self
            .audit
            .unwrap_or_else(|| Arc::new(MemoryAuditSink::new()));
        let decision = Arc::new(DecisionEngine::new(self.gateway.clone(), self.parsing));
        let system_prompt = self
            .system_prompt
            .unwrap_or_else(|| crate::config::BehaviourConfig::default().system_prompt);

        let deps = BuiltinDeps {
            gateway: self.gateway.clone(),
            decision: decision.clone(),
            audit: audit.clone(),
            tools: self.tools,
            kv_path: self.kv_path,
            scratch_dir: self.scratch_dir,
        };
        let mut registry = CapabilityRegistry::new();
        register_builtins(&mut registry, &deps);
        tracing::debug!(capabilities = registry.len(), "orchestrator ready");

        Orchestrator {
            registry,
            gateway: self.gateway,
            decision,
            audit,
            system_prompt,
        }
    }
}

fn default_kv_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("proactive-agent-{}", std::process::id()))
        .join("agent_db.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ask_gateway() -> Arc<dyn CompletionGateway> {
        Arc::new(|prompt: &str| {
            if prompt.starts_with("You are a meta-reasoner") {
                r#"{"decision": "ask", "reason": "ambiguous"}"#.to_string()
            } else {
                "Clarify the target language.".to_string()
            }
        })
    }

    #[test]
    fn proposal_prompt_carries_system_prompt() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
        let log = seen.clone();
        let gateway: Arc<dyn CompletionGateway> = Arc::new(move |prompt: &str| {
            log.lock().unwrap().push(prompt.to_string());
            "wait".to_string()
        });
        let orchestrator = Orchestrator::builder(gateway)
            .system_prompt("Be brief.")
            .build();

        orchestrator.handle("tidy the inbox");
        let prompts = seen.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(
            prompts[1],
            "Be brief.\nUser: Instruction: tidy the inbox. Suggest next actions."
        );
    }

    #[test]
    fn outcome_serializes_with_decision_tag() {
        let outcome = Orchestrator::builder(ask_gateway()).build().handle("hm");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({"decision": "ask", "proposal": "Clarify the target language."})
        );
        assert_eq!(outcome.headline(), "Clarify the target language.");
    }

    #[test]
    fn headline_prefers_successful_step() {
        let outcome = AgentOutcome::Acted {
            plan: CapabilityResult::failure("plan failed"),
            search: CapabilityResult::ok("results"),
            summary: CapabilityResult::ok("short version"),
            note: CapabilityResult::ok("saved"),
        };
        assert!(outcome.is_acted());
        assert_eq!(outcome.headline(), "short version");
    }

    #[test]
    fn default_kv_store_is_not_in_the_working_directory() {
        let builder = Orchestrator::builder(ask_gateway());
        assert!(builder.kv_path.is_absolute());
        assert!(builder.kv_path.starts_with(std::env::temp_dir()));
    }

    #[test]
    fn builtins_are_registered() {
        let orchestrator = Orchestrator::builder(ask_gateway()).build();
        assert_eq!(orchestrator.capabilities().len(), 18);
        assert!(orchestrator.registry().contains("research_plan"));
    }
}
