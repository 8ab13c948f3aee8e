//! Capability system: trait-based capabilities with runtime registration.
//!
//! Each capability implements the [`Capability`] trait and is registered in a
//! [`CapabilityRegistry`]. Every invocation, successful or not, produces a
//! [`CapabilityResult`] envelope; [`CapabilityRegistry::dispatch`] never fails.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{AgentError, AgentResult};
use super::manifest::Safety;

/// Description of a capability's interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySignature {
    /// Unique name of the capability.
    pub name: String,
    /// What this capability does.
    pub description: String,
    /// Parameters the capability accepts.
    pub parameters: Vec<CapabilityParam>,
}

/// A single parameter in a capability's signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityParam {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl CapabilityParam {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
        }
    }
}

/// Named parameters for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityInput {
    params: HashMap<String, Value>,
}

impl CapabilityInput {
    /// Create a new empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a parameter in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(name.into(), value.into());
    }

    /// Raw parameter value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// String parameter value. Non-string values are treated as absent.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    /// Get a required string parameter, returning an error if missing.
    pub fn require_str(&self, name: &str, capability: &str) -> AgentResult<&str> {
        self.get_str(name)
            .ok_or_else(|| AgentError::execution(capability, format!("missing required parameter: {name}")))
    }

    /// Unsigned integer parameter, accepting JSON numbers or numeric strings.
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.params.get(name)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean parameter, accepting JSON booleans or `"true"`/`"false"`.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.params.get(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no parameters were supplied.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for CapabilityInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Uniform envelope returned by every capability invocation.
///
/// A failed envelope always carries a human-readable failure description as
/// its output. Fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityResult {
    succeeded: bool,
    output: Value,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl CapabilityResult {
    /// Create a successful result.
    pub fn ok(output: impl Into<Value>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
            metadata: Map::new(),
        }
    }

    /// Create a failed result.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: Value::String(message.into()),
            metadata: Map::new(),
        }
    }

    /// Attach a metadata entry while building the envelope.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn output(&self) -> &Value {
        &self.output
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// The output as display text: strings verbatim, anything else as JSON.
    pub fn output_text(&self) -> String {
        match &self.output {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Consume the envelope and keep the output.
    pub fn into_output(self) -> Value {
        self.output
    }
}

/// A capability the agent can invoke by name.
pub trait Capability: Send + Sync {
    /// Describe this capability's interface.
    fn signature(&self) -> CapabilitySignature;

    /// Danger level and side effects. Defaults to safe.
    fn safety(&self) -> Safety {
        Safety::safe()
    }

    /// Execute with the given parameters.
    ///
    /// Errors are converted into failed envelopes by the registry.
    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult>;
}

/// Registry of available capabilities, keyed by name.
///
/// Registering a name that already exists replaces the earlier instance.
/// Aliases resolve to a registered name at lookup time.
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Box<dyn Capability>>,
    aliases: HashMap<String, String>,
}

impl CapabilityRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Register a capability. Last registration wins on a duplicate name.
    pub fn register(&mut self, capability: Box<dyn Capability>) {
        let name = capability.signature().name;
        if self.capabilities.insert(name.clone(), capability).is_some() {
            tracing::warn!(capability = %name, "replaced previously registered capability");
        }
    }

    /// Make `alias` dispatch to the capability registered as `target`.
    ///
    /// A real registration under the same name takes precedence.
    pub fn alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Get a capability by name or alias.
    pub fn get(&self, name: &str) -> Option<&dyn Capability> {
        self.capabilities
            .get(name)
            .or_else(|| {
                self.aliases
                    .get(name)
                    .and_then(|target| self.capabilities.get(target))
            })
            .map(|b| b.as_ref())
    }

    /// Whether `name` resolves to a registered capability.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All registered capability signatures, sorted by name.
    pub fn list(&self) -> Vec<(CapabilitySignature, Safety)> {
        let mut entries: Vec<_> = self
            .capabilities
            .values()
            .map(|c| (c.signature(), c.safety()))
            .collect();
        entries.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        entries
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.capabilities.keys().cloned().collect();
        names.sort();
        names
    }

    /// Invoke a capability by name. Always returns an envelope.
    pub fn dispatch(&self, name: &str, input: CapabilityInput) -> CapabilityResult {
        let Some(capability) = self.get(name) else {
            tracing::warn!(capability = %name, "dispatch to unknown capability");
            return CapabilityResult::failure(
                AgentError::CapabilityNotFound { name: name.into() }.to_string(),
            );
        };

        let result = match panic::catch_unwind(AssertUnwindSafe(|| capability.run(&input))) {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => CapabilityResult::failure(e.to_string()),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                CapabilityResult::failure(format!("capability {name} panicked: {reason}"))
            }
        };

        tracing::info!(capability = %name, succeeded = result.succeeded(), "dispatched");
        result
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);
    impl Capability for Echo {
        fn signature(&self) -> CapabilitySignature {
            CapabilitySignature {
                name: "echo".into(),
                description: "Echo a parameter".into(),
                parameters: vec![CapabilityParam::required("text", "Text to echo.")],
            }
        }
        fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
            let text = input.require_str("text", "echo")?;
            Ok(CapabilityResult::ok(format!("{}{text}", self.0)))
        }
    }

    struct Panicker;
    impl Capability for Panicker {
        fn signature(&self) -> CapabilitySignature {
            CapabilitySignature {
                name: "panicker".into(),
                description: "Always panics".into(),
                parameters: vec![],
            }
        }
        fn run(&self, _input: &CapabilityInput) -> AgentResult<CapabilityResult> {
            panic!("boom");
        }
    }

    #[test]
    fn register_and_list() {
        let mut reg = CapabilityRegistry::new();
        reg.register(Box::new(Echo("")));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.list()[0].0.name, "echo");
        assert!(reg.contains("echo"));
    }

    #[test]
    fn alias_dispatches_to_target() {
        let mut reg = CapabilityRegistry::new();
        reg.register(Box::new(Echo("")));
        reg.alias("say", "echo");
        reg.alias("dangling", "missing");

        let out = reg.dispatch("say", CapabilityInput::new().with_param("text", "hi"));
        assert!(out.succeeded());
        assert_eq!(out.output_text(), "hi");
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.names(), vec!["echo".to_string()]);
        assert!(!reg.contains("dangling"));
        assert!(!reg.dispatch("dangling", CapabilityInput::new()).succeeded());
    }

    #[test]
    fn duplicate_registration_last_wins() {
        let mut reg = CapabilityRegistry::new();
        reg.register(Box::new(Echo("first:")));
        reg.register(Box::new(Echo("second:")));
        assert_eq!(reg.len(), 1);
        let out = reg.dispatch("echo", CapabilityInput::new().with_param("text", "x"));
        assert_eq!(out.output(), &Value::from("second:x"));
    }

    #[test]
    fn unknown_capability_is_failed_envelope() {
        let reg = CapabilityRegistry::new();
        let out = reg.dispatch("nonexistent_tool", CapabilityInput::new());
        assert!(!out.succeeded());
        assert!(out.output_text().contains("nonexistent_tool"));
    }

    #[test]
    fn run_error_becomes_failed_envelope() {
        let mut reg = CapabilityRegistry::new();
        reg.register(Box::new(Echo("")));
        let out = reg.dispatch("echo", CapabilityInput::new());
        assert!(!out.succeeded());
        assert_eq!(out.output_text(), "missing required parameter: text");
    }

    #[test]
    fn panic_becomes_failed_envelope() {
        let mut reg = CapabilityRegistry::new();
        reg.register(Box::new(Panicker));
        let out = reg.dispatch("panicker", CapabilityInput::new());
        assert!(!out.succeeded());
        assert!(out.output_text().contains("boom"));
    }

    #[test]
    fn input_accessors_coerce() {
        let input: CapabilityInput = [
            ("n", Value::from("7")),
            ("flag", Value::from("false")),
            ("m", Value::from(3)),
        ]
        .into_iter()
        .collect();
        assert_eq!(input.get_u64("n"), Some(7));
        assert_eq!(input.get_u64("m"), Some(3));
        assert_eq!(input.get_bool("flag"), Some(false));
        assert_eq!(input.get_str("m"), None);
        assert_eq!(input.len(), 3);
    }

    #[test]
    fn envelope_serializes_uniformly() {
        let env = CapabilityResult::ok(4).with_metadata("expression", "2+2");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["succeeded"], Value::Bool(true));
        assert_eq!(json["output"], Value::from(4));
        assert_eq!(json["metadata"]["expression"], Value::from("2+2"));
    }
}
