//! Completion gateway: the single boundary to the language model.
//!
//! Every model-backed capability and the decision engine call
//! [`CompletionGateway::complete`], which always returns text. Transport,
//! auth, and parse failures come back as an error sentinel string (see
//! [`is_error_sentinel`]) so callers decide for themselves how to react.
//!
//! [`ChatClient`] talks to any OpenAI-compatible chat-completions endpoint
//! (Groq by default) over blocking `ureq`.

use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tools::truncate;

/// Prefix of the text returned when the backing service fails.
pub const ERROR_SENTINEL_PREFIX: &str = "[completion error: ";

/// Errors from the LLM subsystem.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("missing API credential: environment variable {var} is not set")]
    #[diagnostic(
        code(agent::llm::missing_credential),
        help("Export {var}=<your key> before starting the agent.")
    )]
    MissingCredential { var: String },

    #[error("completion request failed: {message}")]
    #[diagnostic(
        code(agent::llm::request_failed),
        help("Check network access and the configured base_url.")
    )]
    RequestFailed { message: String },

    #[error("completion service returned HTTP {status}: {body}")]
    #[diagnostic(
        code(agent::llm::http_status),
        help("401/403 usually means a bad API key; 429 means the rate limit was hit.")
    )]
    HttpStatus { status: u16, body: String },

    #[error("completion request timed out after {timeout_secs}s")]
    #[diagnostic(
        code(agent::llm::timeout),
        help("Increase [model].timeout_secs or use a smaller model.")
    )]
    Timeout { timeout_secs: u64 },

    #[error("failed to parse completion response: {message}")]
    #[diagnostic(
        code(agent::llm::parse_error),
        help("The service returned an unexpected response format.")
    )]
    ParseError { message: String },
}

/// Narrow interface to the language model. Total: never fails.
pub trait CompletionGateway: Send + Sync {
    /// Complete `prompt`, returning model text or an error sentinel.
    fn complete(&self, prompt: &str) -> String;
}

/// Closures act as gateways, which keeps scripted test doubles short.
impl<F> CompletionGateway for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn complete(&self, prompt: &str) -> String {
        self(prompt)
    }
}

/// Render a failure as the gateway's error sentinel.
pub fn error_sentinel(cause: impl std::fmt::Display) -> String {
    format!("{ERROR_SENTINEL_PREFIX}{cause}]")
}

/// Whether `text` is a gateway error sentinel rather than model output.
pub fn is_error_sentinel(text: &str) -> bool {
    text.starts_with(ERROR_SENTINEL_PREFIX)
}

/// Configuration for the chat-completions client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_model() -> String {
    "llama-3.1-8b-instant".into()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    512
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_api_key_env() -> String {
    "GROQ_API_KEY".into()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Blocking client for an OpenAI-compatible chat-completions endpoint.
pub struct ChatClient {
    config: ChatConfig,
    api_key: String,
    http: ureq::Agent,
}

impl ChatClient {
    /// Create a client with an explicit API key.
    pub fn new(config: ChatConfig, api_key: impl Into<String>) -> Self {
        let http = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            config,
            api_key: api_key.into(),
            http,
        }
    }

    /// Create a client reading the key from `config.api_key_env`.
    ///
    /// A missing or empty variable is a startup failure.
    pub fn from_env(config: ChatConfig) -> Result<Self, LlmError> {
        let var = config.api_key_env.clone();
        match std::env::var(&var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(config, key.trim())),
            _ => Err(LlmError::MissingCredential { var }),
        }
    }

    /// Single-turn completion, surfacing failures as [`LlmError`].
    pub fn try_complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "stream": false,
        });

        let body_str = serde_json::to_string(&body).map_err(|e| LlmError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        tracing::debug!(model = %self.config.model, prompt_len = prompt.len(), "completion request");

        let resp = self
            .http
            .post(&url)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_string(&body_str)
            .map_err(|e| self.map_transport(e))?;

        let resp_str = resp.into_string().map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;

        parse_chat_response(&resp_str)
    }

    fn map_transport(&self, err: ureq::Error) -> LlmError {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                let body = if body.len() > 300 {
                    format!("{}...", truncate(&body, 300))
                } else {
                    body
                };
                LlmError::HttpStatus { status, body }
            }
            ureq::Error::Transport(transport) => {
                let message = transport.to_string();
                if message.contains("timed out") {
                    LlmError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                } else {
                    LlmError::RequestFailed { message }
                }
            }
        }
    }

    /// Get the model name being used.
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

impl CompletionGateway for ChatClient {
    fn complete(&self, prompt: &str) -> String {
        match self.try_complete(prompt) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "completion gateway failure");
                error_sentinel(e)
            }
        }
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Extract `choices[0].message.content` from a chat-completions body.
fn parse_chat_response(body: &str) -> Result<String, LlmError> {
    let json: serde_json::Value = serde_json::from_str(body).map_err(|e| LlmError::ParseError {
        message: e.to_string(),
    })?;

    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| LlmError::ParseError {
            message: "missing 'choices[0].message.content' field".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_backend_yields_sentinel() {
        let config = ChatConfig {
            base_url: "http://127.0.0.1:1".into(), // unreachable port
            timeout_secs: 2,
            ..Default::default()
        };
        let client = ChatClient::new(config, "test-key");
        assert!(client.try_complete("hello").is_err());
        let text = client.complete("hello");
        assert!(is_error_sentinel(&text), "got: {text}");
    }

    #[test]
    fn missing_credential_is_an_error() {
        let config = ChatConfig {
            api_key_env: "PROACTIVE_AGENT_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        match ChatClient::from_env(config) {
            Err(LlmError::MissingCredential { var }) => {
                assert_eq!(var, "PROACTIVE_AGENT_TEST_KEY_THAT_IS_NEVER_SET");
            }
            other => panic!("expected MissingCredential, got {other:?}"),
        }
    }

    #[test]
    fn parses_chat_completion_body() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "hi there");
        assert!(parse_chat_response(r#"{"choices":[]}"#).is_err());
        assert!(parse_chat_response("not json").is_err());
    }

    #[test]
    fn closures_are_gateways() {
        let gateway = |prompt: &str| format!("echo: {prompt}");
        assert_eq!(gateway.complete("x"), "echo: x");
    }

    #[test]
    fn sentinel_round_trip() {
        let s = error_sentinel("boom");
        assert_eq!(s, "[completion error: boom]");
        assert!(is_error_sentinel(&s));
        assert!(!is_error_sentinel("ordinary text"));
    }

    #[test]
    fn default_config_values() {
        let config = ChatConfig::default();
        assert_eq!(config.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.api_key_env, "GROQ_API_KEY");
    }
}
