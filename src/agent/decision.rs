//! Decision engine: classify an instruction as act, ask, or wait.
//!
//! One prompt goes to the completion gateway asking for a JSON verdict with
//! a reason. The reply is parsed according to [`VerdictParsing`]; anything
//! that cannot be read as a verdict falls back to [`Verdict::Ask`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::llm::{CompletionGateway, is_error_sentinel};

/// How the engine should handle an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Act,
    Ask,
    Wait,
}

impl Verdict {
    /// The exact token the model is asked to emit.
    pub fn token(self) -> &'static str {
        match self {
            Self::Act => "act",
            Self::Ask => "ask",
            Self::Wait => "wait",
        }
    }

    /// Parse an exact, case-sensitive verdict token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "act" => Some(Self::Act),
            "ask" => Some(Self::Ask),
            "wait" => Some(Self::Wait),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// A verdict plus the reasoning behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub rationale: String,
}

/// Strategy for turning model text into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictParsing {
    /// Require a JSON `decision` field or a leading exact token.
    #[default]
    Strict,
    /// Match "act", then "wait", then "ask" anywhere in the reply.
    ///
    /// Note that "act" also matches inside words like "exact" or "action".
    Substring,
}

/// Classifies free-text context into a [`Decision`].
pub struct DecisionEngine {
    gateway: Arc<dyn CompletionGateway>,
    parsing: VerdictParsing,
}

impl DecisionEngine {
    pub fn new(gateway: Arc<dyn CompletionGateway>, parsing: VerdictParsing) -> Self {
        Self { gateway, parsing }
    }

    pub fn parsing(&self) -> VerdictParsing {
        self.parsing
    }

    /// Build the meta-reasoning prompt for `context`.
    pub fn prompt(context: &str) -> String {
        format!(
            "You are a meta-reasoner. Based on the context, decide JSON \
             {{\"decision\": \"act\"|\"ask\"|\"wait\", \"reason\": \"...\"}}.\n\n\
             Context:\n{context}"
        )
    }

    /// Classify `context`. Never fails: unreadable replies become `Ask`.
    pub fn classify(&self, context: &str) -> Decision {
        let reply = self.gateway.complete(&Self::prompt(context));
        let decision = self.interpret(&reply);
        tracing::info!(verdict = %decision.verdict, "classified instruction");
        decision
    }

    /// Interpret a raw model reply under this engine's parsing strategy.
    pub fn interpret(&self, reply: &str) -> Decision {
        if is_error_sentinel(reply) {
            return fallback(format!("completion gateway failed: {reply}"));
        }
        if reply.trim().is_empty() {
            return fallback("completion gateway returned an empty reply".into());
        }

        let parsed = match self.parsing {
            VerdictParsing::Strict => parse_strict(reply),
            VerdictParsing::Substring => parse_substring(reply),
        };

        parsed.unwrap_or_else(|| fallback(format!("no verdict found in reply: {}", reply.trim())))
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("parsing", &self.parsing)
            .finish()
    }
}

fn fallback(reason: String) -> Decision {
    Decision {
        verdict: Verdict::Ask,
        rationale: format!("defaulting to ask: {reason}"),
    }
}

fn parse_strict(reply: &str) -> Option<Decision> {
    // The first object carrying a valid verdict wins.
    let from_json = json_objects(reply).into_iter().find_map(|json| {
        let verdict = json["decision"]
            .as_str()
            .and_then(|d| Verdict::from_token(d.trim()))?;
        let rationale = json["reason"]
            .as_str()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("model chose {verdict} without a reason"));
        Some(Decision { verdict, rationale })
    });
    if from_json.is_some() {
        return from_json;
    }

    // Bare token form: "act: the request is concrete".
    let first_word = reply
        .trim()
        .split(|c: char| c.is_whitespace() || matches!(c, ':' | ',' | '.' | '-'))
        .next()?;
    let verdict = Verdict::from_token(first_word)?;
    Some(Decision {
        verdict,
        rationale: reply.trim().to_string(),
    })
}

fn parse_substring(reply: &str) -> Option<Decision> {
    let verdict = if reply.contains("act") {
        Verdict::Act
    } else if reply.contains("wait") {
        Verdict::Wait
    } else if reply.contains("ask") {
        Verdict::Ask
    } else {
        return None;
    };
    Some(Decision {
        verdict,
        rationale: reply.trim().to_string(),
    })
}

/// Parse every balanced top-level `{...}` object in free text, in order.
fn json_objects(text: &str) -> Vec<serde_json::Value> {
    let mut objects = Vec::new();
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let mut next = start + 1;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        for (i, c) in text[start..].char_indices() {
            if in_string {
                match c {
                    '\\' if !escaped => escaped = true,
                    '"' if !escaped => in_string = false,
                    _ => escaped = false,
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let end = start + i + 1;
                        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text[start..end]) {
                            if value.is_object() {
                                objects.push(value);
                                next = end;
                            }
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
        search_from = next;
    }
    objects
}
