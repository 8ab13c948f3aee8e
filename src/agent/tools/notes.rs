//! In-memory note store.
//!
//! The orchestrator persists its auto-summary here at the end of every
//! "act" chain.

use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::lock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub ts: DateTime<Utc>,
    pub note: String,
}

#[derive(Debug, Default)]
pub struct NotesTool {
    notes: Mutex<Vec<Note>>,
}

impl NotesTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> Vec<Note> {
        lock(&self.notes).clone()
    }
}

impl Capability for NotesTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "notes".into(),
            description: "Save a timestamped note, or list saved notes with action=list.".into(),
            parameters: vec![
                CapabilityParam::required("note", "Note text."),
                CapabilityParam::optional("action", "'save' (default) or 'list'."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Cautious, [Effect::LocalState])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        match input.get_str("action").unwrap_or("save") {
            "save" => {
                let text = input.require_str("note", "notes")?;
                let ts = Utc::now();
                let stamp = ts.to_rfc3339_opts(SecondsFormat::Micros, true);
                lock(&self.notes).push(Note {
                    ts,
                    note: text.to_string(),
                });
                Ok(CapabilityResult::ok(format!("Saved note at {stamp}: {text}"))
                    .with_metadata("ts", stamp))
            }
            "list" => {
                let notes = lock(&self.notes);
                Ok(CapabilityResult::ok(serde_json::to_value(&*notes).unwrap_or_default())
                    .with_metadata("count", notes.len()))
            }
            other => Ok(CapabilityResult::failure(format!(
                "Unknown action: \"{other}\". Use 'save' or 'list'."
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_records_note_and_receipt() {
        let tool = NotesTool::new();
        let out = tool
            .run(&CapabilityInput::new().with_param("note", "Auto-summary: hi"))
            .unwrap();
        assert!(out.succeeded());
        assert!(out.output_text().starts_with("Saved note at "));
        assert!(out.output_text().ends_with("Auto-summary: hi"));
        assert_eq!(tool.notes()[0].note, "Auto-summary: hi");
    }

    #[test]
    fn list_returns_history_in_order() {
        let tool = NotesTool::new();
        for text in ["one", "two"] {
            tool.run(&CapabilityInput::new().with_param("note", text)).unwrap();
        }
        let out = tool
            .run(&CapabilityInput::new().with_param("action", "list"))
            .unwrap();
        assert_eq!(out.output()[0]["note"], "one");
        assert_eq!(out.output()[1]["note"], "two");
    }

    #[test]
    fn missing_note_is_an_error() {
        assert!(NotesTool::new().run(&CapabilityInput::new()).is_err());
    }
}
