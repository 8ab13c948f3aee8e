//! In-memory calendar store.

use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::lock;

/// A calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    /// ISO-8601 time as supplied by the caller.
    pub time: String,
}

/// Calendar capability owning its event list for the agent's lifetime.
#[derive(Debug, Default)]
pub struct CalendarTool {
    events: Mutex<Vec<Event>>,
}

impl CalendarTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored events.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }
}

/// Accept RFC 3339 or a naive `YYYY-MM-DDTHH:MM[:SS]` timestamp.
fn is_iso_timestamp(s: &str) -> bool {
    DateTime::<FixedOffset>::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
        || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

impl Capability for CalendarTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "calendar".into(),
            description: "Add an event or list stored events.".into(),
            parameters: vec![
                CapabilityParam::required("action", "Action: 'add' or 'list'."),
                CapabilityParam::optional("title", "Event title (for 'add')."),
                CapabilityParam::optional("time", "ISO-8601 time (for 'add')."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Cautious, [Effect::LocalState])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let action = input.require_str("action", "calendar")?;
        match action {
            "add" => {
                let title = input.require_str("title", "calendar")?;
                let time = input
                    .get_str("time")
                    .or_else(|| input.get_str("time_iso"))
                    .unwrap_or("");
                if !time.is_empty() && !is_iso_timestamp(time) {
                    return Ok(CapabilityResult::failure(format!(
                        "Invalid time \"{time}\": expected ISO-8601, e.g. 2026-10-14T09:30:00."
                    )));
                }
                let mut events = lock(&self.events);
                events.push(Event {
                    title: title.to_string(),
                    time: time.to_string(),
                });
                Ok(CapabilityResult::ok(format!("Added event '{title}'"))
                    .with_metadata("count", events.len()))
            }
            "list" => {
                let events = lock(&self.events);
                Ok(CapabilityResult::ok(serde_json::to_value(&*events).unwrap_or_default())
                    .with_metadata("count", events.len()))
            }
            other => Ok(CapabilityResult::failure(format!(
                "Unknown action: \"{other}\". Use 'add' or 'list'."
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_list() {
        let cal = CalendarTool::new();
        let added = cal
            .run(
                &CapabilityInput::new()
                    .with_param("action", "add")
                    .with_param("title", "Standup")
                    .with_param("time", "2026-10-14T09:30:00Z"),
            )
            .unwrap();
        assert_eq!(added.output_text(), "Added event 'Standup'");

        let listed = cal
            .run(&CapabilityInput::new().with_param("action", "list"))
            .unwrap();
        assert_eq!(listed.output()[0]["title"], "Standup");
        assert_eq!(cal.events().len(), 1);
    }

    #[test]
    fn rejects_garbage_time() {
        let cal = CalendarTool::new();
        let out = cal
            .run(
                &CapabilityInput::new()
                    .with_param("action", "add")
                    .with_param("title", "x")
                    .with_param("time", "next tuesday"),
            )
            .unwrap();
        assert!(!out.succeeded());
        assert!(cal.events().is_empty());
    }

    #[test]
    fn unknown_action_fails() {
        let out = CalendarTool::new()
            .run(&CapabilityInput::new().with_param("action", "remove"))
            .unwrap();
        assert!(!out.succeeded());
    }
}
