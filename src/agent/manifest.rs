//! Capability safety metadata: danger levels and side-effect sets.
//!
//! Every capability declares a [`Safety`] alongside its signature. Front-ends
//! display it; capabilities marked [`Safety::requires_opt_in`] refuse to run
//! their unsafe path unless the caller sets an explicit flag on that call.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How dangerous a capability's actions are.
///
/// Ordered from safest to most dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerLevel {
    /// No side effects, pure computation or a model call.
    Safe,
    /// Reads outside the process or touches local state.
    Cautious,
    /// Writes to the filesystem or persistent stores.
    Dangerous,
    /// Arbitrary execution.
    Critical,
}

impl std::fmt::Display for DangerLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Cautious => write!(f, "cautious"),
            Self::Dangerous => write!(f, "dangerous"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A side effect a capability may exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    ModelCall,
    ReadFilesystem,
    WriteFilesystem,
    ProcessExec,
    Notification,
    LocalState,
    Audit,
}

/// Safety declaration attached to every capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Safety {
    pub level: DangerLevel,
    pub effects: BTreeSet<Effect>,
    /// Name of the per-invocation flag that unlocks the unsafe path, if any.
    pub opt_in_flag: Option<String>,
}

impl Safety {
    /// A pure capability with no side effects.
    pub fn safe() -> Self {
        Self {
            level: DangerLevel::Safe,
            effects: BTreeSet::new(),
            opt_in_flag: None,
        }
    }

    /// A capability with the given level and effects.
    pub fn new(level: DangerLevel, effects: impl IntoIterator<Item = Effect>) -> Self {
        Self {
            level,
            effects: effects.into_iter().collect(),
            opt_in_flag: None,
        }
    }

    /// Mark the capability as unsafe: it only executes when `flag` is set.
    pub fn with_opt_in(mut self, flag: impl Into<String>) -> Self {
        self.opt_in_flag = Some(flag.into());
        self
    }

    /// Whether the capability runs arbitrary code or commands.
    pub fn requires_opt_in(&self) -> bool {
        self.opt_in_flag.is_some()
    }
}

impl Default for Safety {
    fn default() -> Self {
        Self::safe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn danger_level_ordering() {
        assert!(DangerLevel::Safe < DangerLevel::Cautious);
        assert!(DangerLevel::Cautious < DangerLevel::Dangerous);
        assert!(DangerLevel::Dangerous < DangerLevel::Critical);
    }

    #[test]
    fn opt_in_marks_unsafe() {
        let safety = Safety::new(DangerLevel::Critical, [Effect::ProcessExec]).with_opt_in("execute");
        assert!(safety.requires_opt_in());
        assert!(!Safety::safe().requires_opt_in());
        assert_eq!(safety.opt_in_flag.as_deref(), Some("execute"));
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&DangerLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let effect: Effect = serde_json::from_str("\"write_filesystem\"").unwrap();
        assert_eq!(effect, Effect::WriteFilesystem);
    }
}
