//! Key-value store backed by a JSON object file.
//!
//! The file maps string keys to arbitrary JSON values. A missing file reads
//! as an empty store. Every call re-reads the file, and writes go through a
//! temporary file plus rename. Durability is best effort.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::{AgentError, AgentResult};
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::lock;

pub struct KvStoreTool {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    file_lock: Mutex<()>,
}

impl KvStoreTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> AgentResult<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(AgentError::execution(
                    "db",
                    format!("Failed to read \"{}\": {e}", self.path.display()),
                ));
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AgentError::execution(
                "db",
                format!("\"{}\" does not contain a JSON object", self.path.display()),
            )),
            Err(e) => Err(AgentError::execution(
                "db",
                format!("Failed to parse \"{}\": {e}", self.path.display()),
            )),
        }
    }

    fn save(&self, map: &Map<String, Value>) -> AgentResult<()> {
        let io_err = |e: std::io::Error| {
            AgentError::execution("db", format!("Failed to write \"{}\": {e}", self.path.display()))
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let body = serde_json::to_string_pretty(map)
            .map_err(|e| AgentError::execution("db", format!("JSON serialize error: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl Capability for KvStoreTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "db".into(),
            description: "Persistent JSON key-value store: get, set, delete, list.".into(),
            parameters: vec![
                CapabilityParam::required("action", "Action: 'get', 'set', 'delete', or 'list'."),
                CapabilityParam::optional("key", "Key (for get/set/delete)."),
                CapabilityParam::optional("value", "Any JSON value (for set)."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(DangerLevel::Dangerous, [Effect::LocalState, Effect::WriteFilesystem])
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let action = input.require_str("action", "db")?;
        let _guard = lock(&self.file_lock);

        match action {
            "get" => {
                let key = input.require_str("key", "db")?;
                let map = self.load()?;
                let found = map.contains_key(key);
                Ok(CapabilityResult::ok(map.get(key).cloned().unwrap_or(Value::Null))
                    .with_metadata("found", found))
            }
            "set" => {
                let key = input.require_str("key", "db")?;
                let value = input.get("value").cloned().unwrap_or(Value::Null);
                let mut map = self.load()?;
                map.insert(key.to_string(), value);
                self.save(&map)?;
                Ok(CapabilityResult::ok("OK"))
            }
            "delete" => {
                let key = input.require_str("key", "db")?;
                let mut map = self.load()?;
                let removed = map.remove(key).is_some();
                if removed {
                    self.save(&map)?;
                }
                Ok(CapabilityResult::ok(if removed { "OK" } else { "Not found" })
                    .with_metadata("removed", removed))
            }
            "list" => Ok(CapabilityResult::ok(Value::Object(self.load()?))),
            other => Ok(CapabilityResult::failure(format!(
                "Unknown DB action: \"{other}\". Use 'get', 'set', 'delete', or 'list'."
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(dir: &tempfile::TempDir) -> KvStoreTool {
        KvStoreTool::new(dir.path().join("agent_db.json"))
    }

    fn call(t: &KvStoreTool, action: &str, key: &str, value: Option<Value>) -> CapabilityResult {
        let mut input = CapabilityInput::new()
            .with_param("action", action)
            .with_param("key", key);
        if let Some(v) = value {
            input.insert("value", v);
        }
        t.run(&input).unwrap()
    }

    #[test]
    fn set_get_list_delete() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = tool(&dir);

        assert_eq!(call(&db, "get", "missing", None).output(), &Value::Null);
        assert_eq!(
            call(&db, "set", "langs", Some(serde_json::json!(["rust", "go"]))).output_text(),
            "OK"
        );
        assert_eq!(call(&db, "get", "langs", None).output()[1], "go");

        let listed = db.run(&CapabilityInput::new().with_param("action", "list")).unwrap();
        assert!(listed.output()["langs"].is_array());

        assert_eq!(call(&db, "delete", "langs", None).output_text(), "OK");
        assert_eq!(call(&db, "delete", "langs", None).output_text(), "Not found");
    }

    #[test]
    fn persists_across_instances() {
        let dir = tempfile::TempDir::new().unwrap();
        call(&tool(&dir), "set", "k", Some(Value::from(42)));
        assert_eq!(call(&tool(&dir), "get", "k", None).output(), &Value::from(42));

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("agent_db.json")).unwrap())
                .unwrap();
        assert_eq!(raw["k"], 42);
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_panic() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("agent_db.json"), "[1, 2]").unwrap();
        let db = tool(&dir);
        assert!(db.run(&CapabilityInput::new().with_param("action", "list")).is_err());
    }
}
