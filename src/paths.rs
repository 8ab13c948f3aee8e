//! XDG-compliant path resolution for the agent.
//!
//! `AgentPaths` locates the config file, the key-value store, the audit log,
//! and the scratch directory the filesystem and code-runner capabilities use.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

const APP_DIR: &str = "proactive-agent";

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(agent::paths::no_home),
        help("Set the HOME environment variable or pass explicit paths in the config file.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(agent::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global XDG-compliant directories.
#[derive(Debug, Clone)]
pub struct AgentPaths {
    /// `$XDG_CONFIG_HOME/proactive-agent/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/proactive-agent/`
    pub data_dir: PathBuf,
    /// `$XDG_STATE_HOME/proactive-agent/`
    pub state_dir: PathBuf,
}

impl AgentPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join(APP_DIR);

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join(APP_DIR);

        let state_dir = std::env::var("XDG_STATE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/state"))
            .join(APP_DIR);

        Ok(Self {
            config_dir,
            data_dir,
            state_dir,
        })
    }

    /// All directories rooted under a single base (tests, portable installs).
    pub fn rooted(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            config_dir: base.join("config"),
            data_dir: base.join("data"),
            state_dir: base.join("state"),
        }
    }

    /// Create all base directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.state_dir,
            &self.scratch_dir(),
        ] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Path to the config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// JSON object file backing the `db` capability.
    pub fn kv_store_file(&self) -> PathBuf {
        self.data_dir.join("agent_db.json")
    }

    /// Append-only audit log.
    pub fn audit_log_file(&self) -> PathBuf {
        self.state_dir.join("agent.log")
    }

    /// Directory the agent may write files into.
    pub fn scratch_dir(&self) -> PathBuf {
        self.data_dir.join("scratch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooted_layout() {
        let paths = AgentPaths::rooted("/tmp/pa");
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/pa/config/config.toml"));
        assert_eq!(paths.kv_store_file(), PathBuf::from("/tmp/pa/data/agent_db.json"));
        assert_eq!(paths.audit_log_file(), PathBuf::from("/tmp/pa/state/agent.log"));
        assert_eq!(paths.scratch_dir(), PathBuf::from("/tmp/pa/data/scratch"));
    }

    #[test]
    fn ensure_dirs_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = AgentPaths::rooted(dir.path());
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();
        assert!(paths.scratch_dir().is_dir());
        assert!(paths.state_dir.is_dir());
    }
}
