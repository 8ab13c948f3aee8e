//! Filesystem capability: read files anywhere, write only under scratch.
//!
//! Relative write paths resolve against the scratch directory. Absolute
//! write paths are accepted only when they land inside it.

use std::path::{Path, PathBuf};

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;
use crate::agent::manifest::{DangerLevel, Effect, Safety};

use super::truncate;

/// Maximum bytes returned from a read.
const MAX_READ_BYTES: usize = 64 * 1024;

pub struct FileIoTool {
    /// Directory the agent is allowed to write into. `None` disables writes.
    scratch_dir: Option<PathBuf>,
}

impl FileIoTool {
    pub fn new(scratch_dir: Option<PathBuf>) -> Self {
        Self { scratch_dir }
    }

    fn read(&self, path: &Path) -> CapabilityResult {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let total = content.len();
                let body = truncate(&content, MAX_READ_BYTES);
                CapabilityResult::ok(body)
                    .with_metadata("path", path.display().to_string())
                    .with_metadata("bytes", total)
                    .with_metadata("truncated", body.len() < total)
            }
            Err(e) => CapabilityResult::failure(format!("Failed to read \"{}\": {e}", path.display())),
        }
    }

    fn write(&self, path_str: &str, content: &str) -> CapabilityResult {
        let Some(scratch) = &self.scratch_dir else {
            return CapabilityResult::failure(
                "Writes disabled: no scratch directory configured. Set [storage].scratch_dir.",
            );
        };

        if let Err(e) = std::fs::create_dir_all(scratch) {
            return CapabilityResult::failure(format!(
                "Failed to create scratch directory \"{}\": {e}",
                scratch.display()
            ));
        }

        let candidate = PathBuf::from(path_str);
        let requested = if candidate.is_absolute() {
            candidate
        } else {
            scratch.join(candidate)
        };

        let Some(path) = resolve_within(&requested, scratch) else {
            return CapabilityResult::failure(format!(
                "Write denied: path \"{}\" is outside scratch directory \"{}\".",
                requested.display(),
                scratch.display(),
            ));
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return CapabilityResult::failure(format!(
                    "Failed to create directory \"{}\": {e}",
                    parent.display()
                ));
            }
        }

        match std::fs::write(&path, content) {
            Ok(()) => CapabilityResult::ok(format!("Wrote to {}", path.display()))
                .with_metadata("bytes", content.len()),
            Err(e) => CapabilityResult::failure(format!("Failed to write \"{}\": {e}", path.display())),
        }
    }
}

/// Real location of `path` if it lies inside `root`, else `None`.
///
/// Every existing component is canonicalized, so symlinks are followed
/// before the containment check. `..` components are rejected outright and
/// a dangling symlink fails to canonicalize.
fn resolve_within(path: &Path, root: &Path) -> Option<PathBuf> {
    use std::path::Component;

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return None;
    }
    let root = root.canonicalize().ok()?;

    let mut existing: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let mut rest = Vec::new();
    while existing.symlink_metadata().is_err() {
        rest.push(existing.file_name()?.to_os_string());
        if !existing.pop() {
            return None;
        }
    }

    let mut resolved = existing.canonicalize().ok()?;
    for name in rest.into_iter().rev() {
        resolved.push(name);
    }
    resolved.starts_with(&root).then_some(resolved)
}

impl Capability for FileIoTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "filesystem".into(),
            description: "Read or write files. Writes are restricted to the scratch directory."
                .into(),
            parameters: vec![
                CapabilityParam::required("action", "Action: 'read' or 'write'."),
                CapabilityParam::required("path", "File path (relative paths resolve in scratch)."),
                CapabilityParam::optional("content", "Content to write (default: empty)."),
            ],
        }
    }

    fn safety(&self) -> Safety {
        Safety::new(
            DangerLevel::Dangerous,
            [Effect::ReadFilesystem, Effect::WriteFilesystem],
        )
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let action = input.require_str("action", "filesystem")?;
        let path = input.require_str("path", "filesystem")?;

        Ok(match action {
            "read" => self.read(Path::new(path)),
            "write" => self.write(path, input.get_str("content").unwrap_or("")),
            other => CapabilityResult::failure(format!(
                "Unknown action: \"{other}\". Use 'read' or 'write'."
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(action: &str, path: &str) -> CapabilityInput {
        CapabilityInput::new()
            .with_param("action", action)
            .with_param("path", path)
    }

    #[test]
    fn write_then_read_in_scratch() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = FileIoTool::new(Some(dir.path().to_path_buf()));

        let wrote = tool
            .run(&input("write", "notes/a.txt").with_param("content", "hello"))
            .unwrap();
        assert!(wrote.succeeded(), "{wrote:?}");

        let path = dir.path().join("notes/a.txt");
        let read = tool.run(&input("read", path.to_str().unwrap())).unwrap();
        assert!(read.succeeded());
        assert_eq!(read.output_text(), "hello");
    }

    #[test]
    fn write_outside_scratch_is_denied() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = FileIoTool::new(Some(dir.path().to_path_buf()));
        let out = tool
            .run(&input("write", "../escape.txt").with_param("content", "x"))
            .unwrap();
        assert!(!out.succeeded());
        assert!(out.output_text().contains("outside scratch"));
        assert!(!dir.path().parent().unwrap().join("escape.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_scratch_is_denied() {
        let dir = tempfile::TempDir::new().unwrap();
        let scratch = dir.path().join("scratch");
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&scratch).unwrap();
        std::fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink("../outside", scratch.join("link")).unwrap();
        std::os::unix::fs::symlink(outside.join("missing.txt"), scratch.join("dangling")).unwrap();

        let tool = FileIoTool::new(Some(scratch));
        let out = tool
            .run(&input("write", "link/pwned.txt").with_param("content", "x"))
            .unwrap();
        assert!(!out.succeeded(), "{out:?}");
        assert!(!outside.join("pwned.txt").exists());

        let out = tool
            .run(&input("write", "dangling").with_param("content", "x"))
            .unwrap();
        assert!(!out.succeeded(), "{out:?}");
        assert!(!outside.join("missing.txt").exists());
    }

    #[test]
    fn writes_disabled_without_scratch() {
        let tool = FileIoTool::new(None);
        let out = tool.run(&input("write", "a.txt")).unwrap();
        assert!(!out.succeeded());
    }

    #[test]
    fn missing_file_and_unknown_action_fail() {
        let tool = FileIoTool::new(None);
        assert!(!tool.run(&input("read", "/definitely/not/here")).unwrap().succeeded());
        assert!(!tool.run(&input("delete", "/tmp/x")).unwrap().succeeded());
    }
}
