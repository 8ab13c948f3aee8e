//! Child-process execution with a deadline and capped output.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use super::truncate;

/// Maximum bytes kept from each of stdout and stderr.
pub(crate) const MAX_OUTPUT_SIZE: usize = 64 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Time allowed for the pipes to reach EOF once the process group is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Captured result of a finished child process.
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn exit_code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }
}

/// Why a child could not produce a [`ProcessOutput`].
#[derive(Debug)]
pub(crate) enum ProcessFailure {
    Spawn(std::io::Error),
    Wait(std::io::Error),
    TimedOut(Duration),
}

impl std::fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "failed to spawn process: {e}"),
            Self::Wait(e) => write!(f, "failed to wait on process: {e}"),
            Self::TimedOut(d) => write!(f, "timed out after {}s", d.as_secs()),
        }
    }
}

/// Run `command` with piped output, killing it once `timeout` elapses.
///
/// On unix the child leads its own process group. The whole group is
/// killed on timeout and again after the child exits, so background
/// descendants holding the pipes cannot outlive the call. Pipe reads are
/// bounded by the same deadline.
pub(crate) fn run_with_timeout(
    mut command: Command,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessFailure> {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ProcessFailure::Spawn)?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                kill_group(&mut child);
                let _ = child.wait();
                return Err(ProcessFailure::TimedOut(timeout));
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                kill_group(&mut child);
                return Err(ProcessFailure::Wait(e));
            }
        }
    };
    kill_group(&mut child);

    Ok(ProcessOutput {
        status,
        stdout: collect(stdout, deadline),
        stderr: collect(stderr, deadline),
    })
}

#[cfg(unix)]
fn kill_group(child: &mut Child) {
    // SAFETY: killpg only sends a signal. The group id is the child's pid
    // because it was spawned with process_group(0); a group with no members
    // left makes the call fail with ESRCH, which is ignored.
    unsafe {
        libc::killpg(child.id() as libc::pid_t, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

fn collect(pipe: Option<Receiver<Vec<u8>>>, deadline: Instant) -> String {
    let wait = deadline
        .saturating_duration_since(Instant::now())
        .max(DRAIN_GRACE);
    let bytes = pipe
        .and_then(|rx| rx.recv_timeout(wait).ok())
        .unwrap_or_default();
    let text = String::from_utf8_lossy(&bytes);
    if text.len() > MAX_OUTPUT_SIZE {
        format!(
            "{}... [truncated at {MAX_OUTPUT_SIZE} bytes, total: {}]",
            truncate(&text, MAX_OUTPUT_SIZE),
            text.len()
        )
    } else {
        text.into_owned()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_both_streams() {
        let out = run_with_timeout(sh("echo out; echo err >&2; exit 3"), Duration::from_secs(5)).unwrap();
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert_eq!(out.exit_code(), 3);
    }

    #[test]
    fn kills_on_timeout() {
        let err = run_with_timeout(sh("sleep 5"), Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ProcessFailure::TimedOut(_)));
    }

    #[test]
    fn large_output_does_not_deadlock() {
        let out = run_with_timeout(
            sh("head -c 200000 /dev/zero | tr '\\0' a"),
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(out.stdout.contains("[truncated at"));
    }

    #[test]
    fn background_child_does_not_extend_the_call() {
        let started = Instant::now();
        let out = run_with_timeout(sh("sleep 6 & echo started"), Duration::from_secs(1)).unwrap();
        assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
        assert_eq!(out.stdout.trim(), "started");
    }

    #[test]
    fn timeout_kills_the_whole_group() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("late");
        let script = format!("(sleep 2; touch {}) & sleep 6", marker.display());

        let started = Instant::now();
        let err = run_with_timeout(sh(&script), Duration::from_millis(300)).unwrap_err();
        assert!(matches!(err, ProcessFailure::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());

        std::thread::sleep(Duration::from_secs(3));
        assert!(!marker.exists(), "background child survived the timeout");
    }
}
