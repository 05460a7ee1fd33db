//! Subprocess spawning with a timeout and whole-process-group teardown.
//!
//! Spawns via `Command::new(...).stdin/stdout/stderr(Stdio::piped())` and
//! wraps `.wait()` in `tokio::time::timeout`. The POSIX process-group kill
//! is authored directly against the `nix` crate's documented
//! `setsid`/`killpg` API —
//! see DESIGN.md.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::domain::error::EngineError;

#[derive(Debug)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Spawns `program args…` with `env` overlaid on the current process
/// environment, waits up to `timeout_duration`, and returns the captured
/// output. A POSIX child is placed in its own session so it can be killed
/// as a group; on timeout the whole group is signalled.
pub async fn run_with_timeout(
    node_id: &str,
    program: &str,
    args: &[String],
    env: &std::collections::HashMap<String, String>,
    timeout_duration: Duration,
) -> Result<CommandOutput, EngineError> {
    let mut command = Command::new(program);
    command.args(args).envs(env).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    #[cfg(unix)]
    unsafe_preexec_setsid(&mut command);

    let mut child = command.spawn().map_err(|err| EngineError::CommandError {
        node_id: node_id.to_string(),
        message: err.to_string(),
    })?;
    let pid = child.id();

    let output = timeout(timeout_duration, child.wait_with_output()).await;
    match output {
        Ok(Ok(output)) => Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(err)) => Err(EngineError::CommandError {
            node_id: node_id.to_string(),
            message: err.to_string(),
        }),
        Err(_) => {
            if let Some(pid) = pid {
                kill_tree(pid);
            }
            Err(EngineError::Timeout {
                node_id: node_id.to_string(),
                timeout_ms: timeout_duration.as_millis() as u64,
            })
        }
    }
}

/// Spawns a long-lived, detached child (used for the staging server) and
/// returns only its pid; stdio is inherited so server logs are visible.
pub fn spawn_detached(
    program: &str,
    args: &[String],
    env: &std::collections::HashMap<String, String>,
) -> std::io::Result<Child> {
    let mut command = Command::new(program);
    command.args(args).envs(env).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

    #[cfg(unix)]
    unsafe_preexec_setsid(&mut command);

    command.spawn()
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn unsafe_preexec_setsid(command: &mut Command) {
    use std::os::unix::process::CommandExt as _;
    // Safety: `setsid()` is async-signal-safe and is the only call made
    // between fork and exec; it puts the child in a new session so its pid
    // doubles as its process-group id for `killpg` at teardown.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid().map(|_| ()).map_err(std::io::Error::from)
        });
    }
}

/// Kills the process group rooted at `pid` on POSIX, or the process
/// directly on Windows, per spec §4.3/§4.9's "subprocess groups" design
/// note.
pub fn kill_tree(pid: u32) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;
        let _ = signal::killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
    #[cfg(windows)]
    {
        // Best-effort: taskkill terminates the process and its children.
        let _ = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .output();
    }
}
