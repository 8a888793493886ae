use log::{debug, info};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::TraceError;

/// Runs the system traceroute utility as a child process.
///
/// One invocation spawns one process. There is no retry here; the caller
/// decides whether to suggest alternate targets after a failure.
pub struct TraceInvoker {
    program: String,
    max_hops: u8,
    timeout: Duration,
}

impl TraceInvoker {
    pub fn new(max_hops: u8, timeout: Duration) -> Self {
        Self {
            program: "traceroute".to_string(),
            max_hops,
            timeout,
        }
    }

    /// Override the traced program (used by tests to stand in fake binaries)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Trace the path to `target`, returning raw stdout.
    ///
    /// The command is tuned for latency: one probe per hop, a one-second
    /// per-hop wait, numeric-only output, and a bounded hop count. Partial
    /// traces are useful, so any run that produced stdout succeeds even on a
    /// non-zero exit.
    pub async fn run(&self, target: &str) -> Result<String, TraceError> {
        info!("Starting traceroute to {}", target);

        let mut cmd = Command::new(&self.program);
        cmd.args(["-w", "1", "-q", "1", "-n", "-m"])
            .arg(self.max_hops.to_string())
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TraceError::ToolUnavailable
            } else {
                TraceError::TraceFailed {
                    status: None,
                    stderr: e.to_string(),
                }
            }
        })?;

        // Timeout expiry drops the child future; kill_on_drop reaps the
        // process so a stuck trace never outlives the run.
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(TraceError::TraceFailed {
                    status: None,
                    stderr: e.to_string(),
                });
            }
            Err(_) => return Err(TraceError::TraceTimeout(self.timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !stdout.trim().is_empty() {
            if !output.status.success() {
                debug!(
                    "traceroute exited with {:?} but produced output; using partial trace",
                    output.status.code()
                );
            }
            return Ok(stdout);
        }

        Err(TraceError::TraceFailed {
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoker(program: &str) -> TraceInvoker {
        TraceInvoker::new(15, Duration::from_secs(5)).with_program(program)
    }

    #[tokio::test]
    async fn test_missing_tool_reported() {
        let result = invoker("georoute-no-such-binary").run("example.com").await;
        assert!(matches!(result, Err(TraceError::ToolUnavailable)));
    }

    #[tokio::test]
    async fn test_stdout_accepted_regardless_of_flags() {
        // echo ignores the traceroute flags and prints them back
        let output = invoker("echo").run("example.com").await.unwrap();
        assert!(output.contains("example.com"));
        assert!(output.contains("-n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_without_output_fails() {
        let result = invoker("false").run("example.com").await;
        match result {
            Err(TraceError::TraceFailed { .. }) => {}
            other => panic!("expected TraceFailed, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_slow_trace() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-trace");
        {
            let mut f = std::fs::File::create(&script).unwrap();
            writeln!(f, "#!/bin/sh\nsleep 30").unwrap();
        }
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let invoker = TraceInvoker::new(15, Duration::from_millis(200))
            .with_program(script.to_string_lossy().into_owned());
        let result = invoker.run("example.com").await;
        assert!(matches!(result, Err(TraceError::TraceTimeout(_))));
    }
}
