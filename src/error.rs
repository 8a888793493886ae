use std::time::Duration;
use thiserror::Error;

/// Pipeline-halting failures.
///
/// Per-hop and per-service failures are deliberately *not* here: they are
/// contained where they occur and downgraded to a sentinel or an omission.
/// Only the trace itself failing (or yielding nothing) stops a run.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The traceroute binary is not installed or not on PATH.
    #[error("traceroute command not found - install it (e.g. `apt install traceroute`)")]
    ToolUnavailable,

    /// The trace process ran longer than the configured timeout.
    #[error("traceroute timed out after {0:?}")]
    TraceTimeout(Duration),

    /// The trace process exited without producing any usable output.
    #[error("traceroute produced no usable output{}", exit_detail(.status))]
    TraceFailed {
        status: Option<i32>,
        stderr: String,
    },

    /// Extraction found no hop addresses in the trace output.
    #[error("no hop addresses found in traceroute output")]
    NoHopsFound,
}

fn exit_detail(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" (exit code {})", code),
        None => String::new(),
    }
}

impl TraceError {
    /// Remediation hint shown to the user alongside the error.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::ToolUnavailable => "georoute shells out to the system traceroute utility",
            Self::TraceTimeout(_) => {
                "try increasing --timeout, or trace a different target"
            }
            Self::TraceFailed { .. } => {
                "the target may block traceroute probes, or the network may be restricted"
            }
            Self::NoHopsFound => {
                "every hop may be filtered; try a different target or protocol settings"
            }
        }
    }
}

/// Well-known targets suggested when a trace fails outright.
pub fn alternative_targets() -> &'static [&'static str] {
    &[
        "google.com",
        "github.com",
        "amazon.com",
        "microsoft.com",
        "apple.com",
        "netflix.com",
        "cloudflare.com",
        "wikipedia.org",
    ]
}
