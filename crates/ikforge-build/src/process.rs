//! Bounded execution of external tools.
//!
//! Each stage (generator, compiler, linker) runs as a child process with an
//! optional wall-clock budget and a [`CancelToken`]. stdout/stderr are drained
//! on background threads so a chatty child never blocks on a full pipe while
//! the parent polls for exit.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ikforge_core::{ForgeError, Stage};
use thiserror::Error;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Shared flag that asks running stages to stop.
///
/// Clones observe the same flag. Cancellation is checked between stages and
/// while waiting on child processes; a cancelled child is killed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` for `stage` if cancellation was requested.
    pub fn check(&self, stage: Stage) -> Result<(), ForgeError> {
        if self.is_cancelled() {
            Err(ForgeError::Cancelled { stage })
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// run_bounded
// ---------------------------------------------------------------------------

/// Captured result of a child that ran to completion.
///
/// Output is kept as raw bytes; callers decide how strictly to decode it.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Why a child did not run to completion.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("failed to wait for child: {0}")]
    Wait(io::Error),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled")]
    Cancelled,
}

impl RunError {
    /// Convert into the pipeline error for `stage`.
    ///
    /// Spawn and wait failures become `on_failure(message)` so each stage can
    /// report them with its own variant.
    pub fn into_forge(self, stage: Stage, on_failure: impl FnOnce(String) -> ForgeError) -> ForgeError {
        match self {
            Self::TimedOut(limit) => ForgeError::Timeout {
                stage,
                secs: limit.as_secs(),
            },
            Self::Cancelled => ForgeError::Cancelled { stage },
            other @ (Self::Spawn { .. } | Self::Wait(_)) => on_failure(other.to_string()),
        }
    }
}

/// Run `cmd` to completion, killing it on timeout or cancellation.
///
/// `timeout` of `None` waits indefinitely. Stdin is closed.
pub fn run_bounded(
    cmd: &mut Command,
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> Result<ProcessOutput, RunError> {
    if cancel.is_cancelled() {
        return Err(RunError::Cancelled);
    }

    let program = cmd.get_program().to_string_lossy().into_owned();
    debug!(%program, args = ?cmd.get_args().collect::<Vec<_>>(), "spawning");

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| RunError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if cancel.is_cancelled() {
                    warn!(%program, "cancelling child");
                    kill(&mut child);
                    return Err(RunError::Cancelled);
                }
                if let Some(limit) = timeout.filter(|&limit| started.elapsed() >= limit) {
                    warn!(%program, ?limit, "child exceeded time budget");
                    kill(&mut child);
                    return Err(RunError::TimedOut(limit));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                kill(&mut child);
                return Err(RunError::Wait(e));
            }
        }
    };

    debug!(%program, ?status, elapsed = ?started.elapsed(), "child exited");
    Ok(ProcessOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

/// Convert a stage budget in seconds to a timeout. Zero means unbounded.
pub fn budget(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
