//! Engine process supervisor.
//!
//! Spawns the engine with stdout and stderr captured, starts one reader task
//! per stream, answers liveness queries, and shuts everything down in order:
//! - `kill_on_drop(true)` so a dropped supervisor never leaks the engine.
//! - Graceful terminate first (SIGTERM on unix), force-kill after the grace
//!   period.
//! - [`EngineSupervisor::shutdown`] returns only after both readers exited.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn};

use super::command::EngineCommand;
use super::process::ProcessHandle;
use super::reader::{run_stderr_reader, run_stdout_reader};
use super::EngineEvent;
use crate::{AppError, Result};

/// Owns the engine process and its two reader tasks.
#[derive(Debug)]
pub struct EngineSupervisor {
    command: EngineCommand,
    shutdown_grace: Duration,
    process: ProcessHandle,
    readers: Vec<JoinHandle<Result<()>>>,
    cancel: CancellationToken,
}

impl EngineSupervisor {
    /// Create a supervisor; nothing is spawned until [`start`](Self::start).
    #[must_use]
    pub fn new(command: EngineCommand, shutdown_grace: Duration) -> Self {
        Self {
            command,
            shutdown_grace,
            process: ProcessHandle::empty(),
            readers: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// The invocation this supervisor runs.
    #[must_use]
    pub fn command(&self) -> &EngineCommand {
        &self.command
    }

    /// Shared handle to the live process reference.
    #[must_use]
    pub fn process(&self) -> ProcessHandle {
        self.process.clone()
    }

    /// Whether a live process reference is held.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.process.is_held()
    }

    /// Spawn the engine and its reader tasks.
    ///
    /// Starting an already running supervisor is a no-op. A spawn failure is
    /// logged once and leaves the supervisor not started; it is not retried.
    ///
    /// # Errors
    ///
    /// - `AppError::Spawn("failed to start engine …")`: OS spawn failure
    ///   (missing executable, permission denied, …).
    /// - `AppError::Spawn("failed to capture engine …")`: a pipe was not
    ///   created.
    pub fn start(&mut self, event_tx: mpsc::Sender<EngineEvent>) -> Result<()> {
        let span = info_span!("engine_start");
        let _guard = span.enter();

        if self.process.is_held() {
            warn!("engine already running, ignoring start request");
            return Ok(());
        }

        info!(command = %self.command, "starting engine");
        let mut child = Command::new(&self.command.executable)
            .args(self.command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                error!(command = %self.command, %err, "starting engine failed");
                AppError::Spawn(format!("failed to start engine `{}`: {err}", self.command))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Spawn("failed to capture engine stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Spawn("failed to capture engine stderr".into()))?;

        self.process = ProcessHandle::new(child);
        self.cancel = CancellationToken::new();
        self.readers = vec![
            tokio::spawn(run_stdout_reader(
                stdout,
                self.process.clone(),
                event_tx.clone(),
                self.cancel.clone(),
            )),
            tokio::spawn(run_stderr_reader(
                stderr,
                self.process.clone(),
                event_tx,
                self.cancel.clone(),
            )),
        ];

        info!(pid = ?self.process.id(), "engine started");
        Ok(())
    }

    /// Check that the engine is still running.
    ///
    /// See [`ProcessHandle::check_alive`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EngineDied`] when `exception_if_dead` is set and
    /// the engine is not running.
    pub fn check_alive(&self, os_error: &str, exception_if_dead: bool) -> Result<bool> {
        self.process.check_alive(os_error, exception_if_dead)
    }

    /// Terminate the engine and wait for both readers to finish.
    ///
    /// Once this returns, no further reads happen on the engine streams.
    pub async fn shutdown(&mut self) {
        if let Some(mut child) = self.process.release() {
            terminate(&mut child, self.shutdown_grace).await;
        }

        self.cancel.cancel();
        for handle in self.readers.drain(..) {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(%err, "engine reader ended with an error"),
                Err(err) => warn!(%err, "engine reader task failed"),
            }
        }
        info!("engine shut down");
    }
}

/// Ask the process to stop, force-killing it after `grace`.
async fn terminate(child: &mut Child, grace: Duration) {
    request_stop(child);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => info!(?status, "engine exited"),
        Ok(Err(err)) => warn!(%err, "error waiting for engine to exit"),
        Err(_) => {
            warn!("engine did not exit within grace period, forcing kill");
            if let Err(err) = child.kill().await {
                warn!(%err, "failed to force-kill engine");
            }
        }
    }
}

#[cfg(unix)]
fn request_stop(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    if let Err(err) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
        warn!(%err, "failed to send SIGTERM to engine");
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) {
    if let Err(err) = child.start_kill() {
        warn!(%err, "failed to terminate engine");
    }
}
