//! Shared handle to the live engine process and exit classification.
//!
//! Both stream readers and the supervisor hold a [`ProcessHandle`]. Whoever
//! first observes the exit while raising takes the child out of the handle
//! under the same lock, so a death is classified and reported exactly once;
//! later observers find the handle released.

use std::process::ExitStatus;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::process::Child;
use tracing::{error, warn};

use crate::{AppError, Result};

/// Windows `STATUS_DLL_NOT_FOUND`, reported when a required library is missing.
pub const MISSING_LIBRARY_EXIT_CODE: u32 = 0xC000_0135;

/// Exit code the engine uses for a deliberate, already-reported exit.
pub const DELIBERATE_EXIT_CODE: i32 = 1;

/// How the engine process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    /// A required dynamic library could not be loaded.
    MissingLibrary,
    /// The engine exited on purpose and has already explained why.
    Deliberate,
    /// Any other exit; carries the raw code when there is one.
    Unexpected(Option<i32>),
}

impl ExitClass {
    /// Classify a raw exit code (`None` when terminated by a signal).
    #[must_use]
    pub fn from_code(code: Option<i32>) -> Self {
        match code {
            Some(c) if c.to_ne_bytes() == MISSING_LIBRARY_EXIT_CODE.to_ne_bytes() => {
                Self::MissingLibrary
            }
            Some(DELIBERATE_EXIT_CODE) => Self::Deliberate,
            other => Self::Unexpected(other),
        }
    }

    /// Whether the death should be logged; deliberate exits already were.
    #[must_use]
    pub fn should_report(self) -> bool {
        !matches!(self, Self::Deliberate)
    }
}

/// A classified engine death.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDeath {
    /// Classification of the exit.
    pub class: ExitClass,
    /// Human-readable explanation.
    pub message: String,
}

impl EngineDeath {
    /// Build the death report for a finished process.
    ///
    /// `os_error` is extra context prepended to the status for unexpected
    /// exits. A deliberate exit gets its own message so it is never mistaken
    /// for a crash.
    #[must_use]
    pub fn from_status(status: Option<ExitStatus>, os_error: &str) -> Self {
        let code = status.and_then(|s| s.code());
        let class = ExitClass::from_code(code);
        let message = match class {
            ExitClass::MissingLibrary => "engine is missing a required DLL".to_owned(),
            ExitClass::Deliberate => {
                format!("engine exited after reporting its own error: status {DELIBERATE_EXIT_CODE}")
            }
            ExitClass::Unexpected(_) => {
                let detail = match (code, status.and_then(signal_of)) {
                    (Some(c), _) => format!("status {c}"),
                    (None, Some(sig)) => format!("terminated by signal {sig}"),
                    (None, None) => "status unknown".to_owned(),
                };
                unexpected_message(&format!("{os_error}{detail}"))
            }
        };
        Self { class, message }
    }

    /// Convert into the error surfaced to callers.
    #[must_use]
    pub fn into_error(self) -> AppError {
        AppError::EngineDied(self.message)
    }
}

/// Message for a death that has no further classification.
#[must_use]
pub fn unexpected_message(detail: &str) -> String {
    format!("engine died unexpectedly: {detail}")
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}

/// Result of polling the process without classifying it.
#[derive(Debug)]
pub enum Liveness {
    /// Still running.
    Running,
    /// Exited; the handle has been released and the death classified.
    Dead(EngineDeath),
    /// No process is held (never started, already reaped, or shut down).
    Released,
}

/// Cloneable, shared "live process reference".
#[derive(Debug, Clone, Default)]
pub struct ProcessHandle {
    inner: Arc<Mutex<Option<Child>>>,
}

impl ProcessHandle {
    /// Wrap a freshly spawned child.
    #[must_use]
    pub fn new(child: Child) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(child))),
        }
    }

    /// A handle that holds no process.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether a process reference is currently held.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.lock().is_some()
    }

    /// Process id of the held child, if it is still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.lock().as_ref().and_then(Child::id)
    }

    /// Drop the reference and hand the child to the caller.
    #[must_use]
    pub fn release(&self) -> Option<Child> {
        self.lock().take()
    }

    /// Poll the process, releasing and classifying it if it has exited.
    ///
    /// The death is logged here unless it was deliberate.
    #[must_use]
    pub fn reap(&self, os_error: &str) -> Liveness {
        let mut guard = self.lock();
        let Some(child) = guard.as_mut() else {
            return Liveness::Released;
        };

        let status = match child.try_wait() {
            Ok(None) => return Liveness::Running,
            Ok(Some(status)) => Some(status),
            Err(err) => {
                warn!(%err, "failed to poll engine process status");
                None
            }
        };
        *guard = None;
        drop(guard);

        let death = EngineDeath::from_status(status, os_error);
        if death.class.should_report() {
            error!(class = ?death.class, "{}", death.message);
        }
        Liveness::Dead(death)
    }

    /// Check that the engine is still running.
    ///
    /// With `exception_if_dead` unset this only polls: a dead process yields
    /// `Ok(false)` and the reference is kept. With it set, a dead process is
    /// classified, reported, released, and surfaced as an error.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EngineDied`] when `exception_if_dead` is set and
    /// the process has exited or no process is held.
    pub fn check_alive(&self, os_error: &str, exception_if_dead: bool) -> Result<bool> {
        if !exception_if_dead {
            let mut guard = self.lock();
            return Ok(guard
                .as_mut()
                .is_some_and(|child| matches!(child.try_wait(), Ok(None))));
        }

        match self.reap(os_error) {
            Liveness::Running => Ok(true),
            Liveness::Dead(death) => Err(death.into_error()),
            Liveness::Released => Err(AppError::EngineDied(unexpected_message(os_error))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Child>> {
        // A panic while holding this lock cannot leave the Option half-updated.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
