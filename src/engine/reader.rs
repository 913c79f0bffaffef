//! Engine stream reader tasks.
//!
//! One task per output stream. Each drives a [`FramedRead`] over the stream
//! using [`EngineLineCodec`] and turns lines into [`EngineEvent`]s sent to
//! the session owner.
//!
//! # Stdout
//!
//! | Line                               | Handling                              |
//! |------------------------------------|---------------------------------------|
//! | empty                              | Skipped                               |
//! | not starting with `{`              | Logged verbatim at `INFO`             |
//! | unparsable JSON                    | Logged at `ERROR` with the raw line   |
//! | JSON without `gameId`              | Logged verbatim at `DEBUG`            |
//! | JSON with `gameId`, fields missing | Logged at `ERROR` with the raw line   |
//! | complete record                    | [`EngineEvent::Record`]               |
//!
//! # Stderr
//!
//! Every line is logged under the `engine_stderr` target; lines mentioning
//! `error` are escalated to `ERROR`. Lines starting with `tuning`, `ready`,
//! or `starting` are also forwarded as [`EngineEvent::Status`].
//!
//! A bad line never stops a reader. On end of stream while the process
//! reference is still held, the reader waits for the process to exit,
//! classifies the death, and emits [`EngineEvent::EngineDied`].

use std::sync::LazyLock;
use std::time::Duration;

use futures_util::StreamExt;
use regex::RegexSet;
use serde_json::Value;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::codec::EngineLineCodec;
use super::process::{Liveness, ProcessHandle};
use super::record::AnalysisRecord;
use super::EngineEvent;
use crate::{AppError, Result};

/// Delay between exit polls after a stream reached EOF.
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

const ERROR_PATTERN: usize = 0;
const STATUS_PATTERN: usize = 1;

static STDERR_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([r"(?i)error", r"(?i)^\s*(tuning|ready|starting)"])
        .unwrap_or_else(|_| RegexSet::empty())
});

/// Classification of one stdout line.
#[derive(Debug, Clone, PartialEq)]
pub enum StdoutLine {
    /// Empty or whitespace-only.
    Blank,
    /// Plain diagnostic text.
    Diagnostic(String),
    /// A JSON object that belongs to no game.
    Unscoped(Value),
    /// A complete game record.
    Record(Box<AnalysisRecord>),
}

/// Classification of one stderr line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrLine {
    /// Ordinary engine chatter.
    Chatter,
    /// A line reporting an error.
    Error,
    /// Startup progress worth showing to the user.
    Status,
}

/// Parse a single stdout line.
///
/// # Errors
///
/// - [`AppError::Protocol`]`("malformed json: …")`: the line starts with `{`
///   but is not valid JSON.
/// - [`AppError::Protocol`]`("incomplete record: …")`: the object has a
///   `gameId` but lacks a required field.
pub fn parse_stdout_line(line: &str) -> Result<StdoutLine> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(StdoutLine::Blank);
    }
    if !line.starts_with('{') {
        return Ok(StdoutLine::Diagnostic(line.to_owned()));
    }

    let value: Value = serde_json::from_str(line)?;
    if value.get("gameId").is_none() {
        return Ok(StdoutLine::Unscoped(value));
    }

    let record = AnalysisRecord::from_value(value)
        .map_err(|e| AppError::Protocol(format!("incomplete record: {e}")))?;
    Ok(StdoutLine::Record(Box::new(record)))
}

/// Classify a single stderr line.
#[must_use]
pub fn classify_stderr_line(line: &str) -> StderrLine {
    let matches = STDERR_PATTERNS.matches(line);
    if matches.matched(ERROR_PATTERN) {
        StderrLine::Error
    } else if matches.matched(STATUS_PATTERN) {
        StderrLine::Status
    } else {
        StderrLine::Chatter
    }
}

/// Stdout reader task.
///
/// # Errors
///
/// Returns `Ok(())` on EOF, cancellation, or when the event channel closes.
pub async fn run_stdout_reader<R>(
    stdout: R,
    process: ProcessHandle,
    event_tx: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    run_lines("stdout", stdout, process, event_tx, cancel, |line| {
        match parse_stdout_line(&line) {
            Ok(StdoutLine::Blank) => None,
            Ok(StdoutLine::Diagnostic(text)) => {
                info!(target: "engine", "{text}");
                None
            }
            Ok(StdoutLine::Unscoped(value)) => {
                debug!(target: "engine", "{value}");
                None
            }
            Ok(StdoutLine::Record(record)) => Some(EngineEvent::Record { raw: line, record }),
            Err(e) => {
                error!(error = %e, raw_line = %line, "failed to parse engine output, skipping line");
                None
            }
        }
    })
    .await
}

/// Stderr reader task.
///
/// # Errors
///
/// Returns `Ok(())` on EOF, cancellation, or when the event channel closes.
pub async fn run_stderr_reader<R>(
    stderr: R,
    process: ProcessHandle,
    event_tx: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    run_lines("stderr", stderr, process, event_tx, cancel, |line| {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match classify_stderr_line(line) {
            StderrLine::Error => {
                error!(target: "engine_stderr", "{line}");
                None
            }
            StderrLine::Status => {
                info!(target: "engine_stderr", "{line}");
                Some(EngineEvent::Status(line.to_owned()))
            }
            StderrLine::Chatter => {
                info!(target: "engine_stderr", "{line}");
                None
            }
        }
    })
    .await
}

/// Shared read loop: frame lines, hand each to `on_line`, forward events.
async fn run_lines<R, F>(
    stream_name: &'static str,
    stream: R,
    process: ProcessHandle,
    event_tx: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
    mut on_line: F,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
    F: FnMut(String) -> Option<EngineEvent> + Send,
{
    let mut framed = FramedRead::new(stream, EngineLineCodec::new());

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(stream = stream_name, "engine reader: cancellation received, stopping");
                break;
            }

            item = framed.next() => {
                match item {
                    None => {
                        debug!(stream = stream_name, "engine reader: EOF detected");
                        await_death(stream_name, &process, &event_tx, &cancel).await;
                        break;
                    }

                    Some(Err(e)) => {
                        warn!(stream = stream_name, error = %e, "engine reader: IO error");
                        await_death(stream_name, &process, &event_tx, &cancel).await;
                        break;
                    }

                    Some(Ok(line)) => {
                        if let Some(event) = on_line(line) {
                            if event_tx.send(event).await.is_err() {
                                debug!(stream = stream_name, "engine reader: event_tx closed, stopping");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// After EOF: wait for the process to exit and report its death once.
///
/// Returns immediately if no process is held, which is the case after
/// shutdown or when the other reader has already reported the death.
async fn await_death(
    stream_name: &'static str,
    process: &ProcessHandle,
    event_tx: &mpsc::Sender<EngineEvent>,
    cancel: &CancellationToken,
) {
    loop {
        match process.reap("") {
            Liveness::Released => return,
            Liveness::Dead(death) => {
                debug!(stream = stream_name, class = ?death.class, "engine reader: engine exited");
                let event = EngineEvent::EngineDied {
                    class: death.class,
                    message: death.message,
                };
                if event_tx.send(event).await.is_err() {
                    debug!(
                        stream = stream_name,
                        "engine reader: event_tx closed before EngineDied could be delivered"
                    );
                }
                return;
            }
            Liveness::Running => {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(EXIT_POLL_INTERVAL) => {}
                }
            }
        }
    }
}
