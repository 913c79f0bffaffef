//! Engine process communication.
//!
//! The relay runs the analysis engine as a child process and consumes its two
//! output streams independently:
//!
//! - `command`: command-line construction for the `contribute` invocation.
//! - `codec`: lossy newline framing shared by both streams.
//! - `record`: the structured JSON record the engine prints per analyzed move.
//! - `reader`: one task per stream, turning lines into [`EngineEvent`]s.
//! - `process`: the shared live-process reference and exit classification.
//! - `supervisor`: start, liveness checks, and orderly shutdown.

pub mod codec;
pub mod command;
pub mod process;
pub mod reader;
pub mod record;
pub mod supervisor;

use self::process::ExitClass;
use self::record::AnalysisRecord;

/// Events flowing from the stream readers to the session owner.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A structured record for one engine game.
    Record {
        /// The line as received, kept for error reporting.
        raw: String,
        /// The parsed record.
        record: Box<AnalysisRecord>,
    },
    /// Startup progress text (`tuning`, `ready`, `starting`) for display.
    Status(String),
    /// The engine process exited; carries the classified message.
    EngineDied {
        /// How the process ended.
        class: ExitClass,
        /// Human-readable death report.
        message: String,
    },
}
