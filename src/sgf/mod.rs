//! Game record persistence.
//!
//! Finished games are handed to an [`SgfWriter`] when they leave the display
//! buffer. [`writer::FileSgfWriter`] writes standard SGF files.

pub mod writer;

use std::path::{Path, PathBuf};

use crate::game::GameTree;
use crate::Result;

/// Persists a complete game tree.
pub trait SgfWriter: Send + Sync {
    /// Write `tree` to `path`, returning the path actually written.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sgf` if the record cannot be serialized or written.
    fn write(&self, tree: &GameTree, path: &Path) -> Result<PathBuf>;
}

/// Output path for a game: `<dir>/<game id>.sgf`.
///
/// Path separators in the id are replaced so the file always lands in `dir`.
#[must_use]
pub fn sgf_path(dir: &Path, game_id: &str) -> PathBuf {
    let file_stem: String = game_id
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    dir.join(format!("{file_stem}.sgf"))
}
