//! Applies engine records to the session store.
//!
//! A record carries the whole game so far, so applying it is a replay from
//! the root: moves already in the tree are followed, the first missing move
//! and everything after it are appended. Re-delivering a record, or an
//! older prefix of it, changes nothing.

use tracing::debug;

use super::model::Session;
use super::store::SessionStore;
use crate::engine::record::AnalysisRecord;
use crate::game::{GameTree, NodeId, Player, RootProperties};
use crate::{AppError, Result};

/// Largest board side expressible in SGF coordinates.
pub const MAX_BOARD_SIZE: u32 = 52;

/// What applying a record did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new session was created, its cursor on `node`.
    Created {
        /// Node reached by the record's move list.
        node: NodeId,
    },
    /// An existing session was updated.
    Updated {
        /// Node reached by the record's move list.
        node: NodeId,
        /// Nodes appended to the tree.
        added: usize,
    },
    /// The session has finished; the record was ignored.
    Discarded,
    /// The buffer is full; the unseen session was not admitted.
    Refused,
}

/// Apply `record` to `store`.
///
/// # Errors
///
/// Returns `AppError::Sync` if the record is inconsistent (bad board size,
/// malformed move, move off the board). The store is left unchanged.
pub fn synchronize(store: &mut SessionStore, record: &AnalysisRecord) -> Result<SyncOutcome> {
    let game_id = record.game_id.as_str();
    if store.is_finished(game_id) {
        return Ok(SyncOutcome::Discarded);
    }

    let moves = record.parsed_moves()?;

    if let Some(session) = store.get_mut(game_id) {
        if !session.accepts_updates() {
            return Ok(SyncOutcome::Discarded);
        }
        let before = session.tree.len();
        let node = session.tree.sync_branch(&moves)?;
        session.tree.set_analysis(node, record.analysis.clone())?;
        return Ok(SyncOutcome::Updated {
            node,
            added: session.tree.len() - before,
        });
    }

    if !store.has_room() {
        debug!(game_id, "session buffer full, not admitting new game");
        return Ok(SyncOutcome::Refused);
    }

    let mut tree = GameTree::new(root_properties(record)?);
    let node = tree.sync_branch(&moves)?;
    tree.set_analysis(node, record.analysis.clone())?;
    tree.set_current_node(node)?;
    store.insert(Session::new(game_id.to_owned(), tree))?;
    Ok(SyncOutcome::Created { node })
}

/// Root properties for a game first seen in `record`.
///
/// # Errors
///
/// Returns `AppError::Sync` for an unusable board size or setup stone.
pub fn root_properties(record: &AnalysisRecord) -> Result<RootProperties> {
    let (width, height) = (record.board_x_size, record.board_y_size);
    if !(1..=MAX_BOARD_SIZE).contains(&width) || !(1..=MAX_BOARD_SIZE).contains(&height) {
        return Err(AppError::Sync(format!(
            "unsupported board size {width}x{height}"
        )));
    }

    let sgf_stones = |player: Player| -> Result<Vec<String>> {
        record
            .placements(player)?
            .iter()
            .map(|stone| stone.sgf(width, height))
            .collect()
    };

    Ok(RootProperties {
        width,
        height,
        komi: record.rules.komi,
        rules: record.rules.to_json(),
        black_player: record.black_player.clone(),
        white_player: record.white_player.clone(),
        black_stones: sgf_stones(Player::Black)?,
        white_stones: sgf_stones(Player::White)?,
        result: None,
    })
}
