//! Presentation boundary.
//!
//! The relay does not render anything itself. It reports state changes to a
//! [`Presenter`]; [`TracingPresenter`] turns them into log lines.

use tracing::{debug, error, info};

use crate::sessions::model::Session;

/// Receives state-change notifications from the session owner.
pub trait Presenter: Send + Sync {
    /// The store changed. `displayed` is the session on display, if any;
    /// `redraw_board` is set when a different session was just selected.
    fn update_state(&self, displayed: Option<&Session>, redraw_board: bool);

    /// Engine startup progress text.
    fn engine_status(&self, text: &str);

    /// The engine process died.
    fn engine_died(&self, message: &str);
}

/// Presenter that logs what a display would show.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn update_state(&self, displayed: Option<&Session>, redraw_board: bool) {
        let Some(session) = displayed else {
            return;
        };
        let tree = &session.tree;
        let current = tree.current();
        let last_move = current.mv().map(ToString::to_string).unwrap_or_default();
        if redraw_board {
            info!(
                game_id = %session.id,
                black = %tree.properties().black_player,
                white = %tree.properties().white_player,
                "showing game"
            );
        }
        debug!(
            game_id = %session.id,
            move_number = current.depth(),
            last_move = %last_move,
            "display updated"
        );
    }

    fn engine_status(&self, text: &str) {
        info!(status = text, "engine status");
    }

    fn engine_died(&self, message: &str) {
        error!(reason = message, "engine stopped");
    }
}
