//! Session model and lifecycle helpers.

use crate::game::GameTree;

/// Lifecycle state of a buffered engine game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Receiving engine updates, waiting to be shown.
    Buffered,
    /// The session currently on display.
    Displayed,
    /// Result known; shown until the result display time elapses.
    FinishedPendingEvict,
    /// Removed from the buffer.
    Evicted,
}

/// One engine game mirrored into a local move tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Engine-assigned game identifier.
    pub id: String,
    /// The game's move tree.
    pub tree: GameTree,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Whether the game should be written out when it leaves the buffer.
    pub flagged_for_save: bool,
}

impl Session {
    /// Construct a buffered session around `tree`.
    #[must_use]
    pub fn new(id: String, tree: GameTree) -> Self {
        Self {
            id,
            tree,
            state: SessionState::Buffered,
            flagged_for_save: false,
        }
    }

    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self.state, next),
            (SessionState::Buffered, SessionState::Displayed)
                | (
                    SessionState::Displayed,
                    SessionState::FinishedPendingEvict | SessionState::Evicted
                )
                | (SessionState::FinishedPendingEvict, SessionState::Evicted)
        )
    }

    /// Move to `next` if the transition is permitted; returns whether it was.
    pub fn transition_to(&mut self, next: SessionState) -> bool {
        if self.state == next {
            return true;
        }
        if self.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    /// Whether the session may still be changed by engine updates.
    #[must_use]
    pub fn accepts_updates(&self) -> bool {
        matches!(self.state, SessionState::Buffered | SessionState::Displayed)
    }
}
