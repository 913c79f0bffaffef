//! Display buffer curation.
//!
//! Invoked on a fixed cadence, the [`Curator`] keeps exactly one session on
//! display and drains the buffer:
//!
//! 1. Nothing displayed: pick a session, preferring one whose newest node is
//!    a pass (likely close to the end), otherwise at random.
//! 2. Displayed game over: mark it finished, show the result for a while,
//!    then evict it (saving it if configured).
//! 3. Otherwise step the cursor one move forward at the move interval, or
//!    every tick while the buffer is over its occupancy limit.
//! 4. Nothing to step to for longer than the give-up threshold: evict it.
//!
//! All timing is a comparison of the caller-supplied `now` against the time
//! of the last advance; there are no timers here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use super::model::Session;
use super::store::SessionStore;
use crate::config::{CuratorConfig, RelayConfig};
use crate::game::{CandidateMove, GameTree, Move, Node, Scorer};
use crate::sgf::{sgf_path, SgfWriter};

/// Timing and occupancy limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuratorPolicy {
    /// Buffered sessions above which the displayed one advances every tick.
    pub max_buffer_games: usize,
    /// Minimum delay between two displayed moves.
    pub move_interval: Duration,
    /// How long a result stays on display before eviction.
    pub show_result: Duration,
    /// Idle time after which a session with nothing to show is dropped.
    pub give_up_after: Duration,
}

impl Default for CuratorPolicy {
    fn default() -> Self {
        Self::from(&CuratorConfig::default())
    }
}

impl From<&CuratorConfig> for CuratorPolicy {
    fn from(config: &CuratorConfig) -> Self {
        Self {
            max_buffer_games: config.max_buffer_games,
            move_interval: config.move_interval(),
            show_result: config.show_result(),
            give_up_after: config.give_up_after(),
        }
    }
}

/// Where finished games go.
#[derive(Clone)]
pub struct SaveTarget {
    /// Output directory.
    pub dir: PathBuf,
    /// Serializer used for the record.
    pub writer: Arc<dyn SgfWriter>,
}

impl std::fmt::Debug for SaveTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveTarget").field("dir", &self.dir).finish_non_exhaustive()
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing buffered, nothing displayed.
    Idle,
    /// A session was put on display.
    Selected(String),
    /// The displayed session is not due for a step yet.
    Waiting,
    /// The displayed session's cursor moved one step.
    Advanced(String),
    /// The displayed session has a result and is showing it.
    Finished {
        /// Session id.
        id: String,
        /// Game result.
        result: String,
    },
    /// A finished session was removed after showing its result.
    Evicted {
        /// Session id.
        id: String,
        /// Where the record was written, when saving succeeded.
        saved: Option<PathBuf>,
    },
    /// A stuck session was abandoned.
    GaveUp(String),
}

/// Selects, advances, finishes, and evicts displayed sessions.
pub struct Curator {
    policy: CuratorPolicy,
    scorer: Box<dyn Scorer>,
    save: Option<SaveTarget>,
    last_advance: Instant,
    rng: StdRng,
}

impl std::fmt::Debug for Curator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Curator")
            .field("policy", &self.policy)
            .field("save", &self.save)
            .field("last_advance", &self.last_advance)
            .finish_non_exhaustive()
    }
}

impl Curator {
    /// Create a curator with an entropy-seeded random source.
    #[must_use]
    pub fn new(policy: CuratorPolicy, scorer: Box<dyn Scorer>, save: Option<SaveTarget>) -> Self {
        Self::with_rng(policy, scorer, save, StdRng::from_entropy())
    }

    /// Create a curator with an explicit random source.
    #[must_use]
    pub fn with_rng(
        policy: CuratorPolicy,
        scorer: Box<dyn Scorer>,
        save: Option<SaveTarget>,
        rng: StdRng,
    ) -> Self {
        Self {
            policy,
            scorer,
            save,
            last_advance: Instant::now(),
            rng,
        }
    }

    /// Build a curator from relay configuration.
    #[must_use]
    pub fn from_config(
        config: &RelayConfig,
        scorer: Box<dyn Scorer>,
        writer: Arc<dyn SgfWriter>,
    ) -> Self {
        let save = config.save_sgf.then(|| SaveTarget {
            dir: config.sgf_dir.clone(),
            writer,
        });
        Self::new(CuratorPolicy::from(&config.curator), scorer, save)
    }

    /// The active policy.
    #[must_use]
    pub fn policy(&self) -> &CuratorPolicy {
        &self.policy
    }

    /// When the displayed session last moved (or was selected).
    #[must_use]
    pub fn last_advance(&self) -> Instant {
        self.last_advance
    }

    /// Run one curation step at time `now`.
    pub fn tick(&mut self, store: &mut SessionStore, now: Instant) -> TickOutcome {
        let Some(id) = store.displayed().map(str::to_owned) else {
            return self.select(store, now);
        };
        let since_advance = now.saturating_duration_since(self.last_advance);
        let over_capacity = store.len() > self.policy.max_buffer_games;
        let already_finished = store.is_finished(&id);

        let Some(session) = store.get_mut(&id) else {
            store.clear_displayed();
            return self.select(store, now);
        };

        if let Some(result) = game_ended(&mut session.tree, self.scorer.as_ref()) {
            if already_finished {
                if since_advance > self.policy.show_result {
                    return self.evict_finished(store, &id);
                }
            } else {
                session.tree.set_result(result.clone());
                session.flagged_for_save = self.save.is_some();
                if let Err(err) = store.mark_finished(&id) {
                    warn!(game_id = %id, %err, "failed to mark game finished");
                }
                info!(game_id = %id, %result, "game finished");
                if since_advance > self.policy.show_result {
                    return self.evict_finished(store, &id);
                }
            }
            return TickOutcome::Finished { id, result };
        }

        if since_advance <= self.policy.move_interval && !over_capacity {
            return TickOutcome::Waiting;
        }

        if session.tree.redo(1) == 1 {
            self.last_advance = now;
            return TickOutcome::Advanced(id);
        }

        if since_advance > self.policy.give_up_after {
            info!(
                game_id = %id,
                "giving up on game which appears stuck, finding a new one"
            );
            store.remove(&id);
            return TickOutcome::GaveUp(id);
        }

        TickOutcome::Waiting
    }

    fn select(&mut self, store: &mut SessionStore, now: Instant) -> TickOutcome {
        let ids = store.ids();
        let near_end = store
            .sessions()
            .into_iter()
            .find(|session| newest_node_is_pass(session))
            .map(|session| session.id.clone());
        let Some(id) = near_end.or_else(|| ids.choose(&mut self.rng).cloned()) else {
            return TickOutcome::Idle;
        };

        if let Err(err) = store.set_displayed(&id) {
            warn!(game_id = %id, %err, "failed to display game");
            return TickOutcome::Idle;
        }
        self.last_advance = now;
        info!(game_id = %id, "found new game to show");
        TickOutcome::Selected(id)
    }

    fn evict_finished(&self, store: &mut SessionStore, id: &str) -> TickOutcome {
        let Some(session) = store.remove(id) else {
            return TickOutcome::Idle;
        };
        let saved = self.persist(&session);
        info!(game_id = id, "game finished, finding a new one");
        TickOutcome::Evicted {
            id: id.to_owned(),
            saved,
        }
    }

    /// Write `session` if saving is configured and it is flagged.
    pub fn persist(&self, session: &Session) -> Option<PathBuf> {
        let target = self.save.as_ref().filter(|_| session.flagged_for_save)?;
        let path = sgf_path(&target.dir, &session.id);
        match target.writer.write(&session.tree, &path) {
            Ok(written) => {
                info!(game_id = %session.id, path = %written.display(), "game saved");
                Some(written)
            }
            Err(err) => {
                warn!(game_id = %session.id, %err, "failed to save game");
                None
            }
        }
    }
}

/// End-of-game check for the cursor position.
///
/// When the cursor is on an analyzed pass and the engine's own first choice
/// is also a pass, the answering pass is played so the game can be scored.
pub fn game_ended(tree: &mut GameTree, scorer: &dyn Scorer) -> Option<String> {
    let current = tree.current();
    let engine_passes = current.is_pass()
        && current
            .analysis()
            .and_then(|a| a.top_candidate())
            .is_some_and(CandidateMove::is_pass);
    if engine_passes && !tree.is_terminal() {
        let player = tree.next_player();
        tree.play(Move::pass(player));
    }
    tree.end_result(scorer)
}

fn newest_node_is_pass(session: &Session) -> bool {
    let tree = &session.tree;
    tree.node(tree.last_added_node()).is_some_and(Node::is_pass)
}
