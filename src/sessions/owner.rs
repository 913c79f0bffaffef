//! Session owner task.
//!
//! The only task that touches the [`SessionStore`]. Engine events arrive
//! over an mpsc channel and curator ticks fire on an interval; both run
//! inside the same loop, so store mutations never interleave.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use super::curator::{Curator, TickOutcome};
use super::store::SessionStore;
use super::sync::{synchronize, SyncOutcome};
use crate::display::Presenter;
use crate::engine::record::AnalysisRecord;
use crate::engine::EngineEvent;

/// Exclusive owner of the session store and the curator.
pub struct SessionOwner {
    store: SessionStore,
    curator: Curator,
    presenter: Arc<dyn Presenter>,
    engine_down: CancellationToken,
}

impl std::fmt::Debug for SessionOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOwner")
            .field("store", &self.store)
            .field("curator", &self.curator)
            .finish_non_exhaustive()
    }
}

impl SessionOwner {
    /// Create an owner around an empty or pre-filled store.
    ///
    /// `engine_down` is cancelled when the engine reports its death.
    #[must_use]
    pub fn new(
        store: SessionStore,
        curator: Curator,
        presenter: Arc<dyn Presenter>,
        engine_down: CancellationToken,
    ) -> Self {
        Self {
            store,
            curator,
            presenter,
            engine_down,
        }
    }

    /// Read access to the store.
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Apply one engine event.
    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Record { raw, record } => self.apply_record(&raw, &record),
            EngineEvent::Status(text) => self.presenter.engine_status(&text),
            EngineEvent::EngineDied { class, message } => {
                // The engine explains a deliberate exit on stderr itself.
                if class.should_report() {
                    self.presenter.engine_died(&message);
                } else {
                    info!(%message, "engine exited");
                }
                self.engine_down.cancel();
            }
        }
    }

    fn apply_record(&mut self, raw: &str, record: &AnalysisRecord) {
        debug!(
            game_id = %record.game_id,
            turn = record.turn_number,
            "Game {} Move {}: {}",
            record.game_id,
            record.turn_number,
            record.last_move_text()
        );
        match synchronize(&mut self.store, record) {
            Ok(SyncOutcome::Created { .. }) => {
                info!(game_id = %record.game_id, buffered = self.store.len(), "new game buffered");
                self.presenter.update_state(self.store.displayed_session(), false);
            }
            Ok(SyncOutcome::Updated { .. }) => {
                self.presenter.update_state(self.store.displayed_session(), false);
            }
            Ok(SyncOutcome::Discarded | SyncOutcome::Refused) => {}
            Err(err) => {
                error!(game_id = %record.game_id, %err, line = raw, "failed to apply engine record");
            }
        }
    }

    /// Run one curator step and notify the presenter of visible changes.
    pub fn tick(&mut self, now: std::time::Instant) -> TickOutcome {
        let outcome = self.curator.tick(&mut self.store, now);
        match &outcome {
            TickOutcome::Selected(_) => {
                self.presenter.update_state(self.store.displayed_session(), true);
            }
            TickOutcome::Advanced(_) | TickOutcome::Finished { .. } => {
                self.presenter.update_state(self.store.displayed_session(), false);
            }
            TickOutcome::Evicted { .. } | TickOutcome::GaveUp(_) => {
                self.presenter.update_state(None, true);
            }
            TickOutcome::Idle | TickOutcome::Waiting => {}
        }
        outcome
    }

    /// Empty the store, persisting every session flagged for saving.
    /// Returns how many were written.
    pub fn teardown(&mut self) -> usize {
        let flagged = self.store.teardown();
        let saved = flagged
            .iter()
            .filter_map(|session| self.curator.persist(session))
            .count();
        info!(flagged = flagged.len(), saved, "session store torn down");
        saved
    }
}

/// Spawn the owner loop.
///
/// Runs until `cancel` fires or the event channel closes, then tears the
/// store down. The returned handle yields the owner so callers can inspect
/// the final state.
#[must_use]
pub fn spawn_session_owner(
    mut owner: SessionOwner,
    mut rx: mpsc::Receiver<EngineEvent>,
    tick_interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<SessionOwner> {
    let span = info_span!("session_owner");
    tokio::spawn(
        async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + tick_interval, tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("session owner shutting down");
                        break;
                    }
                    maybe_event = rx.recv() => {
                        if let Some(event) = maybe_event {
                            owner.handle_event(event);
                        } else {
                            info!("engine event channel closed");
                            break;
                        }
                    }
                    tick = ticker.tick() => {
                        owner.tick(tick.into_std());
                    }
                }
            }
            owner.teardown();
            owner
        }
        .instrument(span),
    )
}
