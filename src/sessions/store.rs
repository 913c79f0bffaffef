//! Authoritative store of buffered engine games.
//!
//! Owned by exactly one task (see [`crate::sessions::owner`]); nothing here
//! is synchronized. Invariants kept by the methods below:
//! - the displayed id, when set, names a session present in the store;
//! - every finished id was a key of the store when it was marked;
//! - the store never holds more than its capacity.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::model::{Session, SessionState};
use crate::{AppError, Result};

/// Active sessions, finished ids, and the displayed pointer.
#[derive(Debug, Clone)]
pub struct SessionStore {
    active: HashMap<String, Session>,
    finished: HashSet<String>,
    displayed: Option<String>,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl SessionStore {
    /// An empty store admitting at most `capacity` sessions.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            active: HashMap::new(),
            finished: HashSet::new(),
            displayed: None,
            capacity,
        }
    }

    /// An empty store with no admission limit.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Maximum number of active sessions.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no sessions are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Whether a new session can be admitted.
    #[must_use]
    pub fn has_room(&self) -> bool {
        self.active.len() < self.capacity
    }

    /// Whether `id` is an active session.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.active.contains_key(id)
    }

    /// Look up an active session.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.active.get(id)
    }

    /// Look up an active session for mutation.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.active.get_mut(id)
    }

    /// Active session ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.active.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Active sessions in id order.
    #[must_use]
    pub fn sessions(&self) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self.active.values().collect();
        sessions.sort_by(|a, b| a.id.cmp(&b.id));
        sessions
    }

    /// Add a new session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` if the id is already active or finished, or
    /// if the store is full.
    pub fn insert(&mut self, session: Session) -> Result<()> {
        if self.active.contains_key(&session.id) {
            return Err(AppError::Sync(format!(
                "session {} already exists",
                session.id
            )));
        }
        if self.finished.contains(&session.id) {
            return Err(AppError::Sync(format!(
                "session {} has already finished",
                session.id
            )));
        }
        if !self.has_room() {
            return Err(AppError::Sync(format!(
                "session buffer full ({} sessions)",
                self.capacity
            )));
        }
        self.active.insert(session.id.clone(), session);
        Ok(())
    }

    /// Remove a session, clearing the displayed pointer if it named it.
    pub fn remove(&mut self, id: &str) -> Option<Session> {
        let mut session = self.active.remove(id)?;
        session.state = SessionState::Evicted;
        if self.displayed.as_deref() == Some(id) {
            self.displayed = None;
        }
        debug!(game_id = id, remaining = self.active.len(), "session removed");
        Some(session)
    }

    /// Whether `id` has finished and no longer accepts updates.
    #[must_use]
    pub fn is_finished(&self, id: &str) -> bool {
        self.finished.contains(id)
    }

    /// Number of finished ids.
    #[must_use]
    pub fn finished_count(&self) -> usize {
        self.finished.len()
    }

    /// Mark an active session finished.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` if `id` is not active.
    pub fn mark_finished(&mut self, id: &str) -> Result<()> {
        let session = self
            .active
            .get_mut(id)
            .ok_or_else(|| AppError::Sync(format!("session {id} is not active")))?;
        session.transition_to(SessionState::FinishedPendingEvict);
        self.finished.insert(id.to_owned());
        Ok(())
    }

    /// The displayed session id.
    #[must_use]
    pub fn displayed(&self) -> Option<&str> {
        self.displayed.as_deref()
    }

    /// The displayed session.
    #[must_use]
    pub fn displayed_session(&self) -> Option<&Session> {
        self.displayed.as_deref().and_then(|id| self.active.get(id))
    }

    /// The displayed session, for mutation.
    pub fn displayed_session_mut(&mut self) -> Option<&mut Session> {
        let id = self.displayed.as_deref()?;
        self.active.get_mut(id)
    }

    /// Point the display at `id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` if `id` is not active.
    pub fn set_displayed(&mut self, id: &str) -> Result<()> {
        let session = self
            .active
            .get_mut(id)
            .ok_or_else(|| AppError::Sync(format!("session {id} is not active")))?;
        session.transition_to(SessionState::Displayed);
        self.displayed = Some(id.to_owned());
        Ok(())
    }

    /// Clear the displayed pointer.
    pub fn clear_displayed(&mut self) {
        self.displayed = None;
    }

    /// Empty the store, returning the sessions flagged for saving.
    pub fn teardown(&mut self) -> Vec<Session> {
        self.displayed = None;
        let mut flagged: Vec<Session> = self
            .active
            .drain()
            .map(|(_, session)| session)
            .filter(|session| session.flagged_for_save)
            .collect();
        flagged.sort_by(|a, b| a.id.cmp(&b.id));
        for session in &mut flagged {
            session.state = SessionState::Evicted;
        }
        flagged
    }
}
