//! Buffered engine games.
//!
//! - `model`: one session and its lifecycle state.
//! - `store`: the session map, finished set, and displayed pointer.
//! - `sync`: applies engine records to the store.
//! - `curator`: picks, advances, finishes, and evicts the displayed session.
//! - `owner`: the single task that owns the store and drives the curator.

pub mod curator;
pub mod model;
pub mod owner;
pub mod store;
pub mod sync;

pub use curator::{Curator, CuratorPolicy, SaveTarget, TickOutcome};
pub use model::{Session, SessionState};
pub use owner::{spawn_session_owner, SessionOwner};
pub use store::SessionStore;
pub use sync::{synchronize, SyncOutcome};
