//! Minimal game model: moves, the move tree, analysis, and scoring.
//!
//! Covers what the relay needs to mirror engine games: building trees from
//! the engine's move lists, attaching analysis, walking the cursor forward,
//! and recognizing finished games.

pub mod analysis;
pub mod moves;
pub mod scoring;
pub mod tree;

pub use analysis::{Analysis, CandidateMove, RootInfo};
pub use moves::{Move, Player, Vertex};
pub use scoring::{AnalysisScorer, Scorer};
pub use tree::{GameTree, Node, NodeId, RootProperties};
