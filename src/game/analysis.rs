//! Engine analysis attached to a position.

use serde::{Deserialize, Serialize};

/// One candidate move considered by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMove {
    /// GTP vertex of the candidate (`D4`, `pass`).
    #[serde(rename = "move")]
    pub vertex: String,
    /// Rank among the candidates; 0 is the engine's top choice.
    pub order: u32,
    /// Win probability for the player to move.
    #[serde(default)]
    pub winrate: Option<f64>,
    /// Expected score lead for the player to move.
    #[serde(default)]
    pub score_lead: Option<f64>,
    /// Search visits spent on this candidate.
    #[serde(default)]
    pub visits: Option<u64>,
}

impl CandidateMove {
    /// Whether the candidate is a pass.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.vertex.eq_ignore_ascii_case("pass")
    }
}

/// Evaluation of the position as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootInfo {
    /// Black's win probability.
    #[serde(default)]
    pub winrate: Option<f64>,
    /// Black's expected score lead.
    #[serde(default)]
    pub score_lead: Option<f64>,
    /// Total search visits.
    #[serde(default)]
    pub visits: Option<u64>,
}

/// Analysis payload attached to a single tree node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Candidate moves in the order the engine listed them.
    #[serde(default)]
    pub move_infos: Vec<CandidateMove>,
    /// Whole-position evaluation, when reported.
    #[serde(default)]
    pub root_info: Option<RootInfo>,
}

impl Analysis {
    /// Candidates sorted by rank, best first.
    #[must_use]
    pub fn candidate_moves(&self) -> Vec<&CandidateMove> {
        let mut moves: Vec<&CandidateMove> = self.move_infos.iter().collect();
        moves.sort_by_key(|m| m.order);
        moves
    }

    /// The engine's top choice, if any candidates were reported.
    #[must_use]
    pub fn top_candidate(&self) -> Option<&CandidateMove> {
        self.move_infos.iter().min_by_key(|m| m.order)
    }

    /// Black's score lead from the position evaluation.
    #[must_use]
    pub fn score_lead(&self) -> Option<f64> {
        self.root_info.as_ref().and_then(|info| info.score_lead)
    }
}
