//! Game result computation.

use super::tree::GameTree;

/// Computes the result of a game whose cursor sits on a terminal position.
pub trait Scorer: Send + Sync {
    /// SGF-style result (`B+3.5`, `W+R`, `Draw`, `?`), or `None` if the
    /// position is not finished.
    fn score(&self, tree: &GameTree) -> Option<String>;
}

/// SGF result for a finished game whose winner is unknown.
pub const UNKNOWN_RESULT: &str = "?";

/// Scores from the engine's own evaluation of the final position.
///
/// Uses the score lead attached to the terminal node, falling back to its
/// parent when the terminal node was synthesized and carries no analysis.
/// A finished game without any lead scores as [`UNKNOWN_RESULT`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisScorer;

impl Scorer for AnalysisScorer {
    fn score(&self, tree: &GameTree) -> Option<String> {
        let node = tree.current();
        if let Some(mv) = node.mv().filter(|m| m.is_resign()) {
            return Some(format!("{}+R", mv.player.opponent().letter()));
        }

        let lead = node.analysis().and_then(|a| a.score_lead()).or_else(|| {
            node.parent()
                .and_then(|p| tree.node(p))
                .and_then(|parent| parent.analysis())
                .and_then(|a| a.score_lead())
        });
        match lead {
            Some(lead) => Some(format_lead(lead)),
            None if tree.is_terminal() => Some(UNKNOWN_RESULT.to_owned()),
            None => None,
        }
    }
}

/// Render Black's lead as an SGF result, rounded to the nearest half point.
#[must_use]
pub fn format_lead(lead: f64) -> String {
    let rounded = (lead * 2.0).round() / 2.0;
    if rounded > 0.0 {
        format!("B+{rounded}")
    } else if rounded < 0.0 {
        format!("W+{}", -rounded)
    } else {
        "Draw".to_owned()
    }
}
