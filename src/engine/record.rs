//! Structured records emitted by the engine on stdout.
//!
//! Each analyzed position arrives as a single JSON object. Only the fields
//! the relay consumes are modelled; everything else is ignored.

use serde::Deserialize;
use serde_json::Value;

use crate::game::{Analysis, Move, Player};
use crate::Result;

/// A `[color, vertex]` pair as sent by the engine, e.g. `["B", "D4"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireMove(pub String, pub String);

impl WireMove {
    /// Convert to a [`Move`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` if the color or vertex is invalid.
    pub fn to_move(&self) -> Result<Move> {
        Move::from_gtp(&self.1, Player::parse(&self.0)?)
    }
}

/// Ruleset descriptor. `komi` is required; the object is kept verbatim.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Rules {
    /// Compensation points for White.
    pub komi: f64,
    raw: Value,
}

impl TryFrom<Value> for Rules {
    type Error = String;

    fn try_from(raw: Value) -> std::result::Result<Self, Self::Error> {
        let komi = raw
            .get("komi")
            .and_then(Value::as_f64)
            .ok_or_else(|| "rules object has no numeric `komi`".to_owned())?;
        Ok(Self { komi, raw })
    }
}

impl Rules {
    /// The ruleset object as the engine sent it, as compact JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.raw.to_string()
    }
}

/// One analyzed position of one engine game.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    /// Engine-assigned game identifier.
    pub game_id: String,
    /// Board width.
    pub board_x_size: u32,
    /// Board height.
    pub board_y_size: u32,
    /// Setup stones.
    #[serde(default)]
    pub initial_stones: Vec<WireMove>,
    /// Ruleset, including komi.
    pub rules: Rules,
    /// Black player's name.
    pub black_player: String,
    /// White player's name.
    pub white_player: String,
    /// Every move of the game so far.
    pub moves: Vec<WireMove>,
    /// 1-based number of the move just analyzed.
    pub turn_number: u32,
    /// The move just made, for logging.
    #[serde(default, rename = "move")]
    pub last_move: Option<WireMove>,
    /// Candidates and position evaluation.
    #[serde(flatten)]
    pub analysis: Analysis,
}

impl AnalysisRecord {
    /// Parse a record from its JSON object.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Protocol` if a required field is missing or has
    /// the wrong type.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// The authoritative move list.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` if any move is malformed.
    pub fn parsed_moves(&self) -> Result<Vec<Move>> {
        self.moves.iter().map(WireMove::to_move).collect()
    }

    /// Setup stones belonging to `player`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` if any stone is malformed.
    pub fn placements(&self, player: Player) -> Result<Vec<Move>> {
        let mut stones = Vec::new();
        for stone in &self.initial_stones {
            let mv = stone.to_move()?;
            if mv.player == player {
                stones.push(mv);
            }
        }
        Ok(stones)
    }

    /// Short description of the last move for logs (`B D4`).
    #[must_use]
    pub fn last_move_text(&self) -> String {
        self.last_move
            .as_ref()
            .map(|m| format!("{} {}", m.0, m.1))
            .unwrap_or_default()
    }
}
