//! Players, moves, and coordinate conversions.
//!
//! The engine speaks GTP coordinates (`D4`, `Q16`, `pass`): column letters
//! skip `I` and rows count upward from the bottom edge. Game records use SGF
//! coordinates: two lowercase letters counted from the top-left corner.

use std::fmt::{Display, Formatter};

use crate::{AppError, Result};

/// GTP column letters; `I` is deliberately absent.
const GTP_COLUMNS: &str = "ABCDEFGHJKLMNOPQRSTUVWXYZ";

/// Stone color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    /// Black, moves first.
    Black,
    /// White.
    White,
}

impl Player {
    /// Parse `B`/`W` (case-insensitive, also accepts `black`/`white`).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` for any other text.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "B" | "BLACK" => Ok(Self::Black),
            "W" | "WHITE" => Ok(Self::White),
            other => Err(AppError::Sync(format!("unknown player `{other}`"))),
        }
    }

    /// The other color.
    #[must_use]
    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }

    /// Single-letter SGF/GTP tag.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::Black => 'B',
            Self::White => 'W',
        }
    }
}

/// Where a move was played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vertex {
    /// Zero-based `(x, y)` with `y` counted from the bottom edge.
    Point(u32, u32),
    /// No stone placed.
    Pass,
    /// The player gave up.
    Resign,
}

/// A single move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    /// Who played the move.
    pub player: Player,
    /// Where it was played.
    pub vertex: Vertex,
}

impl Move {
    /// A stone placed at zero-based `(x, y)`.
    #[must_use]
    pub fn at(player: Player, x: u32, y: u32) -> Self {
        Self {
            player,
            vertex: Vertex::Point(x, y),
        }
    }

    /// A pass by `player`.
    #[must_use]
    pub fn pass(player: Player) -> Self {
        Self {
            player,
            vertex: Vertex::Pass,
        }
    }

    /// A resignation by `player`.
    #[must_use]
    pub fn resign(player: Player) -> Self {
        Self {
            player,
            vertex: Vertex::Resign,
        }
    }

    /// Parse a GTP vertex such as `D4` or `pass`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` if the vertex is not valid GTP.
    pub fn from_gtp(vertex: &str, player: Player) -> Result<Self> {
        let vertex = vertex.trim();
        if vertex.eq_ignore_ascii_case("pass") {
            return Ok(Self::pass(player));
        }
        if vertex.eq_ignore_ascii_case("resign") {
            return Ok(Self::resign(player));
        }

        let mut chars = vertex.chars();
        let column = chars
            .next()
            .map(|c| c.to_ascii_uppercase())
            .ok_or_else(|| AppError::Sync("empty move vertex".into()))?;
        let x = GTP_COLUMNS
            .find(column)
            .ok_or_else(|| AppError::Sync(format!("invalid column in vertex `{vertex}`")))?;
        let row_text = chars.as_str();
        if row_text.is_empty() || !row_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::Sync(format!("invalid row in vertex `{vertex}`")));
        }
        let row: u32 = row_text
            .parse()
            .map_err(|_| AppError::Sync(format!("invalid row in vertex `{vertex}`")))?;
        if row == 0 {
            return Err(AppError::Sync(format!("invalid row in vertex `{vertex}`")));
        }

        let x = u32::try_from(x)
            .map_err(|_| AppError::Sync(format!("invalid column in vertex `{vertex}`")))?;
        Ok(Self::at(player, x, row - 1))
    }

    /// Whether this move is a pass.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.vertex == Vertex::Pass
    }

    /// Whether this move is a resignation.
    #[must_use]
    pub fn is_resign(&self) -> bool {
        self.vertex == Vertex::Resign
    }

    /// GTP vertex text (`D4`, `pass`, `resign`).
    #[must_use]
    pub fn gtp(&self) -> String {
        match self.vertex {
            Vertex::Pass => "pass".to_owned(),
            Vertex::Resign => "resign".to_owned(),
            Vertex::Point(x, y) => {
                let column = usize::try_from(x)
                    .ok()
                    .and_then(|x| GTP_COLUMNS.chars().nth(x))
                    .unwrap_or('?');
                format!("{column}{}", y + 1)
            }
        }
    }

    /// SGF coordinate text for a `width` x `height` board; passes and
    /// resignations render empty.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` if the move lies outside the board.
    pub fn sgf(&self, width: u32, height: u32) -> Result<String> {
        let Vertex::Point(x, y) = self.vertex else {
            return Ok(String::new());
        };
        if x >= width || y >= height {
            return Err(AppError::Sync(format!(
                "move {} is outside a {width}x{height} board",
                self.gtp()
            )));
        }
        Ok(format!("{}{}", sgf_letter(x)?, sgf_letter(height - 1 - y)?))
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.player.letter(), self.gtp())
    }
}

/// SGF uses `a..z` then `A..Z` for boards up to 52 lines.
fn sgf_letter(index: u32) -> Result<char> {
    let offset = u8::try_from(index)
        .map_err(|_| AppError::Sync(format!("coordinate {index} too large for sgf")))?;
    match offset {
        0..=25 => Ok(char::from(b'a' + offset)),
        26..=51 => Ok(char::from(b'A' + offset - 26)),
        _ => Err(AppError::Sync(format!(
            "coordinate {index} too large for sgf"
        ))),
    }
}
