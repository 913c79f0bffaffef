//! SGF file writer.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tracing::debug;

use super::SgfWriter;
use crate::game::{GameTree, Node, NodeId, Player, Vertex};
use crate::{AppError, Result};

/// Application tag written to the `AP` property.
const APPLICATION: &str = concat!(env!("CARGO_PKG_NAME"), ":", env!("CARGO_PKG_VERSION"));

/// Writes games as SGF files, creating parent directories as needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSgfWriter;

impl SgfWriter for FileSgfWriter {
    fn write(&self, tree: &GameTree, path: &Path) -> Result<PathBuf> {
        let text = to_sgf(tree, Utc::now().date_naive())?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Sgf(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        fs::write(path, text)
            .map_err(|e| AppError::Sgf(format!("failed to write {}: {e}", path.display())))?;
        debug!(path = %path.display(), nodes = tree.len(), "game record written");
        Ok(path.to_path_buf())
    }
}

/// Serialize `tree` as an SGF collection holding one game.
///
/// # Errors
///
/// Returns `AppError::Sgf` if a move cannot be expressed on the board.
pub fn to_sgf(tree: &GameTree, date: NaiveDate) -> Result<String> {
    let props = tree.properties();
    let mut out = String::from("(;GM[1]FF[4]CA[UTF-8]");
    push_property(&mut out, "AP", APPLICATION);
    push_property(&mut out, "DT", &date.format("%Y-%m-%d").to_string());
    let size = if props.width == props.height {
        props.width.to_string()
    } else {
        format!("{}:{}", props.width, props.height)
    };
    push_property(&mut out, "SZ", &size);
    push_property(&mut out, "KM", &props.komi.to_string());
    push_property(&mut out, "RU", &props.rules);
    push_property(&mut out, "PB", &props.black_player);
    push_property(&mut out, "PW", &props.white_player);
    if let Some(result) = &props.result {
        push_property(&mut out, "RE", result);
    }
    for player in [Player::Black, Player::White] {
        let stones = props.placements(player);
        if !stones.is_empty() {
            let _ = write!(out, "A{}", player.letter());
            for stone in stones {
                let _ = write!(out, "[{stone}]");
            }
        }
    }

    let root = tree.root();
    let children = node(tree, root)?.children().to_vec();
    write_variations(tree, &children, &mut out)?;
    out.push_str(")\n");
    Ok(out)
}

/// Write the line starting at `start`, opening variations at branch points.
fn write_sequence(tree: &GameTree, start: NodeId, out: &mut String) -> Result<()> {
    let mut id = start;
    loop {
        let current = node(tree, id)?;
        write_move(tree, current, out)?;
        match current.children() {
            [] => return Ok(()),
            [only] => id = *only,
            many => return write_variations(tree, many, out),
        }
    }
}

fn write_variations(tree: &GameTree, children: &[NodeId], out: &mut String) -> Result<()> {
    match children {
        [] => Ok(()),
        [only] => write_sequence(tree, *only, out),
        many => {
            for child in many {
                out.push('(');
                write_sequence(tree, *child, out)?;
                out.push(')');
            }
            Ok(())
        }
    }
}

fn write_move(tree: &GameTree, current: &Node, out: &mut String) -> Result<()> {
    out.push(';');
    let Some(mv) = current.mv() else {
        return Ok(());
    };
    if mv.vertex == Vertex::Resign {
        push_property(out, "C", &format!("{} resigned", mv.player.letter()));
        return Ok(());
    }
    let props = tree.properties();
    let coord = mv
        .sgf(props.width, props.height)
        .map_err(|e| AppError::Sgf(e.to_string()))?;
    let _ = write!(out, "{}[{coord}]", mv.player.letter());
    Ok(())
}

fn node(tree: &GameTree, id: NodeId) -> Result<&Node> {
    tree.node(id)
        .ok_or_else(|| AppError::Sgf(format!("node {} missing from tree", id.index())))
}

fn push_property(out: &mut String, key: &str, value: &str) {
    let _ = write!(out, "{key}[{}]", escape(value));
}

/// Escape `]` and `\` inside a property value.
#[must_use]
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
