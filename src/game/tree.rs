//! Arena-backed move tree for a single game.
//!
//! Nodes live in a `Vec` owned by the tree and refer to each other by
//! [`NodeId`]. Ownership flows strictly root-to-leaf; a node's parent is a
//! plain index used for traversal only. Nodes are never removed or
//! reordered, so arena order is also the order in which nodes were added.

use super::analysis::Analysis;
use super::moves::{Move, Player};
use super::scoring::Scorer;
use crate::{AppError, Result};

/// Index of a node inside its [`GameTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One position in the game.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    mv: Option<Move>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    main_child: Option<NodeId>,
    analysis: Option<Analysis>,
    depth: usize,
}

impl Node {
    /// The move leading to this node; `None` only for the root.
    #[must_use]
    pub fn mv(&self) -> Option<&Move> {
        self.mv.as_ref()
    }

    /// Parent node; `None` only for the root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in the order they were added.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The child on the most recently synchronized or played line.
    #[must_use]
    pub fn main_child(&self) -> Option<NodeId> {
        self.main_child
    }

    /// Attached engine analysis.
    #[must_use]
    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    /// Whether analysis has been attached.
    #[must_use]
    pub fn analysis_exists(&self) -> bool {
        self.analysis.is_some()
    }

    /// Whether the node was reached by a pass.
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.mv.is_some_and(|m| m.is_pass())
    }

    /// Number of moves from the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Game-level properties stored on the root.
#[derive(Debug, Clone, PartialEq)]
pub struct RootProperties {
    /// Board width.
    pub width: u32,
    /// Board height.
    pub height: u32,
    /// Compensation points for White.
    pub komi: f64,
    /// Ruleset exactly as the engine reported it, serialized as JSON.
    pub rules: String,
    /// Black player's name.
    pub black_player: String,
    /// White player's name.
    pub white_player: String,
    /// Black setup stones in SGF coordinates.
    pub black_stones: Vec<String>,
    /// White setup stones in SGF coordinates.
    pub white_stones: Vec<String>,
    /// Final result once the game has ended (`B+3.5`, `W+R`).
    pub result: Option<String>,
}

impl RootProperties {
    /// Setup stones for `player` in SGF coordinates.
    #[must_use]
    pub fn placements(&self, player: Player) -> &[String] {
        match player {
            Player::Black => &self.black_stones,
            Player::White => &self.white_stones,
        }
    }
}

/// A game: root properties, the move tree, and a current-node cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct GameTree {
    properties: RootProperties,
    nodes: Vec<Node>,
    current: NodeId,
}

impl GameTree {
    /// Create a tree holding only the root.
    #[must_use]
    pub fn new(properties: RootProperties) -> Self {
        Self {
            properties,
            nodes: vec![Node {
                mv: None,
                parent: None,
                children: Vec::new(),
                main_child: None,
                analysis: None,
                depth: 0,
            }],
            current: NodeId(0),
        }
    }

    /// Root properties.
    #[must_use]
    pub fn properties(&self) -> &RootProperties {
        &self.properties
    }

    /// Record the final result on the root.
    pub fn set_result(&mut self, result: String) {
        self.properties.result = Some(result);
    }

    /// The root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Total number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// All node ids in the order they were added.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// The node currently shown.
    #[must_use]
    pub fn current_node(&self) -> NodeId {
        self.current
    }

    /// The node at the cursor.
    #[must_use]
    pub fn current(&self) -> &Node {
        &self.nodes[self.current.0]
    }

    /// The most recently added node.
    #[must_use]
    pub fn last_added_node(&self) -> NodeId {
        NodeId(self.nodes.len() - 1)
    }

    /// Move the cursor to `id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` if `id` is not a node of this tree.
    pub fn set_current_node(&mut self, id: NodeId) -> Result<()> {
        if id.0 >= self.nodes.len() {
            return Err(AppError::Sync(format!("node {} is not in the tree", id.0)));
        }
        self.current = id;
        Ok(())
    }

    /// Attach analysis to `id`, replacing any earlier attachment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` if `id` is not a node of this tree.
    pub fn set_analysis(&mut self, id: NodeId, analysis: Analysis) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or_else(|| AppError::Sync(format!("node {} is not in the tree", id.0)))?;
        node.analysis = Some(analysis);
        Ok(())
    }

    /// Walk `moves` from the root, reusing matching children and appending
    /// the rest. Returns the node reached after the last move.
    ///
    /// Every move is validated against the board before anything is added,
    /// so a bad list leaves the tree untouched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sync` if a move lies outside the board.
    pub fn sync_branch(&mut self, moves: &[Move]) -> Result<NodeId> {
        for mv in moves {
            mv.sgf(self.properties.width, self.properties.height)?;
        }

        let mut node = self.root();
        for mv in moves {
            node = self.child_with_move(node, *mv);
        }
        Ok(node)
    }

    /// Play `mv` from the current node and move the cursor onto it.
    pub fn play(&mut self, mv: Move) -> NodeId {
        let node = self.child_with_move(self.current, mv);
        self.current = node;
        node
    }

    /// Advance the cursor up to `steps` moves along the main line.
    /// Returns how many steps were taken.
    pub fn redo(&mut self, steps: usize) -> usize {
        let mut taken = 0;
        while taken < steps {
            let Some(next) = self.nodes[self.current.0].main_child else {
                break;
            };
            self.current = next;
            taken += 1;
        }
        taken
    }

    /// The player to move at the cursor.
    #[must_use]
    pub fn next_player(&self) -> Player {
        match self.current().mv {
            Some(mv) => mv.player.opponent(),
            None if !self.properties.black_stones.is_empty()
                && self.properties.white_stones.is_empty() =>
            {
                Player::White
            }
            None => Player::Black,
        }
    }

    /// Moves from the root to `id`, in play order.
    #[must_use]
    pub fn moves_to(&self, id: NodeId) -> Vec<Move> {
        let mut moves = Vec::new();
        let mut cursor = self.node(id);
        while let Some(node) = cursor {
            if let Some(mv) = node.mv {
                moves.push(mv);
            }
            cursor = node.parent.and_then(|p| self.node(p));
        }
        moves.reverse();
        moves
    }

    /// Whether the cursor sits on a finished position: a resignation, or a
    /// pass answering a pass.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        let node = self.current();
        match node.mv {
            Some(mv) if mv.is_resign() => true,
            Some(mv) if mv.is_pass() => node
                .parent
                .and_then(|p| self.node(p))
                .is_some_and(Node::is_pass),
            _ => false,
        }
    }

    /// The game result, once the cursor is terminal and `scorer` can
    /// produce one.
    #[must_use]
    pub fn end_result(&self, scorer: &dyn Scorer) -> Option<String> {
        if self.is_terminal() {
            scorer.score(self)
        } else {
            None
        }
    }

    fn child_with_move(&mut self, parent: NodeId, mv: Move) -> NodeId {
        let existing = self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child.0].mv == Some(mv));
        if let Some(child) = existing {
            self.nodes[parent.0].main_child = Some(child);
            return child;
        }

        let id = NodeId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(Node {
            mv: Some(mv),
            parent: Some(parent),
            children: Vec::new(),
            main_child: None,
            analysis: None,
            depth,
        });
        let parent_node = &mut self.nodes[parent.0];
        parent_node.children.push(id);
        parent_node.main_child = Some(id);
        id
    }
}
