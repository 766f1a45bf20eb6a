use ratatui::layout::Rect;

use super::cursor::normalize;
use super::kind::NodeKind;
use super::tree::{MathTree, NodeId};
use crate::render::GeometryMap;

/// Logical caret location.
///
/// `After(node)` means "immediately after `node`" except for slot rows,
/// where it means "at the start of that row", and for the root, where it
/// means "at the end of the document". A wrapper row stands for the caret
/// stop right behind its content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Position {
    /// Start of the document (also the only position in an empty one).
    #[default]
    None,
    After(NodeId),
}

impl Position {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Position::None => None,
            Position::After(id) => Some(id),
        }
    }

    pub fn is_none(self) -> bool {
        matches!(self, Position::None)
    }

    /// A position is valid while the node it names is still in the tree.
    pub fn is_valid_in(self, tree: &MathTree) -> bool {
        match self {
            Position::None => true,
            Position::After(id) => tree.contains(id),
        }
    }
}

/// Holds the current position and the caret rectangle derived from it.
#[derive(Clone, Debug, Default)]
pub struct Cursor {
    position: Position,
    caret: Option<Rect>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Store `position` as-is. Keeping it valid is up to the caller.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Caret rectangle from the last `update`, if the geometry knew the node.
    pub fn caret(&self) -> Option<Rect> {
        self.caret
    }

    /// Recompute the caret from the current position and geometry.
    pub fn update(&mut self, tree: &MathTree, geometry: &GeometryMap) {
        self.caret = caret_rect(tree, geometry, self.position);
    }

    pub(crate) fn clear_caret(&mut self) {
        self.caret = None;
    }
}

pub(crate) fn caret_rect(tree: &MathTree, geometry: &GeometryMap, position: Position) -> Option<Rect> {
    let document = geometry.document_area()?;
    let Position::After(id) = position else {
        return Some(leading_edge(document));
    };
    match tree.kind(id)? {
        NodeKind::Math => Some(trailing_edge(document)),
        NodeKind::Row if tree.is_slot(id) => geometry.rect(id).map(leading_edge),
        NodeKind::Row => match normalize(tree, position) {
            stop if stop == position => None,
            stop => caret_rect(tree, geometry, stop),
        },
        _ => geometry.rect(id).map(trailing_edge),
    }
}

fn leading_edge(area: Rect) -> Rect {
    Rect::new(area.x, area.y, 0, area.height.max(1))
}

fn trailing_edge(area: Rect) -> Rect {
    Rect::new(area.x.saturating_add(area.width), area.y, 0, area.height.max(1))
}
