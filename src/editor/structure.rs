use super::cursor::{caret_stops, normalize, position_before_in};
use super::kind::{Arity, NodeKind, Placement};
use super::position::Position;
use super::tree::{MathTree, NodeId};
use super::value::MathNode;
use crate::config::PlacementRules;

// ============================================================================
// Insertion
// ============================================================================

/// Insert `value` at `position` and return the new caret position.
///
/// Where the node lands depends on the placement rule for the kind of the
/// node `position` names: rows take it as their first child, the root as
/// its last child, anything else gets it as next sibling. The returned
/// position is `move_to` (a child-index path into the inserted subtree)
/// when that resolves, the inserted node otherwise, mapped onto a caret
/// stop: an inserted wrapper row puts the caret behind its content.
///
/// `value` must already be a valid fragment.
pub fn insert(
    tree: &mut MathTree,
    position: Position,
    value: &MathNode,
    move_to: Option<&[usize]>,
    rules: &PlacementRules,
) -> Position {
    let (parent, index) = insertion_point(tree, position, rules);
    let inserted = tree.graft(parent, index, value);
    tracing::trace!(
        target: "mathpad::editor",
        kind = ?value.kind,
        ?position,
        "inserted node"
    );
    let target = move_to
        .and_then(|path| tree.descend(inserted, path))
        .map(Position::After)
        .unwrap_or(Position::After(inserted));
    normalize(tree, target)
}

fn insertion_point(
    tree: &mut MathTree,
    position: Position,
    rules: &PlacementRules,
) -> (NodeId, usize) {
    let root = tree.root();
    let Position::After(id) = position else {
        return (root, 0);
    };
    let Some(kind) = tree.kind(id) else {
        return (root, 0);
    };
    if is_wrapper_row(tree, id) {
        // Only slot rows take the caret; a wrapper row stands for the stop
        // it normalizes to.
        return match normalize(tree, position) {
            Position::After(stop) if stop != id => {
                insertion_point(tree, Position::After(stop), rules)
            }
            _ => (root, 0),
        };
    }
    match rules.placement(kind) {
        Placement::Prepend if kind.arity() == Arity::Variadic => (id, 0),
        Placement::Append if kind.arity() == Arity::Variadic => {
            (id, tree.children_of(id).len())
        }
        _ => after_point(tree, id),
    }
}

fn after_point(tree: &mut MathTree, id: NodeId) -> (NodeId, usize) {
    let Some(parent) = tree.parent_of(id) else {
        let root = tree.root();
        return (root, tree.children_of(root).len());
    };
    if tree.is_slot(id) {
        // A slot cannot grow a sibling; turn it into a row holding the old
        // content and append there.
        if let Some(row) = tree.wrap_in_row(id) {
            return (row, 1);
        }
    }
    let index = tree.index_in_parent(id).map(|idx| idx + 1).unwrap_or(0);
    (parent, index)
}

// ============================================================================
// Removal
// ============================================================================

enum Detached {
    /// The subtree rooted here was removed.
    Removed(NodeId),
    /// A slot was emptied and now holds this fresh row.
    Emptied(NodeId),
}

/// Remove the element right before the caret.
///
/// Wrapper rows left empty are removed as well, up to the first slot or
/// the root. A removed slot is replaced by an empty row instead, keeping
/// fixed containers intact. Returns the caret position now in front of the
/// removed material; a no-op returns `position` unchanged.
pub fn apply_backspace(tree: &mut MathTree, position: Position) -> Position {
    let position = normalize(tree, position);
    let Position::After(id) = position else {
        return position;
    };
    if tree.kind(id) == Some(NodeKind::Row) {
        // Start of a slot row: nothing inside the row precedes the caret.
        return position;
    }
    let stops = caret_stops(tree);
    let top = removal_root(tree, id);
    let before = position_before_in(tree, &stops, top);
    match detach(tree, top) {
        Some(Detached::Emptied(row)) => Position::After(row),
        Some(Detached::Removed(_)) => before,
        None => position,
    }
}

/// Remove the element right after the caret. The caret does not move.
pub fn apply_delete(tree: &mut MathTree, position: Position) -> Position {
    let position = normalize(tree, position);
    let target = match position {
        Position::None => tree.visual_children(tree.root()).first().copied(),
        Position::After(id) if tree.kind(id) == Some(NodeKind::Row) => {
            tree.visual_children(id).first().copied()
        }
        Position::After(id) => next_element(tree, id),
    };
    if let Some(target) = target.and_then(|target| first_element(tree, target)) {
        let top = removal_root(tree, target);
        detach(tree, top);
    }
    position
}

/// The element a caret in front of `id` sees first: wrapper rows are
/// transparent, so descend into them. An empty wrapper row is its own
/// element.
fn first_element(tree: &MathTree, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    while is_wrapper_row(tree, current) {
        match tree.visual_children(current).first() {
            Some(&child) => current = child,
            None => break,
        }
    }
    tree.contains(current).then_some(current)
}

/// Element following `id` in reading order, stepping out of wrapper rows
/// that end at `id`.
fn next_element(tree: &MathTree, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    loop {
        if let Some(next) = tree.visual_next_sibling(current) {
            return Some(next);
        }
        let parent = tree.parent_of(current)?;
        if !is_wrapper_row(tree, parent) {
            return None;
        }
        current = parent;
    }
}

/// Highest ancestor that removing `id` would leave empty.
fn removal_root(tree: &MathTree, id: NodeId) -> NodeId {
    let mut top = id;
    loop {
        let Some(parent) = tree.parent_of(top) else {
            return top;
        };
        if !is_wrapper_row(tree, parent) || tree.children_of(parent).len() != 1 {
            return top;
        }
        top = parent;
    }
}

fn is_wrapper_row(tree: &MathTree, id: NodeId) -> bool {
    tree.kind(id) == Some(NodeKind::Row) && !tree.is_slot(id)
}

fn detach(tree: &mut MathTree, id: NodeId) -> Option<Detached> {
    if id == tree.root() || !tree.contains(id) {
        return None;
    }
    if tree.is_slot(id) {
        let row = tree.replace(id, &MathNode::row(Vec::new()))?;
        tracing::trace!(target: "mathpad::editor", "emptied slot");
        return Some(Detached::Emptied(row));
    }
    tree.remove(id);
    tracing::trace!(target: "mathpad::editor", "removed subtree");
    Some(Detached::Removed(id))
}

// ============================================================================
// Scripts
// ============================================================================

/// Attach a sub- or superscript to the element before the caret, which
/// becomes the base. Without such an element an empty script construct is
/// inserted instead. The caret ends up in the first empty slot.
pub fn attach_script(
    tree: &mut MathTree,
    position: Position,
    kind: NodeKind,
    rules: &PlacementRules,
) -> Position {
    let position = normalize(tree, position);
    let base = match position {
        Position::After(id) if tree.kind(id) != Some(NodeKind::Row) => Some(id),
        _ => None,
    };
    let Some(base) = base else {
        let value = script_value(kind, MathNode::row(Vec::new()));
        return insert(tree, position, &value, Some(&[0]), rules);
    };
    let Some(base_value) = tree.to_value(base) else {
        return position;
    };
    let value = script_value(kind, base_value);
    let Some(replaced) = tree.replace(base, &value) else {
        return position;
    };
    tree.descend(replaced, &[1])
        .map(Position::After)
        .unwrap_or(Position::After(replaced))
}

fn script_value(kind: NodeKind, base: MathNode) -> MathNode {
    let empty = || MathNode::row(Vec::new());
    match kind {
        NodeKind::Subscript => MathNode::subscript(base, empty()),
        NodeKind::SubSup => MathNode::subsup(base, empty(), empty()),
        _ => MathNode::superscript(base, empty()),
    }
}
