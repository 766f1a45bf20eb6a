use super::MathEditor;
use super::kind::NodeKind;
use super::position::Position;
use super::tree::{MathTree, NodeId};
use crate::render::GeometryMap;

/// Every position the caret can occupy, in reading order.
///
/// The list always starts with `Position::None`. Leaves and fixed
/// containers contribute the position after themselves, slot rows the
/// position at their start; wrapper rows and the root contribute nothing of
/// their own.
pub fn caret_stops(tree: &MathTree) -> Vec<Position> {
    let mut stops = vec![Position::None];
    for child in tree.visual_children(tree.root()) {
        collect_stops(tree, child, &mut stops);
    }
    stops
}

fn collect_stops(tree: &MathTree, id: NodeId, stops: &mut Vec<Position>) {
    let Some(kind) = tree.kind(id) else {
        return;
    };
    match kind {
        NodeKind::Math => {}
        NodeKind::Row => {
            if tree.is_slot(id) {
                stops.push(Position::After(id));
            }
            for child in tree.visual_children(id) {
                collect_stops(tree, child, stops);
            }
        }
        kind if kind.is_leaf() => stops.push(Position::After(id)),
        _ => {
            for child in tree.visual_children(id) {
                collect_stops(tree, child, stops);
            }
            stops.push(Position::After(id));
        }
    }
}

/// Map any position onto the caret stop that shows the same place.
pub fn normalize(tree: &MathTree, position: Position) -> Position {
    let Position::After(id) = position else {
        return Position::None;
    };
    let Some(kind) = tree.kind(id) else {
        return Position::None;
    };
    if tree.is_caret_eligible(id) {
        return position;
    }
    if kind == NodeKind::Math {
        return caret_stops(tree).last().copied().unwrap_or_default();
    }
    tail_position(tree, id).unwrap_or_else(|| stop_in_front(tree, id))
}

/// The caret stop right in front of `id`, found by walking left and up the
/// tree. Works for subtrees without stops of their own, like an empty
/// wrapper row.
fn stop_in_front(tree: &MathTree, id: NodeId) -> Position {
    if let Some(previous) = tree.visual_previous_sibling(id) {
        return normalize(tree, Position::After(previous));
    }
    match tree.parent_of(id) {
        Some(parent) if tree.is_caret_eligible(parent) => Position::After(parent),
        Some(parent) if parent != tree.root() => stop_in_front(tree, parent),
        _ => Position::None,
    }
}

/// The stop directly after the last stop inside `id`, i.e. the caret right
/// behind the subtree. `None` when the subtree has no stops at all.
fn tail_position(tree: &MathTree, id: NodeId) -> Option<Position> {
    let stops = caret_stops(tree);
    stops
        .iter()
        .rposition(|stop| stop.node().is_some_and(|node| tree.is_within(node, id)))
        .map(|idx| stops[idx])
}

/// The caret position immediately in front of the subtree rooted at `id`.
pub fn position_before(tree: &MathTree, id: NodeId) -> Position {
    let stops = caret_stops(tree);
    position_before_in(tree, &stops, id)
}

pub(crate) fn position_before_in(tree: &MathTree, stops: &[Position], id: NodeId) -> Position {
    stops
        .iter()
        .position(|stop| stop.node().is_some_and(|node| tree.is_within(node, id)))
        .and_then(|idx| idx.checked_sub(1))
        .map(|idx| stops[idx])
        .unwrap_or_default()
}

/// One stop to the left, clamped at the start of the document.
pub fn previous_stop(tree: &MathTree, position: Position) -> Position {
    let stops = caret_stops(tree);
    let current = normalize(tree, position);
    match stops.iter().position(|stop| *stop == current) {
        Some(idx) if idx > 0 => stops[idx - 1],
        _ => current,
    }
}

/// One stop to the right, clamped at the end of the document.
pub fn next_stop(tree: &MathTree, position: Position) -> Position {
    let stops = caret_stops(tree);
    let current = normalize(tree, position);
    match stops.iter().position(|stop| *stop == current) {
        Some(idx) if idx + 1 < stops.len() => stops[idx + 1],
        _ => current,
    }
}

/// Translate a point on the display surface into a caret position.
///
/// Candidates are the rendered leaves and empty slot rows. Only those whose
/// rows span `y` are considered, or the nearest ones vertically when none
/// does. The candidate whose horizontal midpoint is closest wins; ties go
/// to the one whose leading edge is closer. Clicking the left half of the
/// winner puts the caret in front of it, the right half behind it.
pub fn hit_test(tree: &MathTree, geometry: &GeometryMap, x: u16, y: u16) -> Position {
    let stops = caret_stops(tree);
    let candidates: Vec<_> = stops
        .iter()
        .filter_map(|stop| stop.node())
        .filter(|&id| is_hit_target(tree, id))
        .filter_map(|id| geometry.rect(id).map(|rect| (id, rect)))
        .collect();
    if candidates.is_empty() {
        return Position::None;
    }

    let Some(nearest_rows) = candidates
        .iter()
        .map(|(_, rect)| vertical_distance(rect.y, rect.height, y))
        .min()
    else {
        return Position::None;
    };

    // Doubled coordinates keep midpoints integral; the pointer sits in the
    // middle of its cell.
    let pointer = u32::from(x) * 2 + 1;
    let Some(&(target, rect)) = candidates
        .iter()
        .filter(|(_, rect)| vertical_distance(rect.y, rect.height, y) == nearest_rows)
        .min_by_key(|(_, rect)| {
            let midpoint = u32::from(rect.x) * 2 + u32::from(rect.width);
            let leading = u32::from(rect.x) * 2;
            (
                midpoint.abs_diff(pointer),
                leading.abs_diff(pointer),
                rect.x,
            )
        })
    else {
        return Position::None;
    };

    let midpoint = u32::from(rect.x) * 2 + u32::from(rect.width);
    if tree.kind(target) == Some(NodeKind::Row) || pointer >= midpoint {
        Position::After(target)
    } else {
        position_before_in(tree, &stops, target)
    }
}

fn is_hit_target(tree: &MathTree, id: NodeId) -> bool {
    match tree.kind(id) {
        Some(NodeKind::Row) => tree.children_of(id).is_empty(),
        Some(kind) => kind.is_leaf(),
        None => false,
    }
}

fn vertical_distance(top: u16, height: u16, y: u16) -> u16 {
    let bottom = top.saturating_add(height.max(1)) - 1;
    if y < top {
        top - y
    } else if y > bottom {
        y - bottom
    } else {
        0
    }
}

impl MathEditor {
    pub fn move_left(&mut self) -> bool {
        let target = previous_stop(&self.tree, self.cursor.position());
        self.move_cursor_to(target)
    }

    pub fn move_right(&mut self) -> bool {
        let target = next_stop(&self.tree, self.cursor.position());
        self.move_cursor_to(target)
    }

    pub fn move_to_start(&mut self) -> bool {
        self.move_cursor_to(Position::None)
    }

    pub fn move_to_end(&mut self) -> bool {
        let target = caret_stops(&self.tree).last().copied().unwrap_or_default();
        self.move_cursor_to(target)
    }

    /// Place the caret at the surface point `(x, y)` and return where it
    /// landed. Without geometry for the current tree (inert editor, render
    /// still in flight or failed) the caret keeps its position.
    pub fn click(&mut self, x: u16, y: u16) -> Position {
        let Some(geometry) = self.current_geometry() else {
            return self.cursor.position();
        };
        let target = hit_test(&self.tree, geometry, x, y);
        tracing::trace!(target: "mathpad::editor", x, y, ?target, "click");
        self.move_cursor_to(target);
        target
    }

    fn move_cursor_to(&mut self, target: Position) -> bool {
        self.note_interaction();
        if target == self.cursor.position() {
            return false;
        }
        self.cursor.set_position(target);
        self.refresh_caret();
        true
    }
}
