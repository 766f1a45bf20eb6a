use std::time::Instant;

use super::cursor::{caret_stops, next_stop, normalize, position_before, previous_stop};
use super::*;
use crate::theme::Theme;
use crate::typeset::TerminalTypesetter;

fn tree_of(value: MathNode) -> MathTree {
    MathTree::from_value(&value).unwrap()
}

fn at(tree: &MathTree, path: &[usize]) -> Position {
    Position::After(tree.descend(tree.root(), path).unwrap())
}

/// x = 1/□ y² ³√z (w)
fn mixed() -> MathNode {
    MathNode::document(vec![
        MathNode::identifier("x"),
        MathNode::operator("="),
        MathNode::fraction(
            MathNode::row(vec![MathNode::number("1")]),
            MathNode::row(vec![]),
        ),
        MathNode::superscript(MathNode::identifier("y"), MathNode::number("2")),
        MathNode::radical(
            MathNode::row(vec![MathNode::identifier("z")]),
            MathNode::row(vec![MathNode::number("3")]),
        ),
        MathNode::row(vec![MathNode::identifier("w")]),
    ])
}

fn rendered_editor(value: MathNode) -> MathEditor {
    let mut editor = MathEditor::new(
        Box::new(TerminalTypesetter::new(Theme::default())),
        EditorConfig::default(),
    );
    editor.set_value(&value).unwrap();
    editor.tick(Instant::now());
    editor
}

#[test]
fn stops_follow_reading_order() {
    let tree = tree_of(mixed());
    let expected = vec![
        Position::None,
        at(&tree, &[0]),
        at(&tree, &[1]),
        at(&tree, &[2, 0]),
        at(&tree, &[2, 0, 0]),
        at(&tree, &[2, 1]),
        at(&tree, &[2]),
        at(&tree, &[3, 0]),
        at(&tree, &[3, 1]),
        at(&tree, &[3]),
        at(&tree, &[4, 1]),
        at(&tree, &[4, 1, 0]),
        at(&tree, &[4, 0]),
        at(&tree, &[4, 0, 0]),
        at(&tree, &[4]),
        at(&tree, &[5, 0]),
    ];
    assert_eq!(caret_stops(&tree), expected);
}

#[test]
fn traversal_is_invertible_away_from_the_ends() {
    let tree = tree_of(mixed());
    let stops = caret_stops(&tree);
    let last = stops.len() - 1;
    for (idx, &stop) in stops.iter().enumerate() {
        if idx < last {
            assert_eq!(previous_stop(&tree, next_stop(&tree, stop)), stop, "{idx}");
        } else {
            assert_eq!(next_stop(&tree, stop), stop);
        }
        if idx > 0 {
            assert_eq!(next_stop(&tree, previous_stop(&tree, stop)), stop, "{idx}");
        } else {
            assert_eq!(previous_stop(&tree, stop), stop);
        }
    }
}

#[test]
fn wrapper_positions_normalize_to_a_stop() {
    let mut tree = tree_of(mixed());
    let wrapper = tree.descend(tree.root(), &[5]).unwrap();
    assert_eq!(normalize(&tree, Position::After(wrapper)), at(&tree, &[5, 0]));
    assert_eq!(
        normalize(&tree, Position::After(tree.root())),
        at(&tree, &[5, 0])
    );

    let x = tree.descend(tree.root(), &[0]).unwrap();
    assert!(tree.remove(x));
    assert_eq!(normalize(&tree, Position::After(x)), Position::None);
}

#[test]
fn position_before_skips_whole_constructs() {
    let tree = tree_of(mixed());
    let fraction = tree.descend(tree.root(), &[2]).unwrap();
    let radical = tree.descend(tree.root(), &[4]).unwrap();
    assert_eq!(position_before(&tree, fraction), at(&tree, &[1]));
    assert_eq!(position_before(&tree, radical), at(&tree, &[3]));
    let x = tree.descend(tree.root(), &[0]).unwrap();
    assert_eq!(position_before(&tree, x), Position::None);
}

#[test]
fn editor_walks_every_stop_and_back() {
    let mut editor = rendered_editor(mixed());
    let stops = caret_stops(editor.tree());

    assert!(editor.move_to_start());
    let mut forward = vec![editor.position()];
    while editor.move_right() {
        forward.push(editor.position());
    }
    assert_eq!(forward, stops);

    let mut backward = vec![editor.position()];
    while editor.move_left() {
        backward.push(editor.position());
    }
    backward.reverse();
    assert_eq!(backward, stops);
}

#[test]
fn click_targets_numerator_and_denominator() {
    // Layout: "a" on the bar row, numerator above, denominator below.
    let mut editor = rendered_editor(MathNode::document(vec![
        MathNode::identifier("a"),
        MathNode::fraction(
            MathNode::row(vec![MathNode::number("1")]),
            MathNode::row(vec![MathNode::number("2")]),
        ),
    ]));
    let tree = editor.tree().clone();

    assert_eq!(editor.click(2, 0), at(&tree, &[1, 0, 0]));
    assert_eq!(editor.click(2, 2), at(&tree, &[1, 1, 0]));
    assert_eq!(editor.click(0, 1), at(&tree, &[0]));
    // Below everything: the nearest row is the denominator.
    assert_eq!(editor.click(2, 10), at(&tree, &[1, 1, 0]));
}

#[test]
fn click_on_empty_slot_lands_at_its_start() {
    let mut editor = rendered_editor(MathNode::document(vec![MathNode::fraction(
        MathNode::row(vec![]),
        MathNode::row(vec![MathNode::number("2")]),
    )]));
    let tree = editor.tree().clone();
    assert_eq!(editor.click(1, 0), at(&tree, &[0, 0]));
}

#[test]
fn click_reaches_radical_index_and_base() {
    // Index one row up at column 0, base on the sign's row at column 2.
    let mut editor = rendered_editor(MathNode::document(vec![MathNode::radical(
        MathNode::row(vec![MathNode::identifier("x")]),
        MathNode::row(vec![MathNode::number("3")]),
    )]));
    let tree = editor.tree().clone();
    assert_eq!(editor.click(0, 0), at(&tree, &[0, 1, 0]));
    assert_eq!(editor.click(2, 1), at(&tree, &[0, 0, 0]));
}

#[test]
fn empty_wrapper_normalizes_to_stop_in_front() {
    let tree = tree_of(MathNode::document(vec![
        MathNode::identifier("a"),
        MathNode::row(vec![]),
        MathNode::fraction(
            MathNode::row(vec![MathNode::row(vec![])]),
            MathNode::row(vec![]),
        ),
    ]));
    let wrapper = tree.descend(tree.root(), &[1]).unwrap();
    assert_eq!(normalize(&tree, Position::After(wrapper)), at(&tree, &[0]));

    let nested = tree.descend(tree.root(), &[2, 0, 0]).unwrap();
    assert_eq!(normalize(&tree, Position::After(nested)), at(&tree, &[2, 0]));
}

#[test]
fn equal_midpoint_distance_goes_to_closer_leading_edge() {
    // "  x  " over "─────" over " 123 ": both midpoints sit at column 2.5
    // and the bar row is one line away from either.
    let mut editor = rendered_editor(MathNode::document(vec![MathNode::fraction(
        MathNode::row(vec![MathNode::identifier("x")]),
        MathNode::row(vec![MathNode::number("123")]),
    )]));
    let tree = editor.tree().clone();
    let x = tree.descend(tree.root(), &[0, 0, 0]).unwrap();
    let digits = tree.descend(tree.root(), &[0, 1, 0]).unwrap();
    let geometry = editor.geometry().unwrap();
    assert_eq!(geometry.rect(x), Some(Rect::new(2, 0, 1, 1)));
    assert_eq!(geometry.rect(digits), Some(Rect::new(1, 2, 3, 1)));

    // Right of both midpoints: "x" starts closer, so the caret goes after it.
    assert_eq!(editor.click(3, 1), Position::After(x));
    // Left of both: "123" starts closer, caret lands in front of it.
    assert_eq!(editor.click(0, 1), at(&tree, &[0, 1]));
}
