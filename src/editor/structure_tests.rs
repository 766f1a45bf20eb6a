use super::markup::to_markup;
use super::structure::{apply_backspace, apply_delete, attach_script, insert};
use super::*;
use crate::config::PlacementRules;

fn tree_of(value: MathNode) -> MathTree {
    MathTree::from_value(&value).unwrap()
}

fn node(tree: &MathTree, path: &[usize]) -> NodeId {
    tree.descend(tree.root(), path).unwrap()
}

fn at(tree: &MathTree, path: &[usize]) -> Position {
    Position::After(node(tree, path))
}

fn frac(numerator: Vec<MathNode>, denominator: Vec<MathNode>) -> MathNode {
    MathNode::fraction(MathNode::row(numerator), MathNode::row(denominator))
}

#[test]
fn insert_into_row_prepends() {
    let mut tree = tree_of(MathNode::document(vec![frac(
        vec![MathNode::number("2")],
        vec![],
    )]));
    let numerator = at(&tree, &[0, 0]);
    let rules = PlacementRules::default();

    let position = insert(&mut tree, numerator, &MathNode::number("1"), None, &rules);
    assert_eq!(position, at(&tree, &[0, 0, 0]));
    assert_eq!(
        to_markup(&tree),
        "<math><mfrac><mrow><mn>1</mn><mn>2</mn></mrow><mrow></mrow></mfrac></math>"
    );
}

#[test]
fn insert_at_root_appends_and_none_prepends() {
    let mut tree = tree_of(MathNode::document(vec![MathNode::identifier("b")]));
    let rules = PlacementRules::default();
    let root = Position::After(tree.root());

    insert(&mut tree, root, &MathNode::identifier("c"), None, &rules);
    insert(&mut tree, Position::None, &MathNode::identifier("a"), None, &rules);
    assert_eq!(
        to_markup(&tree),
        "<math><mi>a</mi><mi>b</mi><mi>c</mi></math>"
    );
}

#[test]
fn insert_after_leaf_and_after_construct() {
    let mut tree = tree_of(MathNode::document(vec![
        MathNode::identifier("a"),
        frac(vec![], vec![]),
    ]));
    let rules = PlacementRules::default();

    let after_a = at(&tree, &[0]);
    insert(&mut tree, after_a, &MathNode::operator("+"), None, &rules);
    let after_frac = at(&tree, &[2]);
    insert(&mut tree, after_frac, &MathNode::operator("="), None, &rules);
    assert_eq!(
        to_markup(&tree),
        "<math><mi>a</mi><mo>+</mo><mfrac><mrow></mrow><mrow></mrow></mfrac><mo>=</mo></math>"
    );
}

#[test]
fn placement_rules_can_be_overridden() {
    let mut tree = tree_of(MathNode::document(vec![frac(
        vec![MathNode::number("1")],
        vec![],
    )]));
    let rules = PlacementRules::new().with(NodeKind::Row, Placement::Append);
    let numerator = at(&tree, &[0, 0]);

    insert(&mut tree, numerator, &MathNode::number("2"), None, &rules);
    assert_eq!(
        to_markup(&tree),
        "<math><mfrac><mrow><mn>1</mn><mn>2</mn></mrow><mrow></mrow></mfrac></math>"
    );
}

#[test]
fn insert_after_leaf_slot_wraps_it_in_a_row() {
    let mut tree = tree_of(MathNode::document(vec![MathNode::superscript(
        MathNode::identifier("x"),
        MathNode::number("2"),
    )]));
    let base = at(&tree, &[0, 0]);
    let rules = PlacementRules::default();

    let position = insert(&mut tree, base, &MathNode::identifier("y"), None, &rules);
    assert_eq!(position, at(&tree, &[0, 0, 1]));
    assert_eq!(
        to_markup(&tree),
        "<math><msup><mrow><mi>x</mi><mi>y</mi></mrow><mn>2</mn></msup></math>"
    );
    assert!(tree.is_slot(node(&tree, &[0, 0])));
}

#[test]
fn move_to_path_picks_caret_inside_inserted_node() {
    let mut tree = MathTree::new();
    let rules = PlacementRules::default();

    let position = insert(&mut tree, Position::None, &frac(vec![], vec![]), Some(&[1]), &rules);
    assert_eq!(position, at(&tree, &[0, 1]));

    let fallback = insert(&mut tree, position, &frac(vec![], vec![]), Some(&[7, 7]), &rules);
    assert_eq!(fallback, at(&tree, &[0, 1, 0]));
}

#[test]
fn backspace_removes_whole_construct() {
    let mut tree = tree_of(MathNode::document(vec![
        MathNode::identifier("a"),
        frac(vec![MathNode::number("1")], vec![MathNode::number("2")]),
    ]));
    let position = at(&tree, &[1]);
    let a = at(&tree, &[0]);

    assert_eq!(apply_backspace(&mut tree, position), a);
    assert_eq!(to_markup(&tree), "<math><mi>a</mi></math>");
    assert_eq!(tree.len(), 2);
}

#[test]
fn backspace_on_leaf_slot_leaves_empty_row() {
    let mut tree = tree_of(MathNode::document(vec![MathNode::subscript(
        MathNode::identifier("x"),
        MathNode::number("0"),
    )]));
    let base = at(&tree, &[0, 0]);

    let position = apply_backspace(&mut tree, base);
    assert_eq!(position, at(&tree, &[0, 0]));
    assert_eq!(
        to_markup(&tree),
        "<math><msub><mrow></mrow><mn>0</mn></msub></math>"
    );
}

#[test]
fn backspace_cascades_through_nested_wrappers() {
    let mut tree = tree_of(MathNode::document(vec![
        MathNode::identifier("a"),
        MathNode::row(vec![MathNode::row(vec![MathNode::identifier("x")])]),
    ]));
    let x = at(&tree, &[1, 0, 0]);
    let a = at(&tree, &[0]);

    assert_eq!(apply_backspace(&mut tree, x), a);
    assert_eq!(to_markup(&tree), "<math><mi>a</mi></math>");
}

#[test]
fn backspace_inside_slot_row_stops_at_slot() {
    let mut tree = tree_of(MathNode::document(vec![MathNode::sqrt(vec![
        MathNode::row(vec![MathNode::identifier("x")]),
    ])]));
    let x = at(&tree, &[0, 0, 0, 0]);
    let inner = at(&tree, &[0, 0]);

    assert_eq!(apply_backspace(&mut tree, x), inner);
    assert_eq!(to_markup(&tree), "<math><msqrt></msqrt></math>");
}

#[test]
fn backspace_with_nothing_before_is_noop() {
    let mut tree = tree_of(MathNode::document(vec![MathNode::identifier("a")]));
    let revision = tree.revision();
    assert_eq!(apply_backspace(&mut tree, Position::None), Position::None);
    assert_eq!(tree.revision(), revision);
}

#[test]
fn delete_removes_next_element_without_moving() {
    let mut tree = tree_of(MathNode::document(vec![
        MathNode::identifier("a"),
        MathNode::identifier("b"),
    ]));
    let a = at(&tree, &[0]);
    assert_eq!(apply_delete(&mut tree, a), a);
    assert_eq!(to_markup(&tree), "<math><mi>a</mi></math>");

    assert_eq!(apply_delete(&mut tree, Position::None), Position::None);
    assert!(tree.value().is_empty_document());
}

#[test]
fn delete_at_slot_start_removes_first_child() {
    let mut tree = tree_of(MathNode::document(vec![frac(
        vec![MathNode::number("1"), MathNode::number("2")],
        vec![],
    )]));
    let numerator = at(&tree, &[0, 0]);
    assert_eq!(apply_delete(&mut tree, numerator), numerator);
    assert_eq!(
        to_markup(&tree),
        "<math><mfrac><mrow><mn>2</mn></mrow><mrow></mrow></mfrac></math>"
    );
}

#[test]
fn delete_steps_out_of_wrapper_rows() {
    let mut tree = tree_of(MathNode::document(vec![
        MathNode::row(vec![MathNode::identifier("a")]),
        MathNode::identifier("b"),
    ]));
    let a = at(&tree, &[0, 0]);
    apply_delete(&mut tree, a);
    assert_eq!(to_markup(&tree), "<math><mrow><mi>a</mi></mrow></math>");
}

#[test]
fn delete_at_end_of_slot_is_noop() {
    let mut tree = tree_of(MathNode::document(vec![
        frac(vec![MathNode::number("1")], vec![]),
        MathNode::identifier("b"),
    ]));
    let one = at(&tree, &[0, 0, 0]);
    let revision = tree.revision();
    assert_eq!(apply_delete(&mut tree, one), one);
    assert_eq!(tree.revision(), revision);
}

#[test]
fn script_without_base_inserts_empty_construct() {
    let mut tree = MathTree::new();
    let rules = PlacementRules::default();
    let position = attach_script(&mut tree, Position::None, NodeKind::Subscript, &rules);
    assert_eq!(position, at(&tree, &[0, 0]));
    assert_eq!(
        to_markup(&tree),
        "<math><msub><mrow></mrow><mrow></mrow></msub></math>"
    );
}

#[test]
fn script_wraps_whole_construct_as_base() {
    let mut tree = tree_of(MathNode::document(vec![frac(
        vec![MathNode::number("1")],
        vec![MathNode::number("2")],
    )]));
    let rules = PlacementRules::default();
    let fraction = at(&tree, &[0]);
    let position = attach_script(&mut tree, fraction, NodeKind::SubSup, &rules);
    assert_eq!(position, at(&tree, &[0, 1]));
    assert_eq!(
        to_markup(&tree),
        "<math><msubsup><mfrac><mrow><mn>1</mn></mrow><mrow><mn>2</mn></mrow></mfrac>\
         <mrow></mrow><mrow></mrow></msubsup></math>"
    );
}

#[test]
fn delete_at_start_reaches_into_leading_wrapper_row() {
    let mut tree = tree_of(MathNode::document(vec![MathNode::row(vec![
        MathNode::identifier("a"),
        MathNode::operator("+"),
        MathNode::identifier("b"),
    ])]));
    assert_eq!(apply_delete(&mut tree, Position::None), Position::None);
    assert_eq!(
        to_markup(&tree),
        "<math><mrow><mo>+</mo><mi>b</mi></mrow></math>"
    );
}

#[test]
fn delete_before_wrapper_row_removes_only_its_first_element() {
    let mut tree = tree_of(MathNode::document(vec![
        MathNode::identifier("x"),
        MathNode::row(vec![MathNode::identifier("a"), MathNode::identifier("b")]),
    ]));
    let x = at(&tree, &[0]);
    assert_eq!(apply_delete(&mut tree, x), x);
    assert_eq!(
        to_markup(&tree),
        "<math><mi>x</mi><mrow><mi>b</mi></mrow></math>"
    );

    // Last element of the row: the emptied wrapper goes with it.
    apply_delete(&mut tree, x);
    assert_eq!(to_markup(&tree), "<math><mi>x</mi></math>");
}

#[test]
fn inserted_wrapper_row_leaves_caret_behind_its_content() {
    let mut tree = tree_of(MathNode::document(vec![MathNode::identifier("a")]));
    let rules = PlacementRules::default();
    let a = at(&tree, &[0]);

    let position = insert(
        &mut tree,
        a,
        &MathNode::row(vec![MathNode::identifier("b"), MathNode::identifier("c")]),
        None,
        &rules,
    );
    assert_eq!(position, at(&tree, &[1, 1]));

    let empty = insert(&mut tree, a, &MathNode::row(vec![]), None, &rules);
    assert_eq!(empty, a);
}

#[test]
fn insert_at_wrapper_row_appends_inside_it() {
    let mut tree = tree_of(MathNode::document(vec![
        MathNode::identifier("a"),
        MathNode::row(vec![MathNode::identifier("b")]),
    ]));
    let rules = PlacementRules::default();
    let wrapper = at(&tree, &[1]);

    let position = insert(&mut tree, wrapper, &MathNode::identifier("c"), None, &rules);
    assert_eq!(position, at(&tree, &[1, 1]));
    assert_eq!(
        to_markup(&tree),
        "<math><mi>a</mi><mrow><mi>b</mi><mi>c</mi></mrow></math>"
    );
}
