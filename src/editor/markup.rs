use std::fmt::Write as _;

use super::kind::{Arity, NodeKind};
use super::tree::{MathTree, NodeId};
use super::value::MathNode;
use crate::error::EditorError;

/// Attribute carrying the node identity through the typesetter.
pub const MARKER_ATTRIBUTE: &str = "data-mark";

/// Class given to the text shown in an empty document.
pub const PLACEHOLDER_CLASS: &str = "placeholder";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerRef {
    pub id: usize,
    pub node: NodeId,
}

/// Serialize the document as plain MathML.
pub fn to_markup(tree: &MathTree) -> String {
    let mut out = String::new();
    write_plain(tree, tree.root(), &mut out);
    out
}

/// Serialize a detached value as plain MathML.
pub fn value_to_markup(value: &MathNode) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// Serialize the document for the typesetter: every element carries a
/// marker, inferred rows are spelled out, and an empty document gets a
/// placeholder so the caret has something to sit against.
pub fn render_markup(tree: &MathTree, placeholder: &str) -> (String, Vec<MarkerRef>) {
    let mut writer = MarkerWriter {
        out: String::new(),
        markers: Vec::new(),
    };
    writer.write(tree, tree.root(), placeholder);
    (writer.out, writer.markers)
}

/// Parse a MathML string into a detached document value.
pub fn parse_markup(markup: &str) -> Result<MathNode, EditorError> {
    let document = roxmltree::Document::parse(markup)
        .map_err(|err| EditorError::invalid(format!("malformed markup: {err}")))?;
    let root = document.root_element();
    let value = convert_element(root)?;
    value.validate_document()?;
    Ok(value)
}

fn write_plain(tree: &MathTree, id: NodeId, out: &mut String) {
    let Some(kind) = tree.kind(id) else {
        return;
    };
    if kind == NodeKind::Sqrt {
        out.push_str("<msqrt>");
        for &row in tree.children_of(id) {
            for &child in tree.children_of(row) {
                write_plain(tree, child, out);
            }
        }
        out.push_str("</msqrt>");
        return;
    }
    if kind == NodeKind::Space {
        out.push_str("<mspace/>");
        return;
    }
    let _ = write!(out, "<{}>", kind.tag());
    if kind.is_leaf() {
        push_escaped(out, tree.text(id).unwrap_or_default());
    }
    for &child in tree.children_of(id) {
        write_plain(tree, child, out);
    }
    let _ = write!(out, "</{}>", kind.tag());
}

fn write_value(value: &MathNode, out: &mut String) {
    match value.kind {
        NodeKind::Sqrt => {
            out.push_str("<msqrt>");
            for row in &value.children {
                for child in &row.children {
                    write_value(child, out);
                }
            }
            out.push_str("</msqrt>");
        }
        NodeKind::Space => out.push_str("<mspace/>"),
        kind => {
            let _ = write!(out, "<{}>", kind.tag());
            push_escaped(out, &value.text);
            for child in &value.children {
                write_value(child, out);
            }
            let _ = write!(out, "</{}>", kind.tag());
        }
    }
}

struct MarkerWriter {
    out: String,
    markers: Vec<MarkerRef>,
}

impl MarkerWriter {
    fn write(&mut self, tree: &MathTree, id: NodeId, placeholder: &str) {
        let Some(kind) = tree.kind(id) else {
            return;
        };
        let marker = self.markers.len();
        self.markers.push(MarkerRef { id: marker, node: id });
        let _ = write!(
            self.out,
            "<{} {}=\"{}\">",
            kind.tag(),
            MARKER_ATTRIBUTE,
            marker
        );
        if kind == NodeKind::Math && tree.is_empty() {
            let _ = write!(self.out, "<mtext class=\"{PLACEHOLDER_CLASS}\">");
            push_escaped(&mut self.out, placeholder);
            self.out.push_str("</mtext>");
        }
        if kind.is_leaf() {
            push_escaped(&mut self.out, tree.text(id).unwrap_or_default());
        }
        for &child in tree.children_of(id) {
            self.write(tree, child, placeholder);
        }
        let _ = write!(self.out, "</{}>", kind.tag());
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

fn convert_element(element: roxmltree::Node<'_, '_>) -> Result<MathNode, EditorError> {
    let tag = element.tag_name().name();
    let kind = NodeKind::from_tag(tag)
        .ok_or_else(|| EditorError::invalid(format!("unsupported element <{tag}>")))?;

    if kind.is_leaf() {
        if let Some(child) = element.children().find(|child| child.is_element()) {
            return Err(EditorError::invalid(format!(
                "<{tag}> cannot contain <{}>",
                child.tag_name().name()
            )));
        }
        let text: String = element
            .children()
            .filter(|child| child.is_text())
            .filter_map(|child| child.text())
            .collect();
        return Ok(MathNode::new(kind).with_text(text.trim()));
    }

    if let Some(stray) = element
        .children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .find(|text| !text.trim().is_empty())
    {
        return Err(EditorError::invalid(format!(
            "<{tag}> cannot contain text {:?}",
            stray.trim()
        )));
    }

    let children = element
        .children()
        .filter(|child| child.is_element())
        .map(convert_element)
        .collect::<Result<Vec<_>, _>>()?;

    let node = match kind {
        NodeKind::Sqrt => match children.as_slice() {
            [single] if single.kind == NodeKind::Row => {
                MathNode::new(NodeKind::Sqrt).with_children(children)
            }
            _ => MathNode::sqrt(children),
        },
        _ => {
            if let Arity::Fixed(count) = kind.arity()
                && children.len() != count
            {
                return Err(EditorError::invalid(format!(
                    "<{tag}> expects {count} children, found {}",
                    children.len()
                )));
            }
            MathNode::new(kind).with_children(children)
        }
    };
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_nested_structure() {
        let tree = MathTree::from_value(&MathNode::document(vec![
            MathNode::identifier("x"),
            MathNode::operator("<"),
            MathNode::fraction(
                MathNode::row(vec![MathNode::number("1")]),
                MathNode::row(vec![]),
            ),
            MathNode::sqrt(vec![MathNode::identifier("y"), MathNode::space()]),
        ]))
        .unwrap();
        assert_eq!(
            to_markup(&tree),
            "<math><mi>x</mi><mo>&lt;</mo><mfrac><mrow><mn>1</mn></mrow><mrow></mrow></mfrac>\
             <msqrt><mi>y</mi><mspace/></msqrt></math>"
        );
        assert_eq!(value_to_markup(&tree.value()), to_markup(&tree));
    }

    #[test]
    fn parses_with_whitespace_and_namespace() {
        let value = parse_markup(
            r#"<math xmlns="http://www.w3.org/1998/Math/MathML">
                 <msup> <mi> x </mi> <mn>2</mn> </msup>
                 <mo>+</mo>
                 <msqrt><mn>4</mn><mi>y</mi></msqrt>
               </math>"#,
        )
        .unwrap();
        assert_eq!(
            value,
            MathNode::document(vec![
                MathNode::superscript(MathNode::identifier("x"), MathNode::number("2")),
                MathNode::operator("+"),
                MathNode::sqrt(vec![MathNode::number("4"), MathNode::identifier("y")]),
            ])
        );
    }

    #[test]
    fn sqrt_with_explicit_row_is_not_double_wrapped() {
        let value = parse_markup("<math><msqrt><mrow><mi>a</mi></mrow></msqrt></math>").unwrap();
        assert_eq!(
            value,
            MathNode::document(vec![MathNode::sqrt(vec![MathNode::identifier("a")])])
        );
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in [
            "<math><mi>x</mi>",
            "<mrow><mi>x</mi></mrow>",
            "<math><mfrac><mi>x</mi></mfrac></math>",
            "<math><mtable/></math>",
            "<math>stray<mi>x</mi></math>",
            "<math><mi><mn>1</mn></mi></math>",
            "<math><mi>  </mi></math>",
        ] {
            let err = parse_markup(bad).unwrap_err();
            assert!(matches!(err, EditorError::InvalidValue(_)), "{bad}");
        }
    }

    #[test]
    fn render_markup_marks_every_node_and_spells_out_rows() {
        let tree = MathTree::from_value(&MathNode::document(vec![MathNode::sqrt(vec![
            MathNode::identifier("a"),
        ])]))
        .unwrap();
        let (markup, markers) = render_markup(&tree, "empty");
        assert_eq!(
            markup,
            "<math data-mark=\"0\"><msqrt data-mark=\"1\"><mrow data-mark=\"2\">\
             <mi data-mark=\"3\">a</mi></mrow></msqrt></math>"
        );
        assert_eq!(markers.len(), tree.len());
        assert_eq!(markers[0].node, tree.root());
    }

    #[test]
    fn render_markup_uses_placeholder_for_empty_document() {
        let tree = MathTree::new();
        let (markup, markers) = render_markup(&tree, "type <math>");
        assert_eq!(
            markup,
            "<math data-mark=\"0\"><mtext class=\"placeholder\">type &lt;math&gt;</mtext></math>"
        );
        assert_eq!(markers.len(), 1);
    }
}
