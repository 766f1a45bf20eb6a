use super::kind::{Arity, NodeKind};
use crate::error::EditorError;

/// Owned, detached copy of a math tree (or a fragment of one).
///
/// This is the value exchanged with the host: `MathEditor::value` hands one
/// out, `MathEditor::set_value` and `MathEditor::insert` take one in. It
/// shares nothing with the live tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MathNode {
    pub kind: NodeKind,
    pub text: String,
    pub children: Vec<MathNode>,
}

impl MathNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn document(children: Vec<MathNode>) -> Self {
        Self::new(NodeKind::Math).with_children(children)
    }

    pub fn row(children: Vec<MathNode>) -> Self {
        Self::new(NodeKind::Row).with_children(children)
    }

    pub fn identifier(text: &str) -> Self {
        Self::new(NodeKind::Identifier).with_text(text)
    }

    pub fn number(text: &str) -> Self {
        Self::new(NodeKind::Number).with_text(text)
    }

    pub fn operator(text: &str) -> Self {
        Self::new(NodeKind::Operator).with_text(text)
    }

    pub fn text(text: &str) -> Self {
        Self::new(NodeKind::Text).with_text(text)
    }

    pub fn space() -> Self {
        Self::new(NodeKind::Space)
    }

    pub fn fraction(numerator: MathNode, denominator: MathNode) -> Self {
        Self::new(NodeKind::Fraction).with_children(vec![numerator, denominator])
    }

    /// Square root; the content goes into the single inferred row.
    pub fn sqrt(content: Vec<MathNode>) -> Self {
        Self::new(NodeKind::Sqrt).with_children(vec![MathNode::row(content)])
    }

    pub fn radical(base: MathNode, index: MathNode) -> Self {
        Self::new(NodeKind::Radical).with_children(vec![base, index])
    }

    pub fn subscript(base: MathNode, script: MathNode) -> Self {
        Self::new(NodeKind::Subscript).with_children(vec![base, script])
    }

    pub fn superscript(base: MathNode, script: MathNode) -> Self {
        Self::new(NodeKind::Superscript).with_children(vec![base, script])
    }

    pub fn subsup(base: MathNode, sub: MathNode, sup: MathNode) -> Self {
        Self::new(NodeKind::SubSup).with_children(vec![base, sub, sup])
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_children(mut self, children: Vec<MathNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_empty_document(&self) -> bool {
        self.kind == NodeKind::Math && self.children.is_empty()
    }

    /// Total number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(MathNode::node_count).sum::<usize>()
    }

    /// Check that this is a well-formed document: a `Math` root whose
    /// descendants are well-formed fragments.
    pub fn validate_document(&self) -> Result<(), EditorError> {
        if self.kind != NodeKind::Math {
            return Err(EditorError::invalid(format!(
                "root must be <math>, found <{}>",
                self.kind.tag()
            )));
        }
        if !self.text.is_empty() {
            return Err(EditorError::invalid("<math> cannot carry text"));
        }
        for child in &self.children {
            child.validate_fragment()?;
        }
        Ok(())
    }

    /// Check that this subtree can live inside a document.
    pub fn validate_fragment(&self) -> Result<(), EditorError> {
        if self.kind == NodeKind::Math {
            return Err(EditorError::invalid("<math> may only appear as the root"));
        }
        match self.kind.arity() {
            Arity::Leaf => {
                if !self.children.is_empty() {
                    return Err(EditorError::invalid(format!(
                        "<{}> cannot have children",
                        self.kind.tag()
                    )));
                }
                if self.kind.requires_text() && self.text.is_empty() {
                    return Err(EditorError::invalid(format!(
                        "<{}> requires text",
                        self.kind.tag()
                    )));
                }
                if !self.kind.requires_text() && !self.text.is_empty() {
                    return Err(EditorError::invalid(format!(
                        "<{}> cannot carry text",
                        self.kind.tag()
                    )));
                }
            }
            Arity::Variadic => {
                if !self.text.is_empty() {
                    return Err(EditorError::invalid(format!(
                        "<{}> cannot carry text",
                        self.kind.tag()
                    )));
                }
            }
            Arity::Fixed(count) => {
                if self.children.len() != count {
                    return Err(EditorError::invalid(format!(
                        "<{}> expects {} children, found {}",
                        self.kind.tag(),
                        count,
                        self.children.len()
                    )));
                }
                if self.kind == NodeKind::Sqrt && self.children[0].kind != NodeKind::Row {
                    return Err(EditorError::invalid("<msqrt> content must be a row"));
                }
                if !self.text.is_empty() {
                    return Err(EditorError::invalid(format!(
                        "<{}> cannot carry text",
                        self.kind.tag()
                    )));
                }
            }
        }
        for child in &self.children {
            child.validate_fragment()?;
        }
        Ok(())
    }
}
