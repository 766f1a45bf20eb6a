/// Structural role of a node in the math tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Math,
    Row,
    Identifier,
    Number,
    Operator,
    Text,
    Space,
    Fraction,
    Sqrt,
    Radical,
    Subscript,
    Superscript,
    SubSup,
}

/// How many children a kind holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Leaf,
    Variadic,
    Fixed(usize),
}

/// Where `insert` places a new node relative to the node a position names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// First child of the referenced container.
    Prepend,
    /// Last child of the referenced container.
    Append,
    /// Next sibling of the referenced node.
    After,
}

pub const ALL_KINDS: [NodeKind; 13] = [
    NodeKind::Math,
    NodeKind::Row,
    NodeKind::Identifier,
    NodeKind::Number,
    NodeKind::Operator,
    NodeKind::Text,
    NodeKind::Space,
    NodeKind::Fraction,
    NodeKind::Sqrt,
    NodeKind::Radical,
    NodeKind::Subscript,
    NodeKind::Superscript,
    NodeKind::SubSup,
];

const SINGLE: [usize; 1] = [0];
const IDENTITY_2: [usize; 2] = [0, 1];
const IDENTITY_3: [usize; 3] = [0, 1, 2];
const INDEX_FIRST: [usize; 2] = [1, 0];

impl NodeKind {
    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Math => "math",
            NodeKind::Row => "mrow",
            NodeKind::Identifier => "mi",
            NodeKind::Number => "mn",
            NodeKind::Operator => "mo",
            NodeKind::Text => "mtext",
            NodeKind::Space => "mspace",
            NodeKind::Fraction => "mfrac",
            NodeKind::Sqrt => "msqrt",
            NodeKind::Radical => "mroot",
            NodeKind::Subscript => "msub",
            NodeKind::Superscript => "msup",
            NodeKind::SubSup => "msubsup",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        ALL_KINDS.iter().copied().find(|kind| kind.tag() == tag)
    }

    pub fn arity(self) -> Arity {
        match self {
            NodeKind::Math | NodeKind::Row => Arity::Variadic,
            NodeKind::Identifier
            | NodeKind::Number
            | NodeKind::Operator
            | NodeKind::Text
            | NodeKind::Space => Arity::Leaf,
            NodeKind::Sqrt => Arity::Fixed(1),
            NodeKind::Fraction
            | NodeKind::Radical
            | NodeKind::Subscript
            | NodeKind::Superscript => Arity::Fixed(2),
            NodeKind::SubSup => Arity::Fixed(3),
        }
    }

    pub fn is_container(self) -> bool {
        self.arity() != Arity::Leaf
    }

    pub fn is_leaf(self) -> bool {
        self.arity() == Arity::Leaf
    }

    /// Children of this kind are required slots.
    pub fn has_slots(self) -> bool {
        matches!(self.arity(), Arity::Fixed(_))
    }

    /// Leaves whose text must not be empty.
    pub fn requires_text(self) -> bool {
        matches!(
            self,
            NodeKind::Identifier | NodeKind::Number | NodeKind::Operator | NodeKind::Text
        )
    }

    /// Whether a node of this kind can be a caret target. Rows qualify only
    /// when they sit in a slot, so the caller passes that fact in.
    pub fn is_caret_eligible(self, in_slot: bool) -> bool {
        match self {
            NodeKind::Math => false,
            NodeKind::Row => in_slot,
            _ => true,
        }
    }

    /// Indices into the child list, in the order they are read on screen.
    pub fn visual_order(self) -> &'static [usize] {
        match self {
            NodeKind::Radical => &INDEX_FIRST,
            NodeKind::Sqrt => &SINGLE,
            NodeKind::Fraction | NodeKind::Subscript | NodeKind::Superscript => &IDENTITY_2,
            NodeKind::SubSup => &IDENTITY_3,
            _ => &[],
        }
    }

    pub fn default_placement(self) -> Placement {
        match self {
            NodeKind::Row => Placement::Prepend,
            NodeKind::Math => Placement::Append,
            _ => Placement::After,
        }
    }

    /// Short label for status lines.
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Math => "Document",
            NodeKind::Row => "Row",
            NodeKind::Identifier => "Identifier",
            NodeKind::Number => "Number",
            NodeKind::Operator => "Operator",
            NodeKind::Text => "Text",
            NodeKind::Space => "Space",
            NodeKind::Fraction => "Fraction",
            NodeKind::Sqrt => "Square root",
            NodeKind::Radical => "Root",
            NodeKind::Subscript => "Subscript",
            NodeKind::Superscript => "Superscript",
            NodeKind::SubSup => "Sub/superscript",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_for_every_kind() {
        for kind in ALL_KINDS {
            assert_eq!(NodeKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(NodeKind::from_tag("mtable"), None);
    }

    #[test]
    fn visual_order_covers_every_slot() {
        for kind in ALL_KINDS {
            if let Arity::Fixed(count) = kind.arity() {
                let mut order = kind.visual_order().to_vec();
                order.sort_unstable();
                assert_eq!(order, (0..count).collect::<Vec<_>>(), "{kind:?}");
            } else {
                assert!(kind.visual_order().is_empty());
            }
        }
    }

    #[test]
    fn radical_reads_index_before_base() {
        assert_eq!(NodeKind::Radical.visual_order(), &[1, 0]);
    }

    #[test]
    fn rows_are_caret_targets_only_in_slots() {
        assert!(NodeKind::Row.is_caret_eligible(true));
        assert!(!NodeKind::Row.is_caret_eligible(false));
        assert!(!NodeKind::Math.is_caret_eligible(false));
        assert!(NodeKind::Fraction.is_caret_eligible(false));
    }
}
