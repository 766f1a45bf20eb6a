use super::kind::NodeKind;
use super::value::MathNode;
use crate::error::EditorError;

/// Handle to a node in a [`MathTree`].
///
/// Handles carry the version of the arena slot they were issued for, so a
/// handle to a removed node never resolves to whatever reuses its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    version: u32,
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
struct Slot {
    version: u32,
    node: Option<Node>,
}

/// Arena-backed math document. The root is always a `Math` node.
#[derive(Clone, Debug)]
pub struct MathTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    live: usize,
    revision: u64,
}

impl Default for MathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MathTree {
    /// An empty document.
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                version: 0,
            },
            live: 0,
            revision: 0,
        };
        tree.root = tree.alloc(NodeKind::Math, String::new(), None);
        tree
    }

    /// Build a tree from a detached value, rejecting malformed input.
    pub fn from_value(value: &MathNode) -> Result<Self, EditorError> {
        value.validate_document()?;
        let mut tree = Self::new();
        let root = tree.root;
        for (idx, child) in value.children.iter().enumerate() {
            tree.graft(root, idx, child);
        }
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.children_of(self.root).is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|node| node.kind)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|node| node.text.as_str())
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Children in the order they are read on screen.
    pub fn visual_children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let order = node.kind.visual_order();
        if order.is_empty() {
            node.children.clone()
        } else {
            order
                .iter()
                .filter_map(|&idx| node.children.get(idx).copied())
                .collect()
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children_of(parent).iter().position(|&child| child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(id)?;
        let idx = self.index_in_parent(id)?;
        self.children_of(parent).get(idx + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1)
            .and_then(|prev| self.children_of(parent).get(prev).copied())
    }

    /// Next sibling in reading order.
    pub fn visual_next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.visual_children(self.parent_of(id)?);
        let idx = siblings.iter().position(|&child| child == id)?;
        siblings.get(idx + 1).copied()
    }

    /// Previous sibling in reading order.
    pub fn visual_previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.visual_children(self.parent_of(id)?);
        let idx = siblings.iter().position(|&child| child == id)?;
        idx.checked_sub(1).and_then(|prev| siblings.get(prev).copied())
    }

    /// Leftmost leaf below `id` (or `id` itself when it is a leaf).
    pub fn first_descendant_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let kind = self.kind(current)?;
            if kind.is_leaf() {
                return Some(current);
            }
            current = *self.visual_children(current).first()?;
        }
    }

    /// Rightmost leaf below `id` (or `id` itself when it is a leaf).
    pub fn last_descendant_leaf(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let kind = self.kind(current)?;
            if kind.is_leaf() {
                return Some(current);
            }
            current = *self.visual_children(current).last()?;
        }
    }

    /// A slot is a direct child of a fixed-arity container.
    pub fn is_slot(&self, id: NodeId) -> bool {
        self.parent_of(id)
            .and_then(|parent| self.kind(parent))
            .is_some_and(NodeKind::has_slots)
    }

    pub fn is_caret_eligible(&self, id: NodeId) -> bool {
        self.kind(id)
            .is_some_and(|kind| kind.is_caret_eligible(self.is_slot(id)))
    }

    /// Whether `id` lies inside the subtree rooted at `ancestor`.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent_of(node);
        }
        false
    }

    /// Follow a path of child indices down from `id`.
    pub fn descend(&self, id: NodeId, path: &[usize]) -> Option<NodeId> {
        let mut current = id;
        for &idx in path {
            current = *self.children_of(current).get(idx)?;
        }
        Some(current)
    }

    /// Detached copy of the subtree rooted at `id`.
    pub fn to_value(&self, id: NodeId) -> Option<MathNode> {
        let node = self.node(id)?;
        let children = node
            .children
            .iter()
            .filter_map(|&child| self.to_value(child))
            .collect();
        Some(MathNode {
            kind: node.kind,
            text: node.text.clone(),
            children,
        })
    }

    /// Detached copy of the whole document.
    pub fn value(&self) -> MathNode {
        self.to_value(self.root)
            .unwrap_or_else(|| MathNode::document(Vec::new()))
    }

    /// Copy `value` into the tree as child `index` of `parent`.
    /// The value is trusted to be a well-formed fragment.
    pub(crate) fn graft(&mut self, parent: NodeId, index: usize, value: &MathNode) -> NodeId {
        let id = self.alloc(value.kind, value.text.clone(), Some(parent));
        if let Some(node) = self.node_mut(parent) {
            let at = index.min(node.children.len());
            node.children.insert(at, id);
        }
        for (idx, child) in value.children.iter().enumerate() {
            self.graft(id, idx, child);
        }
        id
    }

    /// Detach `id` from its parent and free its whole subtree.
    /// The root cannot be removed.
    pub(crate) fn remove(&mut self, id: NodeId) -> bool {
        if id == self.root || !self.contains(id) {
            return false;
        }
        if let Some(parent) = self.parent_of(id)
            && let Some(node) = self.node_mut(parent)
        {
            node.children.retain(|&child| child != id);
        }
        self.free_subtree(id);
        true
    }

    /// Put `value` where `id` is now, freeing the old subtree.
    pub(crate) fn replace(&mut self, id: NodeId, value: &MathNode) -> Option<NodeId> {
        let parent = self.parent_of(id)?;
        let index = self.index_in_parent(id)?;
        self.remove(id);
        Some(self.graft(parent, index, value))
    }

    /// Move `id` into a fresh row that takes its place. Returns the row.
    pub(crate) fn wrap_in_row(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent_of(id)?;
        let index = self.index_in_parent(id)?;
        let row = self.alloc(NodeKind::Row, String::new(), Some(parent));
        if let Some(node) = self.node_mut(parent) {
            node.children[index] = row;
        }
        if let Some(node) = self.node_mut(row) {
            node.children.push(id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = Some(row);
        }
        Some(row)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.version != id.version {
            return None;
        }
        slot.node.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.version != id.version {
            return None;
        }
        slot.node.as_mut()
    }

    fn alloc(&mut self, kind: NodeKind, text: String, parent: Option<NodeId>) -> NodeId {
        let node = Node {
            kind,
            text,
            parent,
            children: Vec::new(),
        };
        self.live += 1;
        self.revision += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                version: slot.version,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                version: 0,
                node: Some(node),
            });
            NodeId { index, version: 0 }
        }
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.version != current.version {
                continue;
            }
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.version = slot.version.wrapping_add(1);
                self.free.push(current.index);
                self.live -= 1;
                self.revision += 1;
            }
        }
    }
}
