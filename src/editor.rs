use std::fmt;
use std::time::Instant;

use ratatui::{layout::Rect, text::Line};

use crate::blink::CaretBlink;
use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::render::{GeometryMap, RendererBridge, Typesetter};

pub mod cursor;
pub mod events;
pub mod kind;
pub mod markup;
pub mod position;
pub mod structure;
pub mod tree;
pub mod value;

pub use events::{EditorEvent, EventKind};
pub use kind::{NodeKind, Placement};
pub use position::{Cursor, Position};
pub use tree::{MathTree, NodeId};
pub use value::MathNode;

use events::Listeners;

/// Converts a document value into TeX. Provided by the host.
pub trait TexConverter {
    fn convert(&self, value: &MathNode) -> String;
}

/// The editing engine: document tree, caret, renderer bridge and blink
/// controller behind one API.
pub struct MathEditor {
    tree: MathTree,
    cursor: Cursor,
    bridge: Option<RendererBridge>,
    blink: CaretBlink,
    config: EditorConfig,
    listeners: Listeners,
    focused: bool,
    destroyed: bool,
    startup_error: Option<EditorError>,
    /// Time of the last `focus` or `tick`; interactions freeze the caret
    /// from here.
    clock: Option<Instant>,
}

impl MathEditor {
    /// Create an editor with an empty document.
    ///
    /// When the typesetter fails to start the editor is still returned, but
    /// inert: it shows no caret and never renders. The failure is kept in
    /// [`MathEditor::startup_error`].
    pub fn new(typesetter: Box<dyn Typesetter>, config: EditorConfig) -> Self {
        let (bridge, startup_error) = match RendererBridge::new(typesetter) {
            Ok(bridge) => (Some(bridge), None),
            Err(err) => {
                tracing::error!(target: "mathpad::editor", error = %err, "editor is inert");
                (None, Some(err))
            }
        };
        let blink = CaretBlink::new(config.blink_interval, config.quiet_period);
        let mut editor = Self {
            tree: MathTree::new(),
            cursor: Cursor::new(),
            bridge,
            blink,
            config,
            listeners: Listeners::default(),
            focused: false,
            destroyed: false,
            startup_error,
            clock: None,
        };
        editor.request_update();
        editor
    }

    pub fn is_inert(&self) -> bool {
        self.bridge.is_none() || self.destroyed
    }

    pub fn startup_error(&self) -> Option<&EditorError> {
        self.startup_error.as_ref()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tree(&self) -> &MathTree {
        &self.tree
    }

    /// Detached copy of the document.
    pub fn value(&self) -> MathNode {
        self.tree.value()
    }

    /// Replace the document. On error the current document is untouched.
    /// The caret moves to the end of the new document.
    pub fn set_value(&mut self, value: &MathNode) -> Result<(), EditorError> {
        let tree = MathTree::from_value(value)?;
        self.tree = tree;
        let end = cursor::caret_stops(&self.tree)
            .last()
            .copied()
            .unwrap_or_default();
        self.cursor.set_position(end);
        self.cursor.clear_caret();
        self.request_update();
        tracing::debug!(target: "mathpad::editor", nodes = self.tree.len(), "value replaced");
        Ok(())
    }

    /// Parse `markup` and replace the document with it.
    pub fn set_markup(&mut self, markup: &str) -> Result<(), EditorError> {
        let value = markup::parse_markup(markup)?;
        self.set_value(&value)
    }

    pub fn to_markup(&self) -> String {
        markup::to_markup(&self.tree)
    }

    pub fn to_tex(&self, converter: &dyn TexConverter) -> String {
        converter.convert(&self.value())
    }

    /// Subscribe to editor events of one kind.
    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&EditorEvent) + 'static) {
        self.listeners.add(kind, Box::new(listener));
    }

    pub fn position(&self) -> Position {
        self.cursor.position()
    }

    /// Store `position` without validating it.
    pub fn set_position(&mut self, position: Position) {
        self.cursor.set_position(position);
        self.refresh_caret();
    }

    /// Caret rectangle in display-surface cells.
    pub fn caret(&self) -> Option<Rect> {
        if self.is_inert() {
            return None;
        }
        self.cursor.caret()
    }

    /// Whether the caret should be drawn right now.
    pub fn caret_visible(&self) -> bool {
        self.focused && self.blink.is_visible() && self.caret().is_some()
    }

    pub fn geometry(&self) -> Option<&GeometryMap> {
        self.bridge.as_ref().map(RendererBridge::geometry)
    }

    /// Glyph lines of the last applied render.
    pub fn rendered_lines(&self) -> &[Line<'static>] {
        self.bridge
            .as_ref()
            .map(RendererBridge::lines)
            .unwrap_or_default()
    }

    /// Whether a render has been submitted but not applied yet.
    pub fn render_pending(&self) -> bool {
        self.bridge.as_ref().is_some_and(RendererBridge::is_pending)
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self, now: Instant) {
        self.clock = Some(now);
        if self.is_inert() || self.focused {
            return;
        }
        self.focused = true;
        self.blink.start(now);
        self.listeners.emit(&EditorEvent::Focus);
    }

    pub fn blur(&mut self) {
        if !self.focused {
            return;
        }
        self.focused = false;
        self.blink.destroy();
        self.listeners.emit(&EditorEvent::Blur);
    }

    /// Drive the asynchronous parts: collect finished renders and fire due
    /// blink timers. Returns true when anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.destroyed {
            return false;
        }
        self.clock = Some(now);
        let mut changed = false;
        if let Some(generation) = self.bridge.as_mut().and_then(RendererBridge::poll) {
            self.refresh_caret();
            self.listeners.emit(&EditorEvent::Update { generation });
            changed = true;
        }
        changed |= self.blink.tick(now);
        changed
    }

    /// Tear down: stop blinking, drop listeners, ignore renders still in
    /// flight.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.focused = false;
        self.blink.destroy();
        self.listeners.clear();
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.shutdown();
        }
        self.cursor.clear_caret();
        tracing::debug!(target: "mathpad::editor", "editor destroyed");
    }

    /// Kind of the node the caret sits after.
    pub fn current_kind(&self) -> Option<NodeKind> {
        self.cursor.position().node().and_then(|id| self.tree.kind(id))
    }

    /// Insert a node at the caret. `move_to` is a child-index path into
    /// the inserted node naming where the caret should end up.
    pub fn insert(
        &mut self,
        value: MathNode,
        move_to: Option<&[usize]>,
    ) -> Result<Position, EditorError> {
        value.validate_fragment()?;
        let position = structure::insert(
            &mut self.tree,
            self.cursor.position(),
            &value,
            move_to,
            &self.config.placement,
        );
        self.after_edit(position);
        Ok(position)
    }

    pub fn backspace(&mut self) -> bool {
        let revision = self.tree.revision();
        let position = structure::apply_backspace(&mut self.tree, self.cursor.position());
        self.finish_removal(revision, position)
    }

    pub fn delete(&mut self) -> bool {
        let revision = self.tree.revision();
        let position = structure::apply_delete(&mut self.tree, self.cursor.position());
        self.finish_removal(revision, position)
    }

    /// Turn typed text into leaves, one per character.
    pub fn commit_input(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let mut position = self.cursor.position();
        for ch in text.chars() {
            let value = leaf_for_char(ch);
            position = structure::insert(
                &mut self.tree,
                position,
                &value,
                None,
                &self.config.placement,
            );
        }
        self.after_edit(position);
        self.listeners
            .emit(&EditorEvent::InputCommitted(text.to_string()));
        true
    }

    pub fn insert_fraction(&mut self) -> bool {
        let empty = MathNode::row(Vec::new());
        self.insert(MathNode::fraction(empty.clone(), empty), Some(&[0]))
            .is_ok()
    }

    pub fn insert_sqrt(&mut self) -> bool {
        self.insert(MathNode::sqrt(Vec::new()), Some(&[0])).is_ok()
    }

    /// Insert an n-th root; the caret goes to the index.
    pub fn insert_radical(&mut self) -> bool {
        let empty = MathNode::row(Vec::new());
        self.insert(MathNode::radical(empty.clone(), empty), Some(&[1]))
            .is_ok()
    }

    pub fn attach_superscript(&mut self) -> bool {
        self.attach_script(NodeKind::Superscript)
    }

    pub fn attach_subscript(&mut self) -> bool {
        self.attach_script(NodeKind::Subscript)
    }

    fn attach_script(&mut self, kind: NodeKind) -> bool {
        let position = structure::attach_script(
            &mut self.tree,
            self.cursor.position(),
            kind,
            &self.config.placement,
        );
        self.after_edit(position);
        true
    }

    fn finish_removal(&mut self, revision: u64, position: Position) -> bool {
        self.note_interaction();
        if self.tree.revision() == revision {
            return false;
        }
        self.after_edit(position);
        true
    }

    fn after_edit(&mut self, position: Position) {
        self.note_interaction();
        self.cursor.set_position(position);
        self.request_update();
    }

    /// Submit the tree for typesetting. The caret keeps its old rectangle
    /// until the new render is applied.
    fn request_update(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.update(&self.tree, &self.config.placeholder);
        }
    }

    /// Geometry of the render that matches the current tree, if it has
    /// landed.
    pub(crate) fn current_geometry(&self) -> Option<&GeometryMap> {
        self.bridge
            .as_ref()
            .filter(|bridge| bridge.is_current())
            .map(RendererBridge::geometry)
    }

    /// Recompute the caret, but only against geometry that matches the
    /// current tree.
    pub(crate) fn refresh_caret(&mut self) {
        let Some(bridge) = self.bridge.as_ref().filter(|bridge| bridge.is_current()) else {
            return;
        };
        self.cursor.update(&self.tree, bridge.geometry());
    }

    pub(crate) fn note_interaction(&mut self) {
        if let Some(now) = self.clock {
            self.blink.freeze(now);
        }
    }
}

impl fmt::Display for MathEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}

impl fmt::Debug for MathEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MathEditor")
            .field("markup", &self.to_markup())
            .field("position", &self.cursor.position())
            .field("bridge", &self.bridge)
            .field("focused", &self.focused)
            .field("destroyed", &self.destroyed)
            .field("clock", &self.clock)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn leaf_for_char(ch: char) -> MathNode {
    let mut buf = [0u8; 4];
    let text: &str = ch.encode_utf8(&mut buf);
    if ch.is_ascii_digit() || ch == '.' {
        MathNode::number(text)
    } else if ch.is_alphabetic() {
        MathNode::identifier(text)
    } else if ch.is_whitespace() {
        MathNode::space()
    } else {
        MathNode::operator(text)
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;

#[cfg(test)]
#[path = "editor/cursor_tests.rs"]
mod cursor_tests;

#[cfg(test)]
#[path = "editor/structure_tests.rs"]
mod structure_tests;
