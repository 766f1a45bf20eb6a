use std::ops::{Deref, DerefMut};

use ratatui::layout::Rect;

use crate::editor::{MathEditor, Position};

/// EditorDisplay wraps a MathEditor and maps between screen cells and the
/// document's own coordinates. The typesetter lays the document out from
/// (0, 0); the display places that origin inside the text area, shifted by
/// the left padding and the vertical scroll offset.
#[derive(Debug)]
pub struct EditorDisplay {
    editor: MathEditor,
    cursor_following: bool,
    left_padding: u16,
    last_view_height: usize,
    last_total_lines: usize,
    last_text_area: Rect,
}

impl EditorDisplay {
    /// Create a new EditorDisplay with the given editor
    pub fn new(editor: MathEditor) -> Self {
        Self {
            editor,
            cursor_following: true,
            left_padding: 0,
            last_view_height: 1,
            last_total_lines: 0,
            last_text_area: Rect::default(),
        }
    }

    pub fn into_inner(self) -> MathEditor {
        self.editor
    }

    /// Check if cursor following is enabled
    pub fn cursor_following(&self) -> bool {
        self.cursor_following
    }

    /// Set cursor following mode
    pub fn set_cursor_following(&mut self, following: bool) {
        self.cursor_following = following;
    }

    pub fn left_padding(&self) -> u16 {
        self.left_padding
    }

    pub fn set_left_padding(&mut self, padding: u16) {
        self.left_padding = padding;
    }

    /// Get last view height
    pub fn last_view_height(&self) -> usize {
        self.last_view_height
    }

    /// Get last total lines
    pub fn last_total_lines(&self) -> usize {
        self.last_total_lines
    }

    /// Get last text area
    pub fn last_text_area(&self) -> Rect {
        self.last_text_area
    }

    /// Update tracking state after rendering (called from draw)
    pub fn update_after_render(&mut self, text_area: Rect, total_lines: usize) {
        self.last_text_area = text_area;
        self.last_total_lines = total_lines;
        self.last_view_height = (text_area.height as usize).max(1);
    }

    /// Convert mouse coordinates to document coordinates
    pub fn pointer_from_mouse(&self, column: u16, row: u16, scroll_top: usize) -> Option<(u16, u16)> {
        let area = self.last_text_area;
        if area.width == 0 || area.height == 0 {
            return None;
        }
        let max_x = area.x.saturating_add(area.width);
        let max_y = area.y.saturating_add(area.height);
        if column < area.x || column >= max_x || row < area.y || row >= max_y {
            return None;
        }
        let line = scroll_top.saturating_add((row - area.y) as usize);
        let x = column
            .saturating_sub(area.x)
            .saturating_sub(self.left_padding);
        Some((x, u16::try_from(line).unwrap_or(u16::MAX)))
    }

    /// Place the caret at a mouse click. Clicks outside the text area are
    /// ignored.
    pub fn click_at(&mut self, column: u16, row: u16, scroll_top: usize) -> Option<Position> {
        let (x, y) = self.pointer_from_mouse(column, row, scroll_top)?;
        self.cursor_following = true;
        Some(self.editor.click(x, y))
    }

    /// Screen cell of the caret, if it lies inside the visible part of the
    /// text area.
    pub fn caret_screen_position(&self, scroll_top: usize) -> Option<(u16, u16)> {
        let caret = self.editor.caret()?;
        let area = self.last_text_area;
        if area.width == 0 {
            return None;
        }
        let line = caret.y as usize;
        if line < scroll_top || line >= scroll_top + self.last_view_height {
            return None;
        }
        let x = area
            .x
            .saturating_add(self.left_padding)
            .saturating_add(caret.x)
            .min(area.x + area.width - 1);
        let y = area.y + (line - scroll_top) as u16;
        Some((x, y))
    }

    /// Scroll offset that keeps the whole caret in view, starting from
    /// `scroll_top`.
    pub fn scroll_top_for_caret(&self, scroll_top: usize) -> usize {
        let max_scroll = self.last_total_lines.saturating_sub(self.last_view_height);
        let Some(caret) = self.editor.caret().filter(|_| self.cursor_following) else {
            return scroll_top.min(max_scroll);
        };
        let top = caret.y as usize;
        let bottom = top + (caret.height as usize).max(1);
        if top < scroll_top {
            top
        } else if bottom > scroll_top + self.last_view_height {
            bottom.saturating_sub(self.last_view_height).min(max_scroll)
        } else {
            scroll_top
        }
    }
}

impl Deref for EditorDisplay {
    type Target = MathEditor;

    fn deref(&self) -> &Self::Target {
        &self.editor
    }
}

impl DerefMut for EditorDisplay {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.editor
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::config::EditorConfig;
    use crate::editor::{MathNode, NodeKind};
    use crate::theme::Theme;
    use crate::typeset::TerminalTypesetter;

    fn create_test_display(value: &MathNode) -> EditorDisplay {
        let typesetter = TerminalTypesetter::new(Theme::default());
        let mut editor = MathEditor::new(Box::new(typesetter), EditorConfig::default());
        editor.set_value(value).unwrap();
        editor.tick(Instant::now());
        let mut display = EditorDisplay::new(editor);
        let total = display.rendered_lines().len();
        display.update_after_render(Rect::new(2, 1, 20, 2), total);
        display
    }

    fn fraction_doc() -> MathNode {
        MathNode::document(vec![
            MathNode::identifier("a"),
            MathNode::fraction(
                MathNode::row(vec![MathNode::number("1")]),
                MathNode::row(vec![MathNode::number("2")]),
            ),
        ])
    }

    #[test]
    fn test_pointer_outside_text_area() {
        let display = create_test_display(&fraction_doc());
        assert_eq!(display.pointer_from_mouse(0, 0, 0), None);
        assert_eq!(display.pointer_from_mouse(22, 1, 0), None);
        assert_eq!(display.pointer_from_mouse(2, 1, 0), Some((0, 0)));
        assert_eq!(display.pointer_from_mouse(5, 2, 1), Some((3, 2)));
    }

    #[test]
    fn test_click_maps_through_padding_and_scroll() {
        let mut display = create_test_display(&fraction_doc());
        display.set_left_padding(1);
        // Denominator "2" sits at document (2, 2); with scroll 1 it shows on screen row 2.
        let position = display.click_at(2 + 1 + 2, 2, 1).unwrap();
        let node = position.node().unwrap();
        assert_eq!(display.tree().kind(node), Some(NodeKind::Number));
        assert_eq!(display.tree().text(node), Some("2"));
    }

    #[test]
    fn test_caret_screen_position_respects_viewport() {
        let mut display = create_test_display(&fraction_doc());
        assert!(display.move_to_start());
        // Start of the document sits at the text area origin.
        assert_eq!(display.caret_screen_position(0), Some((2, 1)));

        assert!(display.move_to_end());
        let caret = display.caret().unwrap();
        assert_eq!(caret.x, 4);
        assert_eq!(display.caret_screen_position(0), Some((6, 1)));
        assert_eq!(display.caret_screen_position(3), None);
    }

    #[test]
    fn test_scroll_follows_caret() {
        let mut display = create_test_display(&fraction_doc());
        let denominator = display.tree().descend(display.tree().root(), &[1, 1, 0]).unwrap();
        display.set_position(Position::After(denominator));
        assert_eq!(display.caret().unwrap().y, 2);
        assert_eq!(display.scroll_top_for_caret(0), 1);

        let numerator = display.tree().descend(display.tree().root(), &[1, 0, 0]).unwrap();
        display.set_position(Position::After(numerator));
        assert_eq!(display.scroll_top_for_caret(1), 0);

        display.set_cursor_following(false);
        display.set_position(Position::After(denominator));
        assert_eq!(display.scroll_top_for_caret(0), 0);
    }

    #[test]
    fn test_empty_doc_has_caret() {
        let display = create_test_display(&MathNode::document(Vec::new()));
        assert_eq!(display.position(), Position::None);
        assert_eq!(display.caret_screen_position(0), Some((2, 1)));
    }
}
