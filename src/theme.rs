use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the editor
#[derive(Clone, Debug)]
pub struct Theme {
    /// Background color for the editor
    pub background: Color,

    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the current file name in the status bar
    pub filename_color: Color,

    /// Color for status messages reporting a failure
    pub error_fg: Color,

    /// Color for identifiers (mi)
    pub identifier_color: Color,

    /// Color for numbers (mn)
    pub number_color: Color,

    /// Color for operators (mo)
    pub operator_color: Color,

    /// Color for text runs (mtext)
    pub text_color: Color,

    /// Color for fraction bars, radical signs and overlines
    pub rule_color: Color,

    /// Color for the box drawn in an empty slot
    pub slot_color: Color,

    /// Color for the placeholder shown in an empty document
    pub placeholder_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Reset,
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            error_fg: Color::LightRed,
            identifier_color: Color::Reset,
            number_color: Color::LightCyan,
            operator_color: Color::LightYellow,
            text_color: Color::Reset,
            rule_color: Color::Gray,
            slot_color: Color::DarkGray,
            placeholder_color: Color::DarkGray,
        }
    }
}

impl Theme {
    /// Create a new theme with default colors
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the style for the status bar
    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    /// Get the style for the filename in the status bar
    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error_fg)
    }

    pub fn identifier_style(&self) -> Style {
        Style::default()
            .fg(self.identifier_color)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn number_style(&self) -> Style {
        Style::default().fg(self.number_color)
    }

    pub fn operator_style(&self) -> Style {
        Style::default().fg(self.operator_color)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text_color)
    }

    /// Get the style for fraction bars and radical signs
    pub fn rule_style(&self) -> Style {
        Style::default().fg(self.rule_color)
    }

    pub fn slot_style(&self) -> Style {
        Style::default().fg(self.slot_color)
    }

    /// Get the style for the empty-document placeholder (dimmed)
    pub fn placeholder_style(&self) -> Style {
        Style::default()
            .fg(self.placeholder_color)
            .add_modifier(Modifier::DIM)
    }
}
