//! Terminal visual editor for MathML formulas.
//!
//! [`editor::MathEditor`] owns the document tree and the caret and talks to
//! a [`render::Typesetter`] through the renderer bridge.
//! [`typeset::TerminalTypesetter`] lays formulas out in terminal cells and
//! [`editor_display::EditorDisplay`] maps them onto the screen.

pub mod blink;
pub mod config;
pub mod editor;
pub mod editor_display;
pub mod error;
pub mod render;
pub mod theme;
pub mod typeset;
