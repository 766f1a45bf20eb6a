//! Terminal typesetter: lays MathML out on a grid of character cells.
//!
//! Layout happens in two passes. `measure` builds a box per element with
//! its size, baseline row and glyphs relative to its own origin; `place`
//! then walks the boxes with absolute offsets, paints glyphs onto a
//! [`Canvas`] and produces the [`RenderedBox`] tree the bridge correlates
//! back to nodes.

use std::collections::VecDeque;

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::editor::markup::{MARKER_ATTRIBUTE, PLACEHOLDER_CLASS};
use crate::error::TypesetError;
use crate::render::{RenderedBox, RenderedMath, TypesetJob, TypesetOutcome, Typesetter};
use crate::theme::Theme;

const SLOT_GLYPH: &str = "□";
const RULE_GLYPH: &str = "─";
const RADICAL_GLYPH: &str = "√";

/// Largest grid the typesetter paints onto.
const MAX_CANVAS_CELLS: usize = 1 << 22;

/// Operators drawn with a blank cell on each side.
const SPACED_OPERATORS: &[&str] = &[
    "+", "-", "−", "=", "<", ">", "±", "×", "÷", "·", "≤", "≥", "≠", "→", "≈",
];

/// Typesetter that renders synchronously into terminal cells. Jobs are
/// queued on submit and laid out on the next poll.
#[derive(Debug, Default)]
pub struct TerminalTypesetter {
    theme: Theme,
    queue: VecDeque<TypesetJob>,
}

impl TerminalTypesetter {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            queue: VecDeque::new(),
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl Typesetter for TerminalTypesetter {
    fn submit(&mut self, job: TypesetJob) {
        self.queue.push_back(job);
    }

    fn poll_finished(&mut self) -> Vec<TypesetOutcome> {
        self.queue
            .drain(..)
            .map(|job| TypesetOutcome {
                generation: job.generation,
                result: typeset(&job.markup, &self.theme),
            })
            .collect()
    }
}

/// Lay out one markup string.
pub fn typeset(markup: &str, theme: &Theme) -> Result<RenderedMath, TypesetError> {
    let document = roxmltree::Document::parse(markup)
        .map_err(|err| TypesetError::Markup(err.to_string()))?;
    let layout = measure(document.root_element(), theme)?;
    if usize::from(layout.width) * usize::from(layout.height) > MAX_CANVAS_CELLS {
        return Err(TypesetError::TooLarge);
    }
    let mut canvas = Canvas::new(layout.width, layout.height);
    let root = place(&layout, 0, 0, &mut canvas);
    Ok(RenderedMath {
        root,
        lines: canvas.into_lines(),
    })
}

#[derive(Clone, Debug)]
struct Glyph {
    x: u16,
    y: u16,
    text: String,
    style: Style,
}

#[derive(Clone, Debug)]
struct LayoutBox {
    tag: String,
    marker: Option<usize>,
    width: u16,
    height: u16,
    /// Row of the box that lines up with its neighbours.
    baseline: u16,
    glyphs: Vec<Glyph>,
    children: Vec<(u16, u16, LayoutBox)>,
}

impl LayoutBox {
    fn new(element: roxmltree::Node<'_, '_>) -> Result<Self, TypesetError> {
        let marker = match element.attribute(MARKER_ATTRIBUTE) {
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
                TypesetError::Markup(format!("bad {MARKER_ATTRIBUTE} value {raw:?}"))
            })?),
            None => None,
        };
        Ok(Self {
            tag: element.tag_name().name().to_string(),
            marker,
            width: 0,
            height: 1,
            baseline: 0,
            glyphs: Vec::new(),
            children: Vec::new(),
        })
    }

    fn glyph(&mut self, x: u16, y: u16, text: impl Into<String>, style: Style) {
        self.glyphs.push(Glyph {
            x,
            y,
            text: text.into(),
            style,
        });
    }

    fn descent(&self) -> u16 {
        self.height.saturating_sub(self.baseline)
    }
}

/// Cell arithmetic; a formula wider or taller than the grid is an error.
fn grow(a: u16, b: u16) -> Result<u16, TypesetError> {
    a.checked_add(b).ok_or(TypesetError::TooLarge)
}

fn measure(element: roxmltree::Node<'_, '_>, theme: &Theme) -> Result<LayoutBox, TypesetError> {
    let mut layout = LayoutBox::new(element)?;
    let tag = layout.tag.clone();
    let children = element
        .children()
        .filter(|child| child.is_element())
        .map(|child| measure(child, theme))
        .collect::<Result<Vec<_>, _>>()?;

    match tag.as_str() {
        "mi" | "mn" | "mo" | "mtext" => {
            let text = element.text().unwrap_or_default().trim();
            let style = match tag.as_str() {
                "mi" => theme.identifier_style(),
                "mn" => theme.number_style(),
                "mo" => theme.operator_style(),
                _ if element.attribute("class") == Some(PLACEHOLDER_CLASS) => {
                    theme.placeholder_style()
                }
                _ => theme.text_style(),
            };
            let pad = u16::from(tag == "mo" && SPACED_OPERATORS.contains(&text));
            let width = cell_width(text)?;
            layout.width = grow(width, pad * 2)?.max(1);
            layout.glyph(pad, 0, text, style);
        }
        "mspace" => layout.width = 1,
        "math" | "mrow" => {
            if children.is_empty() {
                layout.width = cell_width(SLOT_GLYPH)?.max(1);
                if tag == "mrow" {
                    layout.glyph(0, 0, SLOT_GLYPH, theme.slot_style());
                }
            } else {
                layout_row(&mut layout, children)?;
            }
        }
        "mfrac" => {
            let [numerator, denominator] = take_children::<2>(&tag, children)?;
            let width = grow(numerator.width.max(denominator.width), 2)?;
            layout.width = width;
            layout.baseline = numerator.height;
            layout.height = grow(grow(numerator.height, 1)?, denominator.height)?;
            layout.glyph(
                0,
                layout.baseline,
                RULE_GLYPH.repeat(width as usize),
                theme.rule_style(),
            );
            let denominator_y = layout.baseline + 1;
            layout
                .children
                .push(((width - numerator.width) / 2, 0, numerator));
            layout
                .children
                .push(((width - denominator.width) / 2, denominator_y, denominator));
        }
        "msqrt" => {
            let content = if children.len() == 1 && children[0].tag == "mrow" {
                children.into_iter().next()
            } else {
                let mut row = layout.clone();
                row.tag = "mrow".to_string();
                row.marker = None;
                layout_row(&mut row, children)?;
                Some(row)
            };
            let Some(content) = content else {
                return Err(TypesetError::Markup("empty <msqrt>".to_string()));
            };
            layout_radical(&mut layout, content, None, theme)?;
        }
        "mroot" => {
            let [base, index] = take_children::<2>(&tag, children)?;
            layout_radical(&mut layout, base, Some(index), theme)?;
        }
        "msub" => {
            let [base, sub] = take_children::<2>(&tag, children)?;
            layout_scripts(&mut layout, base, Some(sub), None)?;
        }
        "msup" => {
            let [base, sup] = take_children::<2>(&tag, children)?;
            layout_scripts(&mut layout, base, None, Some(sup))?;
        }
        "msubsup" => {
            let [base, sub, sup] = take_children::<3>(&tag, children)?;
            layout_scripts(&mut layout, base, Some(sub), Some(sup))?;
        }
        other => return Err(TypesetError::Markup(format!("cannot lay out <{other}>"))),
    }
    Ok(layout)
}

fn take_children<const N: usize>(
    tag: &str,
    children: Vec<LayoutBox>,
) -> Result<[LayoutBox; N], TypesetError> {
    let found = children.len();
    children.try_into().map_err(|_| {
        TypesetError::Markup(format!("<{tag}> needs {N} children, found {found}"))
    })
}

/// Children side by side, aligned on their baselines.
fn layout_row(layout: &mut LayoutBox, children: Vec<LayoutBox>) -> Result<(), TypesetError> {
    let ascent = children.iter().map(|child| child.baseline).max().unwrap_or(0);
    let descent = children.iter().map(LayoutBox::descent).max().unwrap_or(1);
    layout.baseline = ascent;
    layout.height = grow(ascent, descent)?;
    let mut x = 0;
    for child in children {
        let y = ascent - child.baseline;
        let width = child.width;
        layout.children.push((x, y, child));
        x = grow(x, width)?;
    }
    layout.width = x;
    Ok(())
}

fn layout_radical(
    layout: &mut LayoutBox,
    base: LayoutBox,
    index: Option<LayoutBox>,
    theme: &Theme,
) -> Result<(), TypesetError> {
    let (index_width, index_height) = index
        .as_ref()
        .map_or((0, 0), |index| (index.width, index.height));
    let top = index_height.max(1);
    let sign_x = index_width;
    let base_x = grow(sign_x, 1)?;

    layout.width = grow(base_x, base.width)?;
    layout.height = grow(top, base.height)?;
    layout.baseline = top + base.baseline;
    layout.glyph(sign_x, layout.baseline, RADICAL_GLYPH, theme.rule_style());
    layout.glyph(
        base_x,
        top - 1,
        RULE_GLYPH.repeat(base.width as usize),
        theme.rule_style(),
    );
    layout.children.push((base_x, top, base));
    if let Some(index) = index {
        layout.children.push((0, top - index_height, index));
    }
    Ok(())
}

fn layout_scripts(
    layout: &mut LayoutBox,
    base: LayoutBox,
    sub: Option<LayoutBox>,
    sup: Option<LayoutBox>,
) -> Result<(), TypesetError> {
    let sup_height = sup.as_ref().map_or(0, |sup| sup.height);
    let base_y = sup_height.saturating_sub(base.baseline);
    let script_x = base.width;

    layout.height = grow(base_y, base.height)?;
    let baseline = base_y + base.baseline;
    layout.baseline = baseline;
    layout.width = base.width;
    layout.children.push((0, base_y, base));

    if let Some(sup) = sup {
        layout.width = layout.width.max(grow(script_x, sup.width)?);
        layout.children.push((script_x, baseline - sup.height, sup));
    }
    if let Some(sub) = sub {
        let sub_y = grow(baseline, 1)?;
        layout.width = layout.width.max(grow(script_x, sub.width)?);
        layout.height = layout.height.max(grow(sub_y, sub.height)?);
        layout.children.push((script_x, sub_y, sub));
    }
    Ok(())
}

fn place(layout: &LayoutBox, x: u16, y: u16, canvas: &mut Canvas) -> RenderedBox {
    for glyph in &layout.glyphs {
        canvas.paint(
            x.saturating_add(glyph.x),
            y.saturating_add(glyph.y),
            &glyph.text,
            glyph.style,
        );
    }
    let children = layout
        .children
        .iter()
        .map(|(dx, dy, child)| place(child, x.saturating_add(*dx), y.saturating_add(*dy), canvas))
        .collect();
    RenderedBox {
        tag: layout.tag.clone(),
        marker: layout.marker,
        area: Rect::new(x, y, layout.width, layout.height),
        children,
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Cell {
    Blank,
    Glyph(char, Style),
    /// Right half of a double-width glyph.
    Covered,
}

/// Fixed-size grid the glyphs are painted onto.
#[derive(Debug)]
struct Canvas {
    rows: Vec<Vec<Cell>>,
}

impl Canvas {
    fn new(width: u16, height: u16) -> Self {
        Self {
            rows: vec![vec![Cell::Blank; width as usize]; height as usize],
        }
    }

    fn paint(&mut self, x: u16, y: u16, text: &str, style: Style) {
        let Some(row) = self.rows.get_mut(y as usize) else {
            return;
        };
        let mut column = x as usize;
        for ch in text.chars() {
            let width = UnicodeWidthChar::width(ch).unwrap_or(0);
            if width == 0 {
                continue;
            }
            if column + width > row.len() {
                break;
            }
            row[column] = Cell::Glyph(ch, style);
            for covered in 1..width {
                row[column + covered] = Cell::Covered;
            }
            column += width;
        }
    }

    fn into_lines(self) -> Vec<Line<'static>> {
        self.rows
            .into_iter()
            .map(|row| {
                let mut spans: Vec<Span<'static>> = Vec::new();
                let mut text = String::new();
                let mut style = Style::default();
                for cell in row {
                    let (ch, cell_style) = match cell {
                        Cell::Covered => continue,
                        Cell::Blank => (' ', Style::default()),
                        Cell::Glyph(ch, cell_style) => (ch, cell_style),
                    };
                    if cell_style != style && !text.is_empty() {
                        spans.push(Span::styled(std::mem::take(&mut text), style));
                    }
                    style = cell_style;
                    text.push(ch);
                }
                if !text.is_empty() {
                    spans.push(Span::styled(text, style));
                }
                Line::from(spans)
            })
            .collect()
    }
}

fn cell_width(text: &str) -> Result<u16, TypesetError> {
    let width = text
        .chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum::<usize>();
    u16::try_from(width).map_err(|_| TypesetError::TooLarge)
}
