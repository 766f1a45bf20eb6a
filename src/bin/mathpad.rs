use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use tracing_appender::non_blocking::WorkerGuard;

use mathpad_tui::config::EditorConfig;
use mathpad_tui::editor::{MathEditor, MathNode, markup};
use mathpad_tui::editor_display::EditorDisplay;
use mathpad_tui::theme::Theme;
use mathpad_tui::typeset::TerminalTypesetter;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const TICK_RATE: Duration = Duration::from_millis(50);
const MOUSE_SCROLL_LINES: usize = 3;
const LOG_FILE: &str = "mathpad.log";

struct Args {
    path: PathBuf,
    placeholder: Option<String>,
}

impl Args {
    fn parse() -> Option<Self> {
        let mut path = None;
        let mut placeholder = None;
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            if arg == "--placeholder" {
                placeholder = args.next();
            } else if path.is_none() {
                path = Some(PathBuf::from(arg));
            }
        }
        Some(Self {
            path: path?,
            placeholder,
        })
    }
}

fn main() -> Result<()> {
    run()
}

fn left_padding_for(width: u16) -> u16 {
    if width < 20 {
        0
    } else if width < 60 {
        1
    } else {
        2
    }
}

fn run() -> Result<()> {
    let Some(args) = Args::parse() else {
        eprintln!("Usage: mathpad <file.mml> [--placeholder <text>]");
        return Ok(());
    };
    let _log_guard = configure_logging();

    let (value, initial_status) = load_document(&args.path)?;
    let theme = Theme::default();
    let mut config = EditorConfig::default();
    if let Some(placeholder) = args.placeholder.as_deref() {
        config = config.with_placeholder(placeholder);
    }
    let mut editor = MathEditor::new(Box::new(TerminalTypesetter::new(theme.clone())), config);
    editor
        .set_value(&value)
        .context("loaded document was rejected")?;
    let mut app = App::new(editor, theme, args.path, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )
    .context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");
    app.display.destroy();

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )
    .ok();
    terminal.show_cursor().ok();

    if let Err(err) = &res {
        tracing::error!(error = ?err, "mathpad exited with an error");
    }
    res
}

/// Log to a file next to the document; the terminal belongs to the UI.
fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()
        .map(|_| guard)
}

fn load_document(path: &Path) -> Result<(MathNode, Option<String>)> {
    if !path.exists() {
        return Ok((MathNode::document(Vec::new()), Some("New document".to_string())));
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    match markup::parse_markup(&content) {
        Ok(value) => {
            tracing::info!(file = %path.display(), nodes = value.node_count(), "document loaded");
            Ok((value, None))
        }
        Err(err) => {
            tracing::warn!(file = %path.display(), error = %err, "could not parse document");
            let message = format!("Parse error: {err}. Starting with empty document.");
            Ok((MathNode::document(Vec::new()), Some(message)))
        }
    }
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit() {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
            needs_redraw = true;
        }

        if last_tick.elapsed() >= TICK_RATE {
            if app.on_tick(Instant::now()) {
                needs_redraw = true;
            }
            last_tick = Instant::now();
        }
    }

    Ok(())
}

struct App {
    display: EditorDisplay,
    theme: Theme,
    file_path: PathBuf,
    scroll_top: usize,
    should_quit: bool,
    dirty: bool,
    status_message: Option<(String, Instant)>,
}

impl App {
    fn new(
        editor: MathEditor,
        theme: Theme,
        path: PathBuf,
        initial_status: Option<String>,
    ) -> Self {
        let startup_status = editor.startup_error().map(|err| err.to_string());
        let mut display = EditorDisplay::new(editor);
        display.focus(Instant::now());

        Self {
            display,
            theme,
            file_path: path,
            scroll_top: 0,
            should_quit: false,
            dirty: false,
            status_message: startup_status
                .or(initial_status)
                .map(|msg| (msg, Instant::now())),
        }
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn has_status_message(&self) -> bool {
        self.status_message.is_some()
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let text_area = vertical[0];
        let status_area = vertical[1];

        let padding = left_padding_for(text_area.width);
        self.display.set_left_padding(padding);
        let lines = self.display.rendered_lines().to_vec();
        let total_lines = lines.len();
        self.display.update_after_render(text_area, total_lines);
        self.scroll_top = self.display.scroll_top_for_caret(self.scroll_top);

        let formula_area = Rect {
            x: text_area.x + padding,
            width: text_area.width.saturating_sub(padding),
            ..text_area
        };
        let paragraph = Paragraph::new(Text::from(lines))
            .block(Block::default().borders(Borders::NONE))
            .style(ratatui::style::Style::default().bg(self.theme.background))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, formula_area);

        if self.display.caret_visible()
            && let Some((x, y)) = self.display.caret_screen_position(self.scroll_top)
        {
            frame.set_cursor_position(Position::new(x, y));
        }

        let status_line = self.status_line(status_area.width as usize);
        let status_widget = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::NONE))
            .style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();

        let position = self.caret_text();
        if let Some((message, _)) = &self.status_message {
            let style = if self.display.is_inert() {
                self.theme.error_style()
            } else {
                self.theme.status_bar_style()
            };
            return Line::from(vec![
                Span::raw(format!("{} ", position)),
                Span::styled(message.clone(), style),
            ]);
        }

        let filename = self.file_path.display().to_string();
        let marker = if self.dirty { "*" } else { "" };
        let node_count = self.display.tree().len().saturating_sub(1);

        // Least important first; dropped from the front when space runs out.
        let all_shortcuts = ["/:Frac", "^:Sup", "_:Sub", "^R:Sqrt", "^S:Save", "^Q:Quit"];

        let mut spans = vec![
            Span::raw(position),
            Span::raw(" "),
            Span::styled(format!("{}{}", filename, marker), self.theme.filename_style()),
            Span::raw(format!(", {} nodes", node_count)),
        ];

        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();
        let min_padding = 1;
        let mut shortcuts_to_show = Vec::new();
        let mut shortcuts_width = 0;
        for shortcut in all_shortcuts.iter().rev() {
            let test_width = if shortcuts_to_show.is_empty() {
                shortcut.chars().count()
            } else {
                shortcuts_width + 1 + shortcut.chars().count()
            };
            if left_width + min_padding + test_width <= terminal_width {
                shortcuts_to_show.insert(0, *shortcut);
                shortcuts_width = test_width;
            } else {
                break;
            }
        }

        if !shortcuts_to_show.is_empty() {
            let padding_needed = terminal_width
                .saturating_sub(left_width)
                .saturating_sub(shortcuts_width)
                .max(min_padding);
            spans.push(Span::raw(" ".repeat(padding_needed)));
            spans.push(Span::raw(shortcuts_to_show.join(" ")));
        }

        Line::from(spans)
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
            && !self.display.is_inert()
        {
            self.status_message = None;
        }
    }

    fn scroll_by_lines(&mut self, delta: isize) {
        self.display.set_cursor_following(false);
        let max_scroll = self
            .display
            .last_total_lines()
            .saturating_sub(self.display.last_view_height());
        self.scroll_top = self
            .scroll_top
            .saturating_add_signed(delta)
            .min(max_scroll);
    }

    fn handle_mouse_event(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::ScrollUp => self.scroll_by_lines(-(MOUSE_SCROLL_LINES as isize)),
            MouseEventKind::ScrollDown => self.scroll_by_lines(MOUSE_SCROLL_LINES as isize),
            MouseEventKind::Down(MouseButton::Left) => {
                let now = Instant::now();
                self.display.focus(now);
                // Clicks only hit geometry of the current tree; land queued renders.
                self.display.tick(now);
                self.display
                    .click_at(event.column, event.row, self.scroll_top);
            }
            _ => {}
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) => {
                self.display.set_cursor_following(true);
                match (code, modifiers) {
                    (KeyCode::Char('q'), m) | (KeyCode::Char('c'), m)
                        if m.contains(KeyModifiers::CONTROL) =>
                    {
                        self.should_quit = true;
                    }
                    (KeyCode::Char('s'), m) if m.contains(KeyModifiers::CONTROL) => {
                        if let Err(err) = self.save() {
                            tracing::error!(error = ?err, "save failed");
                            self.status_message = Some((format!("{err:#}"), Instant::now()));
                        }
                    }
                    (KeyCode::Char('r'), m) if m.contains(KeyModifiers::CONTROL) => {
                        if self.display.insert_sqrt() {
                            self.mark_dirty();
                        }
                    }
                    (KeyCode::Left, _) => {
                        self.display.move_left();
                    }
                    (KeyCode::Right, _) => {
                        self.display.move_right();
                    }
                    (KeyCode::Home, _) => {
                        self.display.move_to_start();
                    }
                    (KeyCode::End, _) => {
                        self.display.move_to_end();
                    }
                    (KeyCode::Backspace, _) => {
                        if self.display.backspace() {
                            self.mark_dirty();
                        }
                    }
                    (KeyCode::Delete, _) => {
                        if self.display.delete() {
                            self.mark_dirty();
                        }
                    }
                    (KeyCode::Char('/'), _) => {
                        if self.display.insert_fraction() {
                            self.mark_dirty();
                        }
                    }
                    (KeyCode::Char('^'), _) => {
                        if self.display.attach_superscript() {
                            self.mark_dirty();
                        }
                    }
                    (KeyCode::Char('_'), _) => {
                        if self.display.attach_subscript() {
                            self.mark_dirty();
                        }
                    }
                    (KeyCode::Char(ch), m)
                        if !m.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
                    {
                        let mut buf = [0u8; 4];
                        if self.display.commit_input(ch.encode_utf8(&mut buf)) {
                            self.mark_dirty();
                        }
                    }
                    _ => {}
                }
            }
            Event::Mouse(mouse) => self.handle_mouse_event(mouse),
            Event::FocusGained => self.display.focus(Instant::now()),
            Event::FocusLost => self.display.blur(),
            _ => {}
        }
        Ok(())
    }

    /// Returns true when the screen needs repainting.
    fn on_tick(&mut self, now: Instant) -> bool {
        let had_message = self.has_status_message();
        let changed = self.display.tick(now);
        self.prune_status_message();
        changed || (had_message && !self.has_status_message())
    }

    fn save(&mut self) -> Result<()> {
        let contents = self.display.to_markup();
        fs::write(&self.file_path, contents)
            .with_context(|| format!("failed to write {}", self.file_path.display()))?;
        tracing::info!(file = %self.file_path.display(), "document saved");

        self.dirty = false;
        self.status_message = Some(("Saved".to_string(), Instant::now()));
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn caret_text(&self) -> String {
        match self.display.current_kind() {
            Some(kind) => format!("[{}]", kind.label()),
            None => "[Start]".to_string(),
        }
    }
}
