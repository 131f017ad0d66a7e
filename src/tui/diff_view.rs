//! Full-screen diff viewer with incremental search and file jumps.

use super::input::LineInput;
use super::ui::layout::fit_line_to_width;
use super::ui::modals::{draw_text_modal, input_line};
use super::ui::status::{dim_style, title_style, AMBER, BG, CURSOR_BG, CYAN, GREEN, RED, SURFACE};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffAction {
    Continue,
    Close,
}

#[derive(Debug, Clone)]
pub struct DiffView {
    title: String,
    lines: Vec<String>,
    file_starts: Vec<usize>,
    scroll: usize,
    viewport: usize,
    search: LineInput,
    search_open: bool,
    matches: Vec<usize>,
    current_match: usize,
}

impl DiffView {
    pub fn new(title: impl Into<String>, text: &str) -> Self {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let file_starts = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.starts_with("diff --git"))
            .map(|(i, _)| i)
            .collect();
        Self {
            title: title.into(),
            lines,
            file_starts,
            scroll: 0,
            viewport: 20,
            search: LineInput::new(),
            search_open: false,
            matches: Vec::new(),
            current_match: 0,
        }
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    pub fn query(&self) -> &str {
        self.search.value()
    }

    fn max_scroll(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }

    fn scroll_by(&mut self, delta: isize) {
        let next = (self.scroll as isize + delta).clamp(0, self.max_scroll() as isize);
        self.scroll = next as usize;
    }

    fn recompute_matches(&mut self) {
        let query = self.search.value().to_lowercase();
        self.matches = if query.is_empty() {
            Vec::new()
        } else {
            self.lines
                .iter()
                .enumerate()
                .filter(|(_, l)| l.to_lowercase().contains(&query))
                .map(|(i, _)| i)
                .collect()
        };
        self.current_match = 0;
        if let Some(&first) = self.matches.first() {
            self.scroll = first;
        }
    }

    fn next_match(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        self.current_match = (self.current_match + 1) % self.matches.len();
        self.scroll = self.matches[self.current_match];
    }

    fn jump_file(&mut self, forward: bool) {
        let target = if forward {
            self.file_starts.iter().find(|&&s| s > self.scroll)
        } else {
            self.file_starts.iter().rev().find(|&&s| s < self.scroll)
        };
        if let Some(&line) = target {
            self.scroll = line;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DiffAction {
        if self.search_open {
            match key.code {
                KeyCode::Esc => self.search_open = false,
                KeyCode::Enter => self.next_match(),
                _ => {
                    if self.search.handle_key(key) {
                        self.recompute_matches();
                    }
                }
            }
            return DiffAction::Continue;
        }

        let page = self.viewport.max(1) as isize;
        match key.code {
            KeyCode::Esc if !self.search.is_empty() => {
                self.search.clear();
                self.recompute_matches();
            }
            KeyCode::Esc | KeyCode::Char('q') => return DiffAction::Close,
            KeyCode::Char('/') => self.search_open = true,
            KeyCode::Enter => self.next_match(),
            KeyCode::Char('n') => self.jump_file(true),
            KeyCode::Char('p') => self.jump_file(false),
            KeyCode::Char('j') | KeyCode::Down => self.scroll_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_by(-1),
            KeyCode::PageDown | KeyCode::Char(' ') => self.scroll_by(page),
            KeyCode::PageUp => self.scroll_by(-page),
            KeyCode::Char('g') | KeyCode::Home => self.scroll = 0,
            KeyCode::Char('G') | KeyCode::End => self.scroll = self.max_scroll(),
            _ => {}
        }
        DiffAction::Continue
    }

    /// Status text under the diff while a query is active.
    pub fn search_status(&self) -> Option<String> {
        if !self.search_open && self.search.is_empty() {
            return None;
        }
        let query = self.search.value();
        Some(if self.matches.is_empty() {
            format!(" Search: {query}  no matches — Esc clear")
        } else {
            format!(
                " Search: {query}  {}/{} matches — Enter next  Esc clear",
                self.current_match + 1,
                self.matches.len()
            )
        })
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let area = f.area();
        f.render_widget(Clear, area);

        let status = self.search_status();
        let mut constraints = vec![Constraint::Min(3)];
        if self.search_open {
            constraints.push(Constraint::Length(1));
        }
        constraints.push(Constraint::Length(1));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let body = chunks[0];
        self.viewport = body.height.saturating_sub(2) as usize;
        self.draw_body(f, body);

        let mut idx = 1;
        if self.search_open {
            let line = Line::from(
                [vec![Span::styled(" / ", title_style())], input_line(&self.search, "search…", true).spans].concat(),
            );
            f.render_widget(Paragraph::new(line).style(Style::default().bg(SURFACE)), chunks[idx]);
            idx += 1;
        }

        let footer = status.unwrap_or_else(|| {
            " j/k scroll  PgUp/PgDn page  n/p file  / search  Esc close".to_string()
        });
        f.render_widget(
            Paragraph::new(Span::styled(footer, dim_style())).style(Style::default().bg(SURFACE)),
            chunks[idx],
        );
    }

    fn draw_body(&self, f: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(2) as usize;
        let query = self.search.value().to_lowercase();
        let current = self.matches.get(self.current_match).copied();

        let visible: Vec<Line> = self
            .lines
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(self.viewport)
            .map(|(idx, text)| {
                let mut line = highlight(text, diff_line_style(text), &query);
                if Some(idx) == current {
                    line = line.style(Style::default().bg(CURSOR_BG));
                }
                fit_line_to_width(line, width)
            })
            .collect();

        let position = format!(" {}/{} ", (self.scroll + 1).min(self.lines.len()), self.lines.len());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(GREEN))
            .style(Style::default().bg(BG))
            .title(Span::styled(format!(" {} ", self.title), title_style()))
            .title_bottom(Span::styled(position, dim_style()));
        f.render_widget(Paragraph::new(visible).block(block), area);
    }
}

/// A diff modal whose text is still being produced in the background.
#[derive(Debug, Clone)]
pub enum DiffPane {
    Loading { title: String },
    Ready(DiffView),
}

impl DiffPane {
    pub fn loading(title: impl Into<String>) -> Self {
        Self::Loading { title: title.into() }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Loading { title } => title,
            Self::Ready(view) => &view.title,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn load(&mut self, text: &str) {
        let title = self.title().to_string();
        *self = Self::Ready(DiffView::new(title, text));
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DiffAction {
        match self {
            Self::Loading { .. } if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) => DiffAction::Close,
            Self::Loading { .. } => DiffAction::Continue,
            Self::Ready(view) => view.handle_key(key),
        }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        match self {
            Self::Loading { title } => {
                let lines = vec![Line::from(Span::styled(format!("Loading diff {title}…"), dim_style()))];
                draw_text_modal(f, title, lines, 0, "Esc close");
            }
            Self::Ready(view) => view.draw(f),
        }
    }
}

fn diff_line_style(line: &str) -> Style {
    if line.starts_with("diff --git") {
        Style::default().add_modifier(Modifier::BOLD)
    } else if line.starts_with("@@") {
        Style::default().fg(CYAN)
    } else if line.starts_with('+') {
        Style::default().fg(GREEN)
    } else if line.starts_with('-') {
        Style::default().fg(RED)
    } else {
        Style::default()
    }
}

/// Split `text` into spans, marking case-insensitive occurrences of `query`.
fn highlight(text: &str, base: Style, query: &str) -> Line<'static> {
    let mark = Style::default().fg(BG).bg(AMBER).add_modifier(Modifier::BOLD);
    let lower = text.to_lowercase();
    if query.is_empty() || lower.len() != text.len() {
        let style = if !query.is_empty() && lower.contains(query) { mark } else { base };
        return Line::from(Span::styled(text.to_string(), style));
    }

    let mut spans = Vec::new();
    let mut pos = 0;
    for (start, _) in lower.match_indices(query) {
        if start < pos {
            continue;
        }
        if start > pos {
            spans.push(Span::styled(text[pos..start].to_string(), base));
        }
        let end = start + query.len();
        spans.push(Span::styled(text[start..end].to_string(), mark));
        pos = end;
    }
    if pos < text.len() {
        spans.push(Span::styled(text[pos..].to_string(), base));
    }
    Line::from(spans)
}
