//! Stage/unstage picker for `jg add`.
//!
//! Git is never touched while the picker is open, except by the formatter
//! modal. The caller applies the resulting [`StageOps`] afterwards.

use super::input::{navigation_delta, FilterAction, FilterBar, PromptResult, Selection, TextPrompt};
use super::toast::Toasts;
use super::ui::layout::{pad_to_width, truncate_with_ellipsis};
use super::ui::modals::{draw_context_bar, draw_filter_bar, draw_footer, draw_prompt, draw_text_modal, draw_toasts};
use super::ui::status::{
    cursor_style, dim_style, file_label_style, header_style, StatusConfigurable, AMBER, BG, CYAN, DARK, GREEN,
    RED,
};
use super::{ContextBar, Screen, TaskChannel};
use crate::data::FormatterRule;
use crate::fmt::{self, FormatReport};
use crate::git::staging::{Bucket, FileItem, StageOps, StagingSession};
use crate::git::{FileStatus, Git};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Alignment;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Row, Table, TableState},
    Frame,
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePickerOutcome {
    Aborted,
    Apply {
        ops: StageOps,
        commit_message: Option<String>,
    },
}

type FormatResult = Result<FormatReport, String>;

enum Modal {
    None,
    Formatting {
        then_commit: bool,
        report: Option<FormatResult>,
        scroll: u16,
    },
    Commit(TextPrompt),
}

pub struct FilePicker {
    git: Git,
    rules: Vec<FormatterRule>,
    fmt_on_add: bool,
    ticket: Option<String>,
    context: ContextBar,
    staging: StagingSession,
    focus: Bucket,
    cursors: HashMap<Bucket, Selection>,
    filters: HashMap<Bucket, FilterBar>,
    modal: Modal,
    fmt_tasks: TaskChannel<FormatResult>,
    toasts: Toasts,
    page: usize,
}

impl FilePicker {
    pub fn new(
        git: Git,
        staging: StagingSession,
        rules: Vec<FormatterRule>,
        fmt_on_add: bool,
        context: ContextBar,
    ) -> Self {
        let mut picker = Self {
            git,
            rules,
            fmt_on_add,
            ticket: context.ticket.clone(),
            context,
            staging,
            focus: Bucket::Staged,
            cursors: HashMap::new(),
            filters: HashMap::new(),
            modal: Modal::None,
            fmt_tasks: TaskChannel::new(),
            toasts: Toasts::default(),
            page: 5,
        };
        picker.focus = picker.initial_focus();
        picker
    }

    pub fn focus(&self) -> Bucket {
        self.focus
    }

    pub fn staging(&self) -> &StagingSession {
        &self.staging
    }

    fn initial_focus(&self) -> Bucket {
        [Bucket::Modified, Bucket::Deleted, Bucket::Untracked, Bucket::Staged]
            .into_iter()
            .find(|b| self.staging.is_visible(*b) && !self.staging.view(*b).is_empty())
            .unwrap_or(Bucket::Staged)
    }

    fn visible_buckets(&self) -> Vec<Bucket> {
        Bucket::ALL
            .into_iter()
            .filter(|b| self.staging.is_visible(*b))
            .collect()
    }

    /// Items of `bucket` that pass its section filter.
    pub fn rows(&self, bucket: Bucket) -> Vec<FileItem> {
        let query = self
            .filters
            .get(&bucket)
            .map(|f| f.query().to_lowercase())
            .unwrap_or_default();
        self.staging
            .view(bucket)
            .into_iter()
            .filter(|item| query.is_empty() || item.path().to_lowercase().contains(&query))
            .collect()
    }

    fn cycle_focus(&mut self, forward: bool) {
        let buckets = self.visible_buckets();
        let Some(pos) = buckets.iter().position(|b| *b == self.focus) else {
            self.focus = buckets.first().copied().unwrap_or(Bucket::Staged);
            return;
        };
        let len = buckets.len();
        let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
        self.focus = buckets[next];
    }

    fn toggle_current(&mut self) {
        let rows = self.rows(self.focus);
        let cursor = self.cursors.get(&self.focus).copied().unwrap_or_default();
        let Some(item) = rows.get(cursor.index()) else { return };
        self.staging.toggle(self.focus, &item.id);
        let remaining = self.rows(self.focus).len();
        self.cursors.entry(self.focus).or_default().clamp(remaining);
    }

    fn apply(&self, commit_message: Option<String>) -> FilePickerOutcome {
        FilePickerOutcome::Apply {
            ops: self.staging.operations(),
            commit_message,
        }
    }

    fn commit_prompt(&self) -> TextPrompt {
        let mut prompt = TextPrompt::new("Commit message").placeholder("Enter commit message…");
        prompt = match &self.ticket {
            Some(ticket) => prompt.label(format!("Will commit as: {ticket} <message>")),
            None => prompt,
        };
        prompt.hint("Escape to stage files without committing")
    }

    fn start_formatting(&mut self, then_commit: bool) {
        self.fmt_tasks.invalidate();
        let git = self.git.clone();
        let rules = self.rules.clone();
        self.fmt_tasks.spawn_blocking("formatters", move || {
            fmt::run_formatters(&git, &rules).map_err(|e| e.to_string())
        });
        self.modal = Modal::Formatting {
            then_commit,
            report: None,
            scroll: 0,
        };
    }

    /// Re-derive buckets from fresh git output after the formatters ran.
    fn reload_statuses(&mut self) {
        match self.git.file_statuses() {
            Ok(statuses) => self.staging.reload(&statuses),
            Err(e) => self.toasts.error(e.to_string()),
        }
        if !self.staging.is_visible(self.focus) {
            self.focus = self.initial_focus();
        }
        for bucket in Bucket::ALL {
            let len = self.rows(bucket).len();
            self.cursors.entry(bucket).or_default().clamp(len);
        }
    }

    fn confirm(&mut self) -> Option<FilePickerOutcome> {
        if !self.staging.has_staged() {
            return Some(self.apply(None));
        }
        if self.fmt_on_add {
            self.start_formatting(true);
        } else {
            self.modal = Modal::Commit(self.commit_prompt());
        }
        None
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> Option<FilePickerOutcome> {
        match &mut self.modal {
            Modal::None => None,
            Modal::Commit(prompt) => match prompt.handle_key(key) {
                PromptResult::Pending => None,
                PromptResult::Cancelled => Some(self.apply(None)),
                PromptResult::Submitted(message) => Some(self.apply(Some(message))),
            },
            Modal::Formatting {
                then_commit,
                report,
                scroll,
            } => {
                if report.is_none() {
                    return None;
                }
                match key.code {
                    KeyCode::Char('j') | KeyCode::Down => {
                        *scroll = scroll.saturating_add(1);
                        return None;
                    }
                    KeyCode::Char('k') | KeyCode::Up => {
                        *scroll = scroll.saturating_sub(1);
                        return None;
                    }
                    _ => {}
                }
                let then_commit = *then_commit;
                self.modal = Modal::None;
                self.reload_statuses();
                if then_commit {
                    if !self.staging.has_staged() {
                        return Some(self.apply(None));
                    }
                    self.modal = Modal::Commit(self.commit_prompt());
                }
                None
            }
        }
    }

    fn draw_section(&self, f: &mut Frame, area: Rect, bucket: Bucket) {
        let focused = bucket == self.focus;
        let filter = self.filters.get(&bucket).filter(|bar| bar.is_visible());

        let (table_area, filter_area) = match filter {
            Some(_) => {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(2), Constraint::Length(3)])
                    .split(area);
                (chunks[0], Some(chunks[1]))
            }
            None => (area, None),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Thick)
            .border_style(if focused {
                Style::default().fg(GREEN)
            } else {
                Style::default().fg(DARK)
            })
            .style(Style::default().bg(BG))
            .title(Span::styled(
                format!("  {}", bucket.title()),
                Style::default().fg(CYAN).add_modifier(Modifier::BOLD),
            ));

        let staged = bucket == Bucket::Staged;
        let rows: Vec<Row> = self
            .rows(bucket)
            .iter()
            .map(|item| {
                let label = pad_to_width(item.status.label(), 12, Alignment::Left);
                let path_style = match item.status {
                    FileStatus::Added | FileStatus::Untracked => Style::default().fg(RED),
                    FileStatus::Modified | FileStatus::Deleted | FileStatus::Renamed | FileStatus::Copied => {
                        Style::default().fg(AMBER)
                    }
                    _ => item.status.status_config().style,
                };
                Row::new(vec![
                    Cell::from(Span::styled(label, file_label_style(item.status, staged))),
                    Cell::from(Span::styled(item.path().to_string(), path_style)),
                ])
            })
            .collect();

        let header = Row::new(vec![Cell::from("STATUS"), Cell::from("FILE")]).style(header_style());
        let table = Table::new(rows, [Constraint::Length(12), Constraint::Min(10)])
            .header(header)
            .block(block)
            .row_highlight_style(if focused { cursor_style() } else { Style::default() });

        let mut state = TableState::default();
        let cursor = self.cursors.get(&bucket).copied().unwrap_or_default();
        state.select(Some(cursor.index()));
        f.render_stateful_widget(table, table_area, &mut state);

        if let (Some(bar), Some(rect)) = (filter, filter_area) {
            draw_filter_bar(f, rect, bar);
        }
    }

    fn format_report_lines(report: &Option<FormatResult>) -> Vec<Line<'static>> {
        match report {
            None => vec![Line::from(Span::styled("Running formatters…", dim_style()))],
            Some(Err(e)) => vec![Line::from(Span::styled(e.clone(), Style::default().fg(RED)))],
            Some(Ok(FormatReport::Clean)) => vec![Line::from(Span::styled(
                "Nothing to format — working tree clean.",
                dim_style(),
            ))],
            Some(Ok(FormatReport::Rows(rows))) => {
                let mut lines = vec![Line::from(Span::styled(
                    format!("    {:<48} {:<16} {:>4}  NOTE", "FILE", "FORMATTER", "EXIT"),
                    header_style(),
                ))];
                for row in rows {
                    let config = row.outcome.status_config();
                    lines.push(Line::from(vec![
                        Span::styled(format!(" {}  ", config.icon), config.style),
                        Span::raw(format!(
                            "{:<48} {:<16} {:>4}  ",
                            truncate_with_ellipsis(&row.path, 48),
                            row.formatter,
                            row.exit_label()
                        )),
                        Span::styled(row.note.clone(), dim_style()),
                    ]));
                }
                lines
            }
        }
    }
}

impl Screen for FilePicker {
    type Outcome = FilePickerOutcome;

    fn draw(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(4), Constraint::Length(1)])
            .split(f.area());
        draw_context_bar(f, chunks[0], &self.context);

        let buckets = self.visible_buckets();
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints(buckets.iter().map(|_| Constraint::Fill(1)))
            .split(chunks[1]);
        self.page = sections.first().map_or(5, |r| r.height.saturating_sub(3) as usize);
        for (bucket, area) in buckets.iter().zip(sections.iter()) {
            self.draw_section(f, *area, *bucket);
        }

        draw_footer(
            f,
            chunks[2],
            &[
                ("space", "toggle"),
                ("enter", "stage / commit"),
                ("tab", "next section"),
                ("/", "filter"),
                ("f", "format"),
                ("esc", "cancel"),
            ],
        );

        match &self.modal {
            Modal::None => {}
            Modal::Commit(prompt) => draw_prompt(f, prompt),
            Modal::Formatting { report, scroll, .. } => {
                let hint = if report.is_some() {
                    "Press any key to close"
                } else {
                    "Running…"
                };
                draw_text_modal(f, "Format results", Self::format_report_lines(report), *scroll, hint);
            }
        }
        draw_toasts(f, &self.toasts);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<Option<FilePickerOutcome>> {
        if !matches!(self.modal, Modal::None) {
            return Ok(self.handle_modal_key(key));
        }

        let focus = self.focus;
        if let Some(bar) = self.filters.get_mut(&focus).filter(|bar| bar.is_focused()) {
            if bar.handle_key(key) != FilterAction::Done {
                self.cursors.entry(focus).or_default().reset();
            }
            return Ok(None);
        }

        if let Some(delta) = navigation_delta(key, self.page) {
            let len = self.rows(focus).len();
            self.cursors.entry(focus).or_default().move_by(delta, len);
            return Ok(None);
        }

        match key.code {
            KeyCode::Esc => {
                if let Some(bar) = self.filters.get_mut(&focus).filter(|bar| bar.is_visible()) {
                    bar.clear();
                } else {
                    return Ok(Some(FilePickerOutcome::Aborted));
                }
            }
            KeyCode::Tab => self.cycle_focus(true),
            KeyCode::BackTab => self.cycle_focus(false),
            KeyCode::Char(' ') => self.toggle_current(),
            KeyCode::Enter => return Ok(self.confirm()),
            KeyCode::Char('/') => self.filters.entry(focus).or_default().activate(),
            KeyCode::Char('f') => self.start_formatting(false),
            _ => {}
        }
        Ok(None)
    }

    fn on_tick(&mut self) {
        for result in self.fmt_tasks.drain() {
            if let Modal::Formatting { report, .. } = &mut self.modal {
                *report = Some(result);
            }
        }
        self.toasts.on_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{FileEntry, FileStatuses};
    use crossterm::event::KeyModifiers;
    use std::collections::BTreeSet;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn picker(statuses: FileStatuses) -> FilePicker {
        FilePicker::new(
            Git::new(),
            StagingSession::new(&statuses),
            Vec::new(),
            false,
            ContextBar::new(Some("SWY-1".into()), Some("SWY-1-x".into())),
        )
    }

    #[test]
    fn test_focus_starts_on_first_unstaged_section() {
        let p = picker(FileStatuses {
            staged: vec![FileEntry::new('M', "a.rs")],
            untracked: vec![FileEntry::new('?', "b.rs")],
            ..Default::default()
        });
        assert_eq!(p.focus(), Bucket::Modified);
    }

    #[test]
    fn test_nothing_staged_applies_immediately() {
        let mut p = picker(FileStatuses {
            modified: vec![FileEntry::new('M', "a.rs")],
            ..Default::default()
        });
        let outcome = p.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(
            outcome,
            Some(FilePickerOutcome::Apply {
                ops: StageOps::default(),
                commit_message: None
            })
        );
    }

    #[test]
    fn test_stage_then_commit() {
        let mut p = picker(FileStatuses {
            modified: vec![FileEntry::new('M', "a.rs")],
            ..Default::default()
        });
        p.handle_key(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(p.handle_key(key(KeyCode::Enter)).unwrap(), None);
        for c in "fix".chars() {
            p.handle_key(key(KeyCode::Char(c))).unwrap();
        }
        let outcome = p.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(
            outcome,
            Some(FilePickerOutcome::Apply {
                ops: StageOps {
                    to_stage: BTreeSet::from(["a.rs".to_string()]),
                    to_unstage: BTreeSet::new(),
                },
                commit_message: Some("fix".into())
            })
        );
    }

    #[test]
    fn test_escape_in_commit_modal_stages_without_message() {
        let mut p = picker(FileStatuses {
            untracked: vec![FileEntry::new('?', "n.rs")],
            ..Default::default()
        });
        p.handle_key(key(KeyCode::Char(' '))).unwrap();
        p.handle_key(key(KeyCode::Enter)).unwrap();
        match p.handle_key(key(KeyCode::Esc)).unwrap() {
            Some(FilePickerOutcome::Apply { commit_message, ops }) => {
                assert_eq!(commit_message, None);
                assert!(ops.to_stage.contains("n.rs"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_section_filter_and_tab_cycle() {
        let mut p = picker(FileStatuses {
            modified: vec![FileEntry::new('M', "src/a.rs"), FileEntry::new('M', "docs/b.md")],
            deleted: vec![FileEntry::new('D', "old.rs")],
            ..Default::default()
        });
        p.handle_key(key(KeyCode::Char('/'))).unwrap();
        for c in "docs".chars() {
            p.handle_key(key(KeyCode::Char(c))).unwrap();
        }
        p.handle_key(key(KeyCode::Enter)).unwrap();
        let rows = p.rows(Bucket::Modified);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path(), "docs/b.md");

        p.handle_key(key(KeyCode::Tab)).unwrap();
        assert_eq!(p.focus(), Bucket::Deleted);
        p.handle_key(key(KeyCode::Tab)).unwrap();
        assert_eq!(p.focus(), Bucket::Staged);
        p.handle_key(key(KeyCode::BackTab)).unwrap();
        assert_eq!(p.focus(), Bucket::Deleted);
        assert_eq!(p.handle_key(key(KeyCode::Esc)).unwrap(), Some(FilePickerOutcome::Aborted));
    }
}
