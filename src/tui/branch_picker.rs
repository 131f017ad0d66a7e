//! Branch picker and the new-branch prompt used by `jg branch`.

use super::diff_view::{DiffAction, DiffPane};
use super::input::{navigation_delta, FilterAction, FilterBar, PromptResult, Selection, TextPrompt};
use super::toast::Toasts;
use super::ui::layout::picker_areas;
use super::ui::modals::{
    draw_context_bar, draw_filter_bar, draw_footer, draw_toasts, input_line, ticket_info_lines,
};
use super::ui::status::{
    dim_style, text_style, title_style, StatusConfigurable, AMBER, BG, CYAN, DARK, GREEN, SURFACE,
};
use super::ui::{draw_table, table_page_size};
use super::{ContextBar, Screen, TaskChannel};
use crate::data::TicketDetails;
use crate::git::branches::{BranchDescriptor, Tracking};
use crate::git::Git;
use crate::integrations::jira::JiraClient;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Wrap},
    Frame,
};

/// Text shown when `base...branch` has no changes.
pub const NO_DIFFERENCES: &str = "No differences found.";

/// `git diff base...branch` for the diff modal, run on a blocking thread.
pub fn branch_diff_text(git: &Git, base: &str, branch: &str) -> String {
    match git.diff_range(base, branch) {
        Ok(text) if text.trim().is_empty() => NO_DIFFERENCES.to_string(),
        Ok(text) => text,
        Err(e) => format!("Could not diff {base}...{branch}: {e}"),
    }
}

/// Start a diff of `branch` against the default branch on `tasks`.
pub(crate) fn spawn_branch_diff(git: &Git, tasks: &mut TaskChannel<String>, branch: &str) -> DiffPane {
    tasks.invalidate();
    let base = git.default_branch();
    let git = git.clone();
    let title = format!("{base}...{branch}");
    let branch = branch.to_string();
    tasks.spawn_blocking("branch diff", move || branch_diff_text(&git, &base, &branch));
    DiffPane::loading(title)
}

fn tracking_style(tracking: Tracking) -> Style {
    match tracking.kind() {
        "tracked" => Style::default().fg(GREEN),
        "remote" => Style::default().fg(CYAN),
        _ => Style::default().fg(AMBER),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Branch picker
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOutcome {
    Switch(String),
    /// `n`: create a new branch for the ticket instead.
    NewBranch,
    Cancelled,
}

pub struct BranchPicker {
    git: Git,
    branches: Vec<BranchDescriptor>,
    context: ContextBar,
    filter: FilterBar,
    selection: Selection,
    diff: Option<DiffPane>,
    diff_tasks: TaskChannel<String>,
    toasts: Toasts,
    page: usize,
}

impl BranchPicker {
    pub fn new(git: Git, branches: Vec<BranchDescriptor>, context: ContextBar) -> Self {
        let current = branches.iter().position(|b| b.is_current).unwrap_or(0);
        let mut selection = Selection::default();
        selection.set(current, branches.len());
        Self {
            git,
            branches,
            context,
            filter: FilterBar::new(),
            selection,
            diff: None,
            diff_tasks: TaskChannel::new(),
            toasts: Toasts::default(),
            page: 10,
        }
    }

    /// Branches matching the filter on name, tracking kind or status.
    pub fn visible(&self) -> Vec<&BranchDescriptor> {
        let query = self.filter.query().to_lowercase();
        self.branches
            .iter()
            .filter(|b| {
                query.is_empty()
                    || b.name.to_lowercase().contains(&query)
                    || b.tracking.kind().contains(&query)
                    || b.status_label().contains(&query)
            })
            .collect()
    }

    pub fn selected_name(&self) -> Option<String> {
        self.visible()
            .get(self.selection.index())
            .map(|b| b.name.clone())
    }

    fn show_diff(&mut self) {
        if let Some(name) = self.selected_name() {
            self.diff = Some(spawn_branch_diff(&self.git, &mut self.diff_tasks, &name));
        }
    }
}

impl Screen for BranchPicker {
    type Outcome = BranchOutcome;

    fn draw(&mut self, f: &mut Frame) {
        let areas = picker_areas(f.area(), false, self.filter.is_visible());
        draw_context_bar(f, areas.context, &self.context);
        self.page = table_page_size(areas.body);

        let visible = self.visible();
        let rows: Vec<Row> = visible
            .iter()
            .map(|b| {
                let (marker, name_style) = if b.is_current {
                    ("*", Style::default().fg(CYAN).add_modifier(Modifier::BOLD))
                } else {
                    (" ", text_style())
                };
                Row::new(vec![
                    Cell::from(Span::styled(marker, Style::default().fg(GREEN).add_modifier(Modifier::BOLD))),
                    Cell::from(Span::styled(b.name.clone(), name_style)),
                    Cell::from(Span::styled(b.tracking.kind(), tracking_style(b.tracking))),
                    Cell::from(Span::styled(b.status_label(), b.tracking.status_config().style)),
                ])
            })
            .collect();
        let len = rows.len();
        self.selection.clamp(len);
        draw_table(
            f,
            areas.body,
            &format!("Branches ({len})"),
            &[" ", "Branch", "Tracking", "Status"],
            &[
                Constraint::Length(2),
                Constraint::Min(20),
                Constraint::Length(10),
                Constraint::Length(16),
            ],
            rows,
            (len > 0).then(|| self.selection.index()),
        );

        if let Some(area) = areas.filter {
            draw_filter_bar(f, area, &self.filter);
        }
        draw_footer(
            f,
            areas.footer,
            &[
                ("enter", "switch"),
                ("n", "new branch"),
                ("d", "diff"),
                ("/", "filter"),
                ("esc", "quit"),
            ],
        );

        if let Some(diff) = &mut self.diff {
            diff.draw(f);
        }
        draw_toasts(f, &self.toasts);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<Option<BranchOutcome>> {
        if let Some(diff) = &mut self.diff {
            if diff.handle_key(key) == DiffAction::Close {
                self.diff_tasks.invalidate();
                self.diff = None;
            }
            return Ok(None);
        }
        if self.filter.is_focused() {
            if self.filter.handle_key(key) != FilterAction::Done {
                self.selection.reset();
            }
            return Ok(None);
        }
        if let Some(delta) = navigation_delta(key, self.page) {
            let len = self.visible().len();
            self.selection.move_by(delta, len);
            return Ok(None);
        }
        match key.code {
            KeyCode::Esc if self.filter.is_visible() => {
                self.filter.clear();
                self.selection.reset();
            }
            KeyCode::Esc | KeyCode::Char('q') => return Ok(Some(BranchOutcome::Cancelled)),
            KeyCode::Enter => {
                if let Some(name) = self.selected_name() {
                    return Ok(Some(BranchOutcome::Switch(name)));
                }
            }
            KeyCode::Char('n') => return Ok(Some(BranchOutcome::NewBranch)),
            KeyCode::Char('d') => self.show_diff(),
            KeyCode::Char('/') => self.filter.activate(),
            _ => {}
        }
        Ok(None)
    }

    fn on_tick(&mut self) {
        for text in self.diff_tasks.drain() {
            if let Some(diff) = &mut self.diff {
                diff.load(&text);
            }
        }
        self.toasts.on_tick();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Branch prompt
// ─────────────────────────────────────────────────────────────────────────────

enum PromptInfo {
    Loading,
    Ready(TicketDetails),
    Failed(String),
}

/// Shows the ticket and asks for the suffix of `TICKET-<suffix>`.
///
/// The outcome is the trimmed suffix, or `None` when the user escapes.
pub struct BranchPrompt {
    ticket: String,
    client: Option<JiraClient>,
    info: PromptInfo,
    scroll: u16,
    prompt: TextPrompt,
    tasks: TaskChannel<Result<TicketDetails, String>>,
}

impl BranchPrompt {
    pub fn new(ticket: &str, client: Option<JiraClient>) -> Self {
        let prompt = TextPrompt::new(format!("  {ticket}  —  create a branch to continue"))
            .label(format!("  Branch suffix  (→ {ticket}-<suffix>)"))
            .placeholder("e.g. fix-login");
        Self {
            ticket: ticket.to_string(),
            client,
            info: PromptInfo::Loading,
            scroll: 0,
            prompt,
            tasks: TaskChannel::new(),
        }
    }

    /// Fetch ticket details in the background. Needs a tokio runtime.
    pub fn load_info(&mut self) {
        let Some(client) = self.client.clone() else {
            self.info = PromptInfo::Failed("tracker credentials are not configured".to_string());
            return;
        };
        let key = self.ticket.clone();
        self.tasks.spawn("branch prompt info", async move {
            client.ticket_details(&key).await.map_err(|e| e.to_string())
        });
    }

    fn info_lines(&self) -> Vec<Line<'static>> {
        match &self.info {
            PromptInfo::Loading => vec![Line::from(Span::styled("Loading…", dim_style()))],
            PromptInfo::Ready(details) => {
                let server = self.client.as_ref().map(|c| c.server()).unwrap_or_default();
                ticket_info_lines(details, server)
            }
            PromptInfo::Failed(e) => vec![Line::from(Span::styled(
                format!("Error loading ticket info: {e}"),
                Style::default().fg(AMBER),
            ))],
        }
    }
}

impl Screen for BranchPrompt {
    type Outcome = Option<String>;

    fn draw(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(f.area());

        f.render_widget(
            Paragraph::new(Span::styled(self.prompt.title.clone(), title_style()))
                .style(Style::default().bg(DARK)),
            chunks[0],
        );
        f.render_widget(
            Paragraph::new(self.info_lines())
                .style(Style::default().bg(BG))
                .wrap(Wrap { trim: false })
                .scroll((self.scroll, 0)),
            chunks[1],
        );
        let label = self.prompt.label.clone().unwrap_or_default();
        f.render_widget(
            Paragraph::new(Span::styled(label, Style::default().fg(AMBER))).style(Style::default().bg(BG)),
            chunks[2],
        );
        f.render_widget(
            Paragraph::new(input_line(&self.prompt.input, &self.prompt.placeholder, true)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Thick)
                    .border_style(Style::default().fg(GREEN))
                    .style(Style::default().bg(SURFACE)),
            ),
            chunks[3],
        );
        draw_footer(
            f,
            chunks[4],
            &[("enter", "create branch"), ("pgup/pgdn", "scroll"), ("esc", "show ticket branches")],
        );
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<Option<Option<String>>> {
        match key.code {
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(5),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(5),
            _ => match self.prompt.handle_key(key) {
                PromptResult::Pending => {}
                PromptResult::Cancelled => return Ok(Some(None)),
                PromptResult::Submitted(suffix) => return Ok(Some(Some(suffix))),
            },
        }
        Ok(None)
    }

    fn on_tick(&mut self) {
        for result in self.tasks.drain() {
            self.info = match result {
                Ok(details) => PromptInfo::Ready(details),
                Err(e) => PromptInfo::Failed(e),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn branch(name: &str, is_current: bool, tracking: Tracking) -> BranchDescriptor {
        BranchDescriptor {
            name: name.into(),
            is_current,
            tracking,
        }
    }

    fn picker() -> BranchPicker {
        BranchPicker::new(
            Git::new(),
            vec![
                branch("SWY-1-login", false, Tracking::Tracked),
                branch("SWY-1-api", true, Tracking::NeverPushed),
                branch("SWY-1-old", false, Tracking::UpstreamGone),
            ],
            ContextBar::default(),
        )
    }

    #[test]
    fn test_cursor_starts_on_current_branch() {
        let p = picker();
        assert_eq!(p.selected_name().as_deref(), Some("SWY-1-api"));
    }

    #[test]
    fn test_filter_matches_status_column() {
        let mut p = picker();
        p.handle_key(key(KeyCode::Char('/'))).unwrap();
        for c in "deleted".chars() {
            p.handle_key(key(KeyCode::Char(c))).unwrap();
        }
        p.handle_key(key(KeyCode::Enter)).unwrap();
        assert_eq!(p.selected_name().as_deref(), Some("SWY-1-old"));
        assert_eq!(
            p.handle_key(key(KeyCode::Enter)).unwrap(),
            Some(BranchOutcome::Switch("SWY-1-old".into()))
        );
    }

    #[test]
    fn test_new_branch_and_cancel() {
        let mut p = picker();
        assert_eq!(p.handle_key(key(KeyCode::Char('n'))).unwrap(), Some(BranchOutcome::NewBranch));
        assert_eq!(p.handle_key(key(KeyCode::Esc)).unwrap(), Some(BranchOutcome::Cancelled));
    }

    #[test]
    fn test_prompt_returns_trimmed_suffix() {
        let mut prompt = BranchPrompt::new("SWY-9", None);
        assert_eq!(prompt.prompt.title, "  SWY-9  —  create a branch to continue");
        assert_eq!(prompt.handle_key(key(KeyCode::Enter)).unwrap(), None);
        for c in " fix-login ".chars() {
            prompt.handle_key(key(KeyCode::Char(c))).unwrap();
        }
        assert_eq!(
            prompt.handle_key(key(KeyCode::Enter)).unwrap(),
            Some(Some("fix-login".to_string()))
        );
    }

    #[test]
    fn test_prompt_without_client_reports_missing_credentials() {
        let mut prompt = BranchPrompt::new("SWY-9", None);
        prompt.load_info();
        assert!(matches!(prompt.info, PromptInfo::Failed(_)));
        assert_eq!(prompt.handle_key(key(KeyCode::Esc)).unwrap(), Some(None));
    }
}
