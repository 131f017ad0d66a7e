//! Pull request picker for `jg prs`.

use super::diff_view::{DiffAction, DiffPane};
use super::input::{navigation_delta, FilterAction, FilterBar, Selection};
use super::toast::Toasts;
use super::ui::layout::{pad_to_width, picker_areas};
use super::ui::modals::{draw_context_bar, draw_filter_bar, draw_footer, draw_toasts};
use super::ui::status::{dim_style, text_style, StatusConfigurable, AMBER, CYAN, PURPLE};
use super::ui::{draw_table, table_page_size};
use super::{ContextBar, Screen, TaskChannel};
use crate::data::PullRequest;
use crate::integrations::github::{self, NO_DIFF};
use crate::util::open_url;
use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint},
    style::Style,
    text::Span,
    widgets::{Cell, Row},
    Frame,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrOutcome {
    Closed,
    /// Switch to the PR's source branch.
    Switch(String),
}

/// Parse the timestamps the tracker (`+0000`) and `gh` (`Z`) return.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// "5m ago", "3h ago", "12d ago"; the raw date when unparseable.
pub fn relative_age(raw: &str, now: DateTime<Utc>) -> String {
    let Some(time) = parse_timestamp(raw) else {
        return raw.chars().take(10).collect();
    };
    let age = now.signed_duration_since(time);
    if age.num_minutes() < 1 {
        "just now".to_string()
    } else if age.num_hours() < 1 {
        format!("{}m ago", age.num_minutes())
    } else if age.num_days() < 1 {
        format!("{}h ago", age.num_hours())
    } else {
        format!("{}d ago", age.num_days())
    }
}

pub struct PrPicker {
    prs: Vec<PullRequest>,
    context: ContextBar,
    filter: FilterBar,
    selection: Selection,
    diff: Option<DiffPane>,
    diff_tasks: TaskChannel<String>,
    toasts: Toasts,
    page: usize,
}

impl PrPicker {
    pub fn new(prs: Vec<PullRequest>, context: ContextBar) -> Self {
        Self {
            prs,
            context,
            filter: FilterBar::new(),
            selection: Selection::default(),
            diff: None,
            diff_tasks: TaskChannel::new(),
            toasts: Toasts::default(),
            page: 10,
        }
    }

    pub fn visible(&self) -> Vec<&PullRequest> {
        let query = self.filter.query();
        self.prs.iter().filter(|pr| pr.matches(query)).collect()
    }

    pub fn selected(&self) -> Option<&PullRequest> {
        self.visible().get(self.selection.index()).copied()
    }

    fn open_selected(&mut self) {
        let Some(url) = self.selected().map(|pr| pr.url.clone()) else { return };
        if url.is_empty() {
            return;
        }
        if let Err(e) = open_url(&url) {
            self.toasts.warn(format!("Could not open browser: {e}"));
        }
    }

    fn show_diff(&mut self) {
        let Some(pr) = self.selected() else { return };
        let (title, url) = (pr.title.clone(), pr.url.clone());
        self.diff_tasks.invalidate();
        self.diff_tasks.spawn("pr diff", async move {
            github::pr_diff(&url).await.unwrap_or_else(|| NO_DIFF.to_string())
        });
        self.diff = Some(DiffPane::loading(title));
    }
}

impl Screen for PrPicker {
    type Outcome = PrOutcome;

    fn draw(&mut self, f: &mut Frame) {
        let areas = picker_areas(f.area(), false, self.filter.is_visible());
        draw_context_bar(f, areas.context, &self.context);
        self.page = table_page_size(areas.body);

        let now = Utc::now();
        let rows: Vec<Row> = self
            .visible()
            .iter()
            .map(|pr| {
                let status = pr.status.status_config();
                Row::new(vec![
                    Cell::from(Span::styled(
                        format!("{} {}", status.icon, pr.status.label()),
                        status.style,
                    )),
                    Cell::from(Span::styled(pr.author.clone(), Style::default().fg(PURPLE))),
                    Cell::from(Span::styled(pr.repository.clone(), Style::default().fg(AMBER))),
                    Cell::from(Span::styled(pr.source_branch.clone(), Style::default().fg(CYAN))),
                    Cell::from(Span::styled(pr.title.clone(), text_style())),
                    Cell::from(Span::styled(
                        pad_to_width(&relative_age(&pr.last_update, now), 9, Alignment::Right),
                        dim_style(),
                    )),
                ])
            })
            .collect();
        let len = rows.len();
        self.selection.clamp(len);
        draw_table(
            f,
            areas.body,
            &format!("Pull requests ({len})"),
            &["Status", "Author", "Repo", "Source branch", "Title", "Updated"],
            &[
                Constraint::Length(10),
                Constraint::Length(20),
                Constraint::Length(20),
                Constraint::Length(26),
                Constraint::Min(20),
                Constraint::Length(9),
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
                ("enter/o", "open"),
                ("d", "diff"),
                ("s", "switch branch"),
                ("/", "filter"),
                ("esc", "quit"),
            ],
        );

        if let Some(diff) = &mut self.diff {
            diff.draw(f);
        }
        draw_toasts(f, &self.toasts);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<Option<PrOutcome>> {
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
            KeyCode::Esc | KeyCode::Char('q') => return Ok(Some(PrOutcome::Closed)),
            KeyCode::Enter | KeyCode::Char('o') => self.open_selected(),
            KeyCode::Char('d') => self.show_diff(),
            KeyCode::Char('s') => {
                if let Some(branch) = self.selected().map(|pr| pr.source_branch.clone()) {
                    if branch.is_empty() {
                        self.toasts.warn("No source branch found for this PR.");
                    } else {
                        return Ok(Some(PrOutcome::Switch(branch)));
                    }
                }
            }
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
