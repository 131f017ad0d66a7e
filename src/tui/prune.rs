//! Stale-branch cleanup for `jg prune`.

use super::branch_picker::spawn_branch_diff;
use super::diff_view::{DiffAction, DiffPane};
use super::input::{confirm_answer, navigation_delta, Selection};
use super::toast::Toasts;
use super::ui::layout::picker_areas;
use super::ui::modals::{draw_confirm, draw_context_bar, draw_footer, draw_toasts};
use super::ui::status::{AMBER, CYAN, GREEN};
use super::ui::{draw_table, table_page_size};
use super::{ContextBar, Screen, TaskChannel};
use crate::git::branches::{PruneCandidate, Tracking};
use crate::git::Git;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Constraint,
    style::{Modifier, Style},
    text::Span,
    widgets::{Cell, Row},
    Frame,
};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub deleted: Vec<String>,
    pub switch_to: Option<String>,
}

pub struct PrunePicker {
    git: Git,
    branches: Vec<PruneCandidate>,
    selected: BTreeSet<String>,
    deleted: Vec<String>,
    context: ContextBar,
    selection: Selection,
    confirming: bool,
    diff: Option<DiffPane>,
    diff_tasks: TaskChannel<String>,
    toasts: Toasts,
    page: usize,
}

impl PrunePicker {
    pub fn new(git: Git, branches: Vec<PruneCandidate>, context: ContextBar) -> Self {
        Self {
            git,
            branches,
            selected: BTreeSet::new(),
            deleted: Vec::new(),
            context,
            selection: Selection::default(),
            confirming: false,
            diff: None,
            diff_tasks: TaskChannel::new(),
            toasts: Toasts::default(),
            page: 10,
        }
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    fn cursor_branch(&self) -> Option<String> {
        self.branches
            .get(self.selection.index())
            .map(|b| b.name.clone())
    }

    fn toggle_current(&mut self) {
        if let Some(name) = self.cursor_branch() {
            if !self.selected.remove(&name) {
                self.selected.insert(name);
            }
        }
    }

    fn toggle_all(&mut self) {
        let all: BTreeSet<String> = self.branches.iter().map(|b| b.name.clone()).collect();
        if self.selected == all {
            self.selected.clear();
        } else {
            self.selected = all;
        }
    }

    fn outcome(&mut self, switch_to: Option<String>) -> PruneOutcome {
        PruneOutcome {
            deleted: std::mem::take(&mut self.deleted),
            switch_to,
        }
    }

    /// Delete every selected branch; failures stay in the list as toasts.
    fn delete_selected(&mut self) {
        for name in std::mem::take(&mut self.selected) {
            match self.git.delete_branch(&name) {
                Ok(()) => {
                    tracing::info!("Deleted branch {}", name);
                    self.branches.retain(|b| b.name != name);
                    self.deleted.push(name);
                }
                Err(e) => {
                    self.toasts.error(format!("Failed: {name}: {e}"));
                    self.selected.insert(name);
                }
            }
        }
        self.selection.clamp(self.branches.len());
    }
}

fn status_style(tracking: Tracking) -> Style {
    match tracking {
        Tracking::UpstreamGone => Style::default().fg(AMBER),
        _ => Style::default().fg(CYAN),
    }
}

impl Screen for PrunePicker {
    type Outcome = PruneOutcome;

    fn draw(&mut self, f: &mut Frame) {
        let areas = picker_areas(f.area(), false, false);
        draw_context_bar(f, areas.context, &self.context);
        self.page = table_page_size(areas.body);

        let rows: Vec<Row> = self
            .branches
            .iter()
            .map(|b| {
                let marker = if self.selected.contains(&b.name) { "●" } else { " " };
                Row::new(vec![
                    Cell::from(Span::styled(marker, Style::default().fg(GREEN).add_modifier(Modifier::BOLD))),
                    Cell::from(Span::styled(b.name.clone(), Style::default().fg(CYAN))),
                    Cell::from(Span::styled(b.tracking.status_label(), status_style(b.tracking))),
                ])
            })
            .collect();
        let title = format!("Stale branches ({}, {} selected)", self.branches.len(), self.selected.len());
        draw_table(
            f,
            areas.body,
            &title,
            &[" ", "Branch", "Status"],
            &[Constraint::Length(3), Constraint::Min(20), Constraint::Length(16)],
            rows,
            (!self.branches.is_empty()).then(|| self.selection.index()),
        );
        draw_footer(
            f,
            areas.footer,
            &[
                ("space", "select"),
                ("a", "all"),
                ("d", "diff"),
                ("x", "delete"),
                ("s", "switch"),
                ("esc", "quit"),
            ],
        );

        if self.confirming {
            draw_confirm(f, &format!("Delete {} selected branch(es)?", self.selected.len()));
        }
        if let Some(diff) = &mut self.diff {
            diff.draw(f);
        }
        draw_toasts(f, &self.toasts);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<Option<PruneOutcome>> {
        if let Some(diff) = &mut self.diff {
            if diff.handle_key(key) == DiffAction::Close {
                self.diff_tasks.invalidate();
                self.diff = None;
            }
            return Ok(None);
        }
        if self.confirming {
            match confirm_answer(key) {
                None => {}
                Some(answer) => {
                    self.confirming = false;
                    if answer {
                        self.delete_selected();
                        if self.branches.is_empty() {
                            return Ok(Some(self.outcome(None)));
                        }
                    }
                }
            }
            return Ok(None);
        }
        if let Some(delta) = navigation_delta(key, self.page) {
            self.selection.move_by(delta, self.branches.len());
            return Ok(None);
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(Some(self.outcome(None))),
            KeyCode::Char(' ') => self.toggle_current(),
            KeyCode::Char('a') => self.toggle_all(),
            KeyCode::Char('x') => {
                if self.selected.is_empty() {
                    self.toasts.warn("No branches selected — press Space to select.");
                } else {
                    self.confirming = true;
                }
            }
            KeyCode::Char('d') => {
                if let Some(name) = self.cursor_branch() {
                    self.diff = Some(spawn_branch_diff(&self.git, &mut self.diff_tasks, &name));
                }
            }
            KeyCode::Char('s') => {
                if let Some(name) = self.cursor_branch() {
                    return Ok(Some(self.outcome(Some(name))));
                }
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn picker() -> PrunePicker {
        PrunePicker::new(
            Git::new(),
            vec![
                PruneCandidate {
                    name: "SWY-1-a".into(),
                    tracking: Tracking::UpstreamGone,
                },
                PruneCandidate {
                    name: "SWY-2-b".into(),
                    tracking: Tracking::NeverPushed,
                },
            ],
            ContextBar::default(),
        )
    }

    #[test]
    fn test_select_all_toggles() {
        let mut p = picker();
        p.handle_key(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(p.selected().len(), 1);
        p.handle_key(key(KeyCode::Char('a'))).unwrap();
        assert_eq!(p.selected().len(), 2);
        p.handle_key(key(KeyCode::Char('a'))).unwrap();
        assert!(p.selected().is_empty());
    }

    #[test]
    fn test_delete_without_selection_warns() {
        let mut p = picker();
        assert_eq!(p.handle_key(key(KeyCode::Char('x'))).unwrap(), None);
        assert!(!p.confirming);
        assert!(!p.toasts.is_empty());
    }

    #[test]
    fn test_declined_confirmation_keeps_branches() {
        let mut p = picker();
        p.handle_key(key(KeyCode::Char(' '))).unwrap();
        p.handle_key(key(KeyCode::Char('x'))).unwrap();
        assert!(p.confirming);
        p.handle_key(key(KeyCode::Char('n'))).unwrap();
        assert!(!p.confirming);
        assert_eq!(p.branches.len(), 2);
    }

    #[test]
    fn test_switch_returns_cursor_branch() {
        let mut p = picker();
        p.handle_key(key(KeyCode::Char('j'))).unwrap();
        assert_eq!(
            p.handle_key(key(KeyCode::Char('s'))).unwrap(),
            Some(PruneOutcome {
                deleted: Vec::new(),
                switch_to: Some("SWY-2-b".into()),
            })
        );
    }
}
