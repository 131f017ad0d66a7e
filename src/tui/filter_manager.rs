//! Named filter management for one project, shown over the ticket picker.

use super::input::{confirm_answer, navigation_delta, PromptResult, Selection, TextPrompt};
use super::ui::layout::popup_rect;
use super::ui::modals::{draw_confirm, draw_prompt};
use super::ui::status::{text_style, AMBER, CYAN, GREEN};
use super::ui::{draw_table, table_page_size};
use crate::config::{ConfigError, ConfigStore};
use crate::data::NamedFilter;
use crate::filters::{self, builtin_jql, filter_marker, FilterSession};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Cell, Clear, Paragraph, Row},
    Frame,
};

#[derive(Debug, Clone)]
enum Mode {
    List,
    NewName(TextPrompt),
    NewJql { name: String, prompt: TextPrompt },
    EditJql { name: String, prompt: TextPrompt },
    ConfirmDelete(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterManagerAction {
    Continue,
    /// Closed; `changed` asks the caller to re-fetch.
    Close { changed: bool },
}

#[derive(Debug, Clone)]
pub struct FilterManager {
    project: String,
    filters: Vec<NamedFilter>,
    selection: Selection,
    mode: Mode,
    changed: bool,
    page: usize,
}

impl FilterManager {
    pub fn new(store: &ConfigStore, project: &str) -> Self {
        Self {
            project: project.to_string(),
            filters: store.filters_for(project),
            selection: Selection::default(),
            mode: Mode::List,
            changed: false,
            page: 10,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    fn reload(&mut self, store: &ConfigStore) {
        self.filters = store.filters_for(&self.project);
        self.selection.clamp(self.filters.len());
    }

    fn selected_name(&self) -> Option<String> {
        self.filters
            .get(self.selection.index())
            .map(|f| f.name.clone())
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        store: &mut ConfigStore,
        session: &mut FilterSession,
    ) -> Result<FilterManagerAction, ConfigError> {
        let mode = std::mem::replace(&mut self.mode, Mode::List);
        self.mode = match mode {
            Mode::List => return self.handle_list_key(key, store, session),
            Mode::NewName(mut prompt) => match prompt.handle_key(key) {
                PromptResult::Pending => Mode::NewName(prompt),
                PromptResult::Cancelled => Mode::List,
                PromptResult::Submitted(name) => {
                    if self.filters.iter().any(|f| f.name == name) {
                        Mode::List
                    } else {
                        let prompt = TextPrompt::new("New filter — JQL")
                            .placeholder("project = ...")
                            .initial(builtin_jql(&self.project));
                        Mode::NewJql { name, prompt }
                    }
                }
            },
            Mode::NewJql { name, mut prompt } => match prompt.handle_key(key) {
                PromptResult::Pending => Mode::NewJql { name, prompt },
                PromptResult::Cancelled => Mode::List,
                PromptResult::Submitted(jql) => {
                    filters::add_filter(store, &self.project, NamedFilter { name, jql })?;
                    self.reload(store);
                    Mode::List
                }
            },
            Mode::EditJql { name, mut prompt } => match prompt.handle_key(key) {
                PromptResult::Pending => Mode::EditJql { name, prompt },
                PromptResult::Cancelled => Mode::List,
                PromptResult::Submitted(jql) => {
                    filters::update_filter_jql(store, &self.project, &name, &jql)?;
                    if session.effective_filter_name(store, &self.project).as_deref() == Some(name.as_str()) {
                        self.changed = true;
                    }
                    self.reload(store);
                    Mode::List
                }
            },
            Mode::ConfirmDelete(name) => match confirm_answer(key) {
                None => Mode::ConfirmDelete(name),
                Some(false) => Mode::List,
                Some(true) => {
                    filters::delete_filter(store, session, &self.project, &name)?;
                    self.changed = true;
                    self.reload(store);
                    Mode::List
                }
            },
        };
        Ok(FilterManagerAction::Continue)
    }

    fn handle_list_key(
        &mut self,
        key: KeyEvent,
        store: &mut ConfigStore,
        session: &mut FilterSession,
    ) -> Result<FilterManagerAction, ConfigError> {
        if let Some(delta) = navigation_delta(key, self.page) {
            self.selection.move_by(delta, self.filters.len());
            return Ok(FilterManagerAction::Continue);
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                return Ok(FilterManagerAction::Close {
                    changed: self.changed,
                })
            }
            KeyCode::Enter => {
                if let Some(name) = self.selected_name() {
                    session.toggle_active(store, &self.project, &name);
                    return Ok(FilterManagerAction::Close { changed: true });
                }
            }
            KeyCode::Char(' ') => {
                if let Some(name) = self.selected_name() {
                    session.toggle_default(store, &self.project, &name)?;
                    self.changed = true;
                }
            }
            KeyCode::Char('x') => {
                session.force_unfiltered(&self.project);
                return Ok(FilterManagerAction::Close { changed: true });
            }
            KeyCode::Char('n') => {
                self.mode = Mode::NewName(
                    TextPrompt::new("New filter — name").placeholder("e.g. My Sprint"),
                );
            }
            KeyCode::Char('e') => {
                if let Some(filter) = self.filters.get(self.selection.index()) {
                    self.mode = Mode::EditJql {
                        name: filter.name.clone(),
                        prompt: TextPrompt::new("Edit JQL").initial(filter.jql.clone()),
                    };
                }
            }
            KeyCode::Char('d') => {
                if let Some(name) = self.selected_name() {
                    self.mode = Mode::ConfirmDelete(name);
                }
            }
            _ => {}
        }
        Ok(FilterManagerAction::Continue)
    }

    pub fn draw(&mut self, f: &mut Frame, store: &ConfigStore, session: &FilterSession) {
        let area = popup_rect(95, 90, 60, 12, f.area());
        f.render_widget(Clear, area);
        self.page = table_page_size(area);

        let effective = session.effective_filter_name(store, &self.project);
        let default = store.default_filter(&self.project);
        let rows: Vec<Row> = self
            .filters
            .iter()
            .map(|filter| {
                let marker = filter_marker(&filter.name, effective.as_deref(), default.as_deref());
                Row::new(vec![
                    Cell::from(Span::styled(marker, Style::default().fg(GREEN).add_modifier(Modifier::BOLD))),
                    Cell::from(Span::styled(filter.name.clone(), Style::default().fg(CYAN))),
                    Cell::from(Span::styled(filter.jql.clone(), text_style())),
                ])
            })
            .collect();

        let title = format!(
            "Filters — {}   Enter activate · Space set default · n new · e edit JQL · d delete · x no filter",
            self.project
        );
        let selected = (!self.filters.is_empty()).then(|| self.selection.index());
        draw_table(
            f,
            area,
            &title,
            &[" ", "Name", "JQL"],
            &[Constraint::Length(3), Constraint::Length(28), Constraint::Min(20)],
            rows,
            selected,
        );
        if self.filters.is_empty() {
            let hint = Rect {
                y: area.y + 2,
                height: 1,
                ..area
            };
            f.render_widget(
                Paragraph::new(Span::styled(
                    "  No filters yet. Press n to create one.",
                    Style::default().fg(AMBER),
                )),
                hint,
            );
        }

        match &self.mode {
            Mode::List => {}
            Mode::NewName(prompt) | Mode::NewJql { prompt, .. } | Mode::EditJql { prompt, .. } => {
                draw_prompt(f, prompt)
            }
            Mode::ConfirmDelete(name) => draw_confirm(f, &format!("Delete filter '{name}'?")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(manager: &mut FilterManager, text: &str, store: &mut ConfigStore, session: &mut FilterSession) {
        for c in text.chars() {
            manager.handle_key(key(KeyCode::Char(c)), store, session).unwrap();
        }
    }

    #[test]
    fn test_create_filter_with_prefilled_jql() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config")).unwrap();
        let mut session = FilterSession::new();
        let mut manager = FilterManager::new(&store, "SWY");

        manager.handle_key(key(KeyCode::Char('n')), &mut store, &mut session).unwrap();
        type_text(&mut manager, "Mine", &mut store, &mut session);
        manager.handle_key(key(KeyCode::Enter), &mut store, &mut session).unwrap();
        manager.handle_key(key(KeyCode::Enter), &mut store, &mut session).unwrap();

        let filters = store.filters_for("SWY");
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].name, "Mine");
        assert_eq!(filters[0].jql, builtin_jql("SWY"));
        assert!(!manager.changed());
    }

    #[test]
    fn test_enter_toggles_session_and_closes() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config")).unwrap();
        store
            .set_filters_for(
                "SWY",
                &[NamedFilter {
                    name: "Sprint".into(),
                    jql: "sprint in openSprints()".into(),
                }],
            )
            .unwrap();
        let mut session = FilterSession::new();
        let mut manager = FilterManager::new(&store, "SWY");

        let action = manager
            .handle_key(key(KeyCode::Enter), &mut store, &mut session)
            .unwrap();
        assert_eq!(action, FilterManagerAction::Close { changed: true });
        assert_eq!(
            session.effective_filter_name(&store, "SWY").as_deref(),
            Some("Sprint")
        );
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config")).unwrap();
        store
            .set_filters_for(
                "SWY",
                &[NamedFilter {
                    name: "Old".into(),
                    jql: "x".into(),
                }],
            )
            .unwrap();
        let mut session = FilterSession::new();
        let mut manager = FilterManager::new(&store, "SWY");

        manager.handle_key(key(KeyCode::Char('d')), &mut store, &mut session).unwrap();
        manager.handle_key(key(KeyCode::Char('n')), &mut store, &mut session).unwrap();
        assert_eq!(store.filters_for("SWY").len(), 1);

        manager.handle_key(key(KeyCode::Char('d')), &mut store, &mut session).unwrap();
        manager.handle_key(key(KeyCode::Char('y')), &mut store, &mut session).unwrap();
        assert!(store.filters_for("SWY").is_empty());
        assert!(manager.changed());
    }
}
