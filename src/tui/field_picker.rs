//! Extra-column picker: choose which tracker fields the ticket table shows
//! for a project.

use super::input::{navigation_delta, FilterAction, FilterBar, Selection};
use super::search::FuzzySearch;
use super::ui::layout::popup_rect;
use super::ui::modals::draw_filter_bar;
use super::ui::status::{text_style, CYAN, DIM, GREEN};
use super::ui::{draw_table, table_page_size};
use crate::data::FieldValue;
use crate::integrations::jira::{non_empty_fields, FieldCatalog};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::Span,
    widgets::{Cell, Clear, Row},
    Frame,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    pub id: String,
    pub name: String,
    pub preview: String,
}

/// One row per non-empty raw field, sorted by lowercase display name.
pub fn field_rows(raw: &Map<String, Value>, catalog: &FieldCatalog) -> Vec<FieldRow> {
    let mut rows: Vec<FieldRow> = non_empty_fields(raw)
        .iter()
        .map(|(id, value)| FieldRow {
            id: id.clone(),
            name: catalog.name_for(id),
            preview: FieldValue::from_json(value)
                .map(|v| v.preview())
                .unwrap_or_default(),
        })
        .collect();
    rows.sort_by_key(|r| r.name.to_lowercase());
    rows
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPickerAction {
    Continue,
    Cancel,
    /// Selected field ids, sorted.
    Save(Vec<String>),
}

pub struct FieldPicker {
    project: String,
    rows: Vec<FieldRow>,
    selected: BTreeSet<String>,
    filter: FilterBar,
    search: FuzzySearch,
    selection: Selection,
    page: usize,
}

impl FieldPicker {
    pub fn new(project: &str, rows: Vec<FieldRow>, current: &[String]) -> Self {
        Self {
            project: project.to_string(),
            rows,
            selected: current.iter().cloned().collect(),
            filter: FilterBar::new(),
            search: FuzzySearch::new(),
            selection: Selection::default(),
            page: 10,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    fn visible(&mut self) -> Vec<usize> {
        let query = self.filter.query().to_string();
        self.search
            .rank(&query, &self.rows, |r| vec![(r.name.as_str(), 3), (r.id.as_str(), 2), (r.preview.as_str(), 1)])
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FieldPickerAction {
        if self.filter.is_focused() {
            if self.filter.handle_key(key) != FilterAction::Done {
                self.selection.reset();
            }
            return FieldPickerAction::Continue;
        }
        let visible = self.visible();
        if let Some(delta) = navigation_delta(key, self.page) {
            self.selection.move_by(delta, visible.len());
            return FieldPickerAction::Continue;
        }
        match key.code {
            KeyCode::Esc if self.filter.is_visible() => {
                self.filter.clear();
                self.selection.reset();
            }
            KeyCode::Esc | KeyCode::Char('q') => return FieldPickerAction::Cancel,
            KeyCode::Char('/') => self.filter.activate(),
            KeyCode::Char(' ') => {
                if let Some(&idx) = visible.get(self.selection.index()) {
                    let id = self.rows[idx].id.clone();
                    if !self.selected.remove(&id) {
                        self.selected.insert(id);
                    }
                }
            }
            KeyCode::Enter => {
                return FieldPickerAction::Save(self.selected.iter().cloned().collect());
            }
            _ => {}
        }
        FieldPickerAction::Continue
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let area = popup_rect(95, 90, 60, 12, f.area());
        f.render_widget(Clear, area);

        let mut constraints = vec![Constraint::Min(3)];
        if self.filter.is_visible() {
            constraints.push(Constraint::Length(3));
        }
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);
        self.page = table_page_size(chunks[0]);

        let visible = self.visible();
        self.selection.clamp(visible.len());
        let rows: Vec<Row> = visible
            .iter()
            .map(|&idx| {
                let row = &self.rows[idx];
                let marker = if self.selected.contains(&row.id) { "✓" } else { " " };
                Row::new(vec![
                    Cell::from(Span::styled(marker, Style::default().fg(GREEN).add_modifier(Modifier::BOLD))),
                    Cell::from(Span::styled(row.name.clone(), Style::default().fg(CYAN))),
                    Cell::from(Span::styled(row.id.clone(), Style::default().fg(DIM))),
                    Cell::from(Span::styled(row.preview.clone(), text_style())),
                ])
            })
            .collect();

        let title = format!("Field picker — {}   Space to toggle · Enter to save", self.project);
        let selected = (!visible.is_empty()).then(|| self.selection.index());
        draw_table(
            f,
            chunks[0],
            &title,
            &[" ", "Field name", "Field ID", "Current value"],
            &[
                Constraint::Length(3),
                Constraint::Length(32),
                Constraint::Length(22),
                Constraint::Min(10),
            ],
            rows,
            selected,
        );
        if let Some(&filter_area) = chunks.get(1) {
            draw_filter_bar(f, filter_area, &self.filter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::jira::FieldInfo;
    use crossterm::event::KeyModifiers;
    use serde_json::json;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn catalog() -> FieldCatalog {
        FieldCatalog::new(vec![
            FieldInfo {
                id: "customfield_1".into(),
                name: "Story Points".into(),
            },
            FieldInfo {
                id: "labels".into(),
                name: "Labels".into(),
            },
        ])
    }

    #[test]
    fn test_field_rows_skip_empty_and_sort_by_name() {
        let raw = json!({
            "customfield_1": 5,
            "labels": ["api"],
            "description": null,
            "components": [],
        });
        let rows = field_rows(raw.as_object().unwrap(), &catalog());
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Labels", "Story Points"]);
        assert_eq!(rows[1].preview, "5");
    }

    #[test]
    fn test_toggle_and_save_sorted() {
        let rows = vec![
            FieldRow {
                id: "z".into(),
                name: "A".into(),
                preview: String::new(),
            },
            FieldRow {
                id: "b".into(),
                name: "B".into(),
                preview: String::new(),
            },
        ];
        let mut picker = FieldPicker::new("SWY", rows, &["b".to_string()]);
        picker.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(
            picker.handle_key(key(KeyCode::Enter)),
            FieldPickerAction::Save(vec!["b".to_string(), "z".to_string()])
        );
    }
}
