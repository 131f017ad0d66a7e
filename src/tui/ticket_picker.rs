//! Ticket picker for `jg set`.
//!
//! Follows the Elm architecture: keys are mapped to a [`Message`] by
//! [`dispatch`] and applied by [`TicketPicker::update`]. Tracker calls for the
//! info panel and the field picker run in the background and are drained on
//! tick; closing the modal that asked for them discards their results.

use super::field_picker::{field_rows, FieldPicker, FieldPickerAction, FieldRow};
use super::filter_manager::{FilterManager, FilterManagerAction};
use super::input::{navigation_delta, FilterAction, FilterBar, Selection};
use super::toast::Toasts;
use super::ui::layout::{picker_areas, truncate_with_ellipsis};
use super::ui::modals::{
    draw_context_bar, draw_filter_bar, draw_footer, draw_text_modal, draw_toasts, ticket_info_lines,
};
use super::ui::status::{dim_style, issue_status_style, text_style, AMBER, CYAN, DIM, PALE, PURPLE, SURFACE};
use super::ui::{draw_table, table_page_size};
use super::{ContextBar, Screen, TaskChannel};
use crate::config::ConfigStore;
use crate::data::hierarchy::{flatten_tree, TreeRow};
use crate::data::{truncate_chars, Issue, TicketDetails};
use crate::filters::FilterSession;
use crate::integrations::jira::{FieldCatalog, JiraClient};
use crate::util::{copy_to_clipboard, open_url};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Constraint,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row},
    Frame,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketOutcome {
    Selected(String),
    /// Configuration or filters changed; fetch again and reopen.
    Reload,
    Cancelled,
}

/// All possible user actions in the ticket picker.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────
    Cancel,
    Select,
    Refresh,

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────
    Move(isize),

    // ─────────────────────────────────────────────────────────────────────────
    // Filter bar
    // ─────────────────────────────────────────────────────────────────────────
    FocusFilter,
    ClearFilter,
    FilterInput(KeyEvent),

    // ─────────────────────────────────────────────────────────────────────────
    // Actions on the selected ticket
    // ─────────────────────────────────────────────────────────────────────────
    ShowInfo,
    OpenInBrowser,
    CopyUrl,
    ShowFields,
    ShowFilters,
    ToggleTree,

    // ─────────────────────────────────────────────────────────────────────────
    // Modals
    // ─────────────────────────────────────────────────────────────────────────
    ModalInput(KeyEvent),

    None,
}

enum InfoContent {
    Loading,
    Ready(TicketDetails),
    Failed(String),
}

enum ModalState {
    None,
    Info {
        key: String,
        content: InfoContent,
        scroll: u16,
    },
    LoadingFields {
        key: String,
    },
    Fields(FieldPicker),
    Filters(FilterManager),
}

type InfoResult = (String, Result<TicketDetails, String>);
type FieldsResult = Result<(String, Vec<FieldRow>), String>;

/// Issues plus everything needed to render and act on them.
pub struct TicketPickerInput {
    pub issues: Vec<Issue>,
    pub extra_fields: Vec<String>,
    pub catalog: FieldCatalog,
    pub projects: Vec<String>,
    pub context: ContextBar,
}

pub struct TicketPicker<'a> {
    store: &'a mut ConfigStore,
    session: &'a mut FilterSession,
    client: JiraClient,
    issues: Vec<Issue>,
    extra_fields: Vec<String>,
    catalog: FieldCatalog,
    projects: Vec<String>,
    context: ContextBar,
    filter: FilterBar,
    selection: Selection,
    tree_mode: bool,
    modal: ModalState,
    toasts: Toasts,
    info_tasks: TaskChannel<InfoResult>,
    field_tasks: TaskChannel<FieldsResult>,
    page: usize,
}

/// Map a key to a message for the picker's current mode.
pub fn dispatch(picker: &TicketPicker<'_>, key: KeyEvent) -> Message {
    if !matches!(picker.modal, ModalState::None) {
        return Message::ModalInput(key);
    }
    if picker.filter.is_focused() {
        return Message::FilterInput(key);
    }
    if let Some(delta) = navigation_delta(key, picker.page) {
        return Message::Move(delta);
    }
    match key.code {
        KeyCode::Esc if picker.filter.is_visible() => Message::ClearFilter,
        KeyCode::Esc | KeyCode::Char('q') => Message::Cancel,
        KeyCode::Enter => Message::Select,
        KeyCode::Char('/') => Message::FocusFilter,
        KeyCode::Char('i') => Message::ShowInfo,
        KeyCode::Char('o') => Message::OpenInBrowser,
        KeyCode::Char('c') => Message::CopyUrl,
        KeyCode::Char('d') => Message::ShowFields,
        KeyCode::Char('f') => Message::ShowFilters,
        KeyCode::Char('r') => Message::Refresh,
        KeyCode::Char('t') => Message::ToggleTree,
        _ => Message::None,
    }
}

impl<'a> TicketPicker<'a> {
    pub fn new(
        store: &'a mut ConfigStore,
        session: &'a mut FilterSession,
        client: JiraClient,
        input: TicketPickerInput,
    ) -> Self {
        Self {
            store,
            session,
            client,
            issues: input.issues,
            extra_fields: input.extra_fields,
            catalog: input.catalog,
            projects: input.projects,
            context: input.context,
            filter: FilterBar::new(),
            selection: Selection::default(),
            tree_mode: false,
            modal: ModalState::None,
            toasts: Toasts::default(),
            info_tasks: TaskChannel::new(),
            field_tasks: TaskChannel::new(),
            page: 10,
        }
    }

    pub fn is_tree_mode(&self) -> bool {
        self.tree_mode
    }

    /// Rows currently shown, in display order.
    pub fn visible_rows(&self) -> Vec<TreeRow> {
        let query = self.filter.query();
        if self.tree_mode {
            return flatten_tree(&self.issues, query, &self.extra_fields);
        }
        self.issues
            .iter()
            .enumerate()
            .filter(|(_, issue)| issue.matches(query, &self.extra_fields))
            .map(|(index, _)| TreeRow {
                index,
                depth: 0,
                matched: true,
            })
            .collect()
    }

    pub fn selected_key(&self) -> Option<String> {
        let rows = self.visible_rows();
        rows.get(self.selection.index())
            .map(|row| self.issues[row.index].key.clone())
    }

    /// Project of the selected issue, else the first configured project.
    fn target_project(&self) -> Option<String> {
        self.selected_key()
            .map(|key| key.split('-').next().unwrap_or(&key).to_string())
            .or_else(|| self.projects.first().cloned())
    }

    pub fn update(&mut self, msg: Message) -> Result<Option<TicketOutcome>> {
        match msg {
            Message::Cancel => return Ok(Some(TicketOutcome::Cancelled)),
            Message::Select => {
                if let Some(key) = self.selected_key() {
                    return Ok(Some(TicketOutcome::Selected(key)));
                }
            }
            Message::Refresh => return Ok(Some(TicketOutcome::Reload)),
            Message::Move(delta) => {
                let len = self.visible_rows().len();
                self.selection.move_by(delta, len);
            }
            Message::FocusFilter => self.filter.activate(),
            Message::ClearFilter => {
                self.filter.clear();
                self.selection.reset();
            }
            Message::FilterInput(key) => {
                if self.filter.handle_key(key) != FilterAction::Done {
                    self.selection.reset();
                }
            }
            Message::ShowInfo => self.show_info(),
            Message::OpenInBrowser => {
                if let Some(key) = self.selected_key() {
                    if let Err(e) = open_url(&self.client.browse_url(&key)) {
                        self.toasts.warn(format!("Could not open browser: {e}"));
                    }
                }
            }
            Message::CopyUrl => {
                if let Some(key) = self.selected_key() {
                    let url = self.client.browse_url(&key);
                    match copy_to_clipboard(&url) {
                        Ok(()) => self.toasts.info(format!("Copied: {url}")),
                        Err(e) => self.toasts.warn(e.to_string()),
                    }
                }
            }
            Message::ShowFields => self.show_fields(),
            Message::ShowFilters => {
                if let Some(project) = self.target_project() {
                    self.modal = ModalState::Filters(FilterManager::new(self.store, &project));
                }
            }
            Message::ToggleTree => {
                let current = self.selected_key();
                self.tree_mode = !self.tree_mode;
                let rows = self.visible_rows();
                let idx = current
                    .and_then(|key| rows.iter().position(|r| self.issues[r.index].key == key))
                    .unwrap_or(0);
                self.selection.set(idx, rows.len());
            }
            Message::ModalInput(key) => return self.handle_modal_key(key),
            Message::None => {}
        }
        Ok(None)
    }

    fn show_info(&mut self) {
        let Some(key) = self.selected_key() else { return };
        self.info_tasks.invalidate();
        let client = self.client.clone();
        let fetch_key = key.clone();
        self.info_tasks.spawn("ticket info", async move {
            let result = client
                .ticket_details(&fetch_key)
                .await
                .map_err(|e| e.to_string());
            (fetch_key, result)
        });
        self.modal = ModalState::Info {
            key,
            content: InfoContent::Loading,
            scroll: 0,
        };
    }

    fn show_fields(&mut self) {
        let Some(key) = self.selected_key() else { return };
        self.field_tasks.invalidate();
        let client = self.client.clone();
        let catalog = self.catalog.clone();
        let fetch_key = key.clone();
        self.field_tasks.spawn("field list", async move {
            let (issue_key, raw) = client.raw_issue(&fetch_key).await.map_err(|e| e.to_string())?;
            let catalog = if catalog.is_empty() {
                client.list_fields().await.map_err(|e| e.to_string())?
            } else {
                catalog
            };
            let project = issue_key.split('-').next().unwrap_or(&issue_key).to_string();
            Ok((project, field_rows(&raw, &catalog)))
        });
        self.modal = ModalState::LoadingFields { key };
    }

    fn close_modal(&mut self) {
        self.info_tasks.invalidate();
        self.field_tasks.invalidate();
        self.modal = ModalState::None;
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> Result<Option<TicketOutcome>> {
        match &mut self.modal {
            ModalState::None => {}
            ModalState::Info { scroll, .. } => match key.code {
                KeyCode::Char('j') | KeyCode::Down => *scroll = scroll.saturating_add(1),
                KeyCode::Char('k') | KeyCode::Up => *scroll = scroll.saturating_sub(1),
                _ => self.close_modal(),
            },
            ModalState::LoadingFields { .. } => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                    self.close_modal();
                }
            }
            ModalState::Fields(picker) => match picker.handle_key(key) {
                FieldPickerAction::Continue => {}
                FieldPickerAction::Cancel => self.close_modal(),
                FieldPickerAction::Save(ids) => {
                    let project = picker.project().to_string();
                    self.store.set_fields_for(&project, &ids)?;
                    return Ok(Some(TicketOutcome::Reload));
                }
            },
            ModalState::Filters(manager) => {
                match manager.handle_key(key, self.store, self.session)? {
                    FilterManagerAction::Continue => {}
                    FilterManagerAction::Close { changed: true } => {
                        return Ok(Some(TicketOutcome::Reload));
                    }
                    FilterManagerAction::Close { changed: false } => self.close_modal(),
                }
            }
        }
        Ok(None)
    }

    fn poll_background(&mut self) {
        for (key, result) in self.info_tasks.drain() {
            if let ModalState::Info {
                key: shown,
                content,
                ..
            } = &mut self.modal
            {
                if *shown == key {
                    *content = match result {
                        Ok(details) => InfoContent::Ready(details),
                        Err(e) => InfoContent::Failed(e),
                    };
                }
            }
        }
        for result in self.field_tasks.drain() {
            if !matches!(self.modal, ModalState::LoadingFields { .. }) {
                continue;
            }
            match result {
                Ok((project, rows)) => {
                    let current = self.store.fields_for(&project);
                    self.modal = ModalState::Fields(FieldPicker::new(&project, rows, &current));
                }
                Err(e) => {
                    self.modal = ModalState::None;
                    self.toasts.error(format!("Could not load fields: {e}"));
                }
            }
        }
    }

    fn issue_row(&self, row: &TreeRow) -> Row<'static> {
        let issue = &self.issues[row.index];
        if self.tree_mode {
            return Row::new(vec![Cell::from(tree_label(issue, row))]);
        }
        let mut cells = vec![
            Cell::from(Span::styled(
                issue.key.clone(),
                Style::default().fg(CYAN).add_modifier(Modifier::BOLD),
            )),
            Cell::from(Span::styled(issue.status.clone(), Style::default().fg(AMBER))),
            Cell::from(Span::styled(
                issue.assignee_label().to_string(),
                Style::default().fg(PURPLE),
            )),
        ];
        for field in &self.extra_fields {
            cells.push(Cell::from(Span::styled(issue.field_text(field), text_style())));
        }
        cells.push(Cell::from(Span::styled(issue.summary.clone(), text_style())));
        Row::new(cells)
    }

    fn draw_modal(&mut self, f: &mut Frame) {
        let server = self.client.server().to_string();
        match &mut self.modal {
            ModalState::None => {}
            ModalState::Info {
                key,
                content,
                scroll,
            } => {
                let lines = match content {
                    InfoContent::Loading => vec![Line::from(Span::styled("Loading…", dim_style()))],
                    InfoContent::Ready(details) => ticket_info_lines(details, &server),
                    InfoContent::Failed(e) => vec![Line::from(Span::styled(
                        format!("Could not load ticket: {e}"),
                        Style::default().fg(AMBER),
                    ))],
                };
                draw_text_modal(f, key, lines, *scroll, "j/k scroll · any key closes");
            }
            ModalState::LoadingFields { key } => {
                let lines = vec![Line::from(Span::styled(
                    format!("Loading fields for {key}…"),
                    dim_style(),
                ))];
                draw_text_modal(f, "Field picker", lines, 0, "Esc cancel");
            }
            ModalState::Fields(picker) => picker.draw(f),
            ModalState::Filters(manager) => manager.draw(f, self.store, self.session),
        }
    }
}

/// "KEY  summary  [status]  assignee", dimmed when only an ancestor of a match.
fn tree_label(issue: &Issue, row: &TreeRow) -> Line<'static> {
    let style = |normal: Style| if row.matched { normal } else { Style::default().fg(DIM) };
    Line::from(vec![
        Span::raw("  ".repeat(row.depth)),
        Span::styled(
            issue.key.clone(),
            style(Style::default().fg(CYAN).add_modifier(Modifier::BOLD)),
        ),
        Span::raw("  "),
        Span::styled(truncate_chars(&issue.summary, 80), style(Style::default().fg(PALE))),
        Span::raw("  "),
        Span::styled(format!("[{}]", issue.status), style(issue_status_style(&issue.status).fg(AMBER))),
        Span::raw("  "),
        Span::styled(issue.assignee_label().to_string(), style(Style::default().fg(PURPLE))),
    ])
}

impl Screen for TicketPicker<'_> {
    type Outcome = TicketOutcome;

    fn draw(&mut self, f: &mut Frame) {
        let areas = picker_areas(f.area(), !self.projects.is_empty(), self.filter.is_visible());
        draw_context_bar(f, areas.context, &self.context);

        let rows = self.visible_rows();
        self.selection.clamp(rows.len());
        self.page = table_page_size(areas.body);

        let table_rows: Vec<Row> = rows.iter().map(|r| self.issue_row(r)).collect();
        let title = if self.tree_mode {
            format!("Tickets · tree ({})", rows.len())
        } else {
            format!("Tickets ({})", rows.len())
        };
        let selected = (!rows.is_empty()).then(|| self.selection.index());

        if self.tree_mode {
            draw_table(f, areas.body, &title, &["Ticket"], &[Constraint::Min(20)], table_rows, selected);
        } else {
            let names: Vec<String> = self
                .extra_fields
                .iter()
                .map(|id| truncate_with_ellipsis(&self.catalog.name_for(id), 16))
                .collect();
            let mut header: Vec<&str> = vec!["Key", "Status", "Assignee"];
            header.extend(names.iter().map(String::as_str));
            header.push("Summary");
            let mut widths = vec![
                Constraint::Length(12),
                Constraint::Length(14),
                Constraint::Length(18),
            ];
            widths.extend(self.extra_fields.iter().map(|_| Constraint::Length(16)));
            widths.push(Constraint::Min(20));
            draw_table(f, areas.body, &title, &header, &widths, table_rows, selected);
        }

        if let Some(status) = areas.status {
            let text = format!(" Filters  {}", self.session.status_line(self.store, &self.projects));
            f.render_widget(
                Paragraph::new(Span::styled(text, Style::default().fg(AMBER)))
                    .style(Style::default().bg(SURFACE)),
                status,
            );
        }
        if let Some(filter_area) = areas.filter {
            draw_filter_bar(f, filter_area, &self.filter);
        }
        draw_footer(
            f,
            areas.footer,
            &[
                ("enter", "select"),
                ("i", "info"),
                ("o", "open"),
                ("c", "copy url"),
                ("d", "fields"),
                ("f", "filters"),
                ("r", "refresh"),
                ("t", "tree"),
                ("/", "filter"),
                ("esc", "quit"),
            ],
        );

        self.draw_modal(f);
        draw_toasts(f, &self.toasts);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<Option<TicketOutcome>> {
        let msg = dispatch(self, key);
        self.update(msg)
    }

    fn on_tick(&mut self) {
        self.poll_background();
        self.toasts.on_tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JiraCredentials;
    use crossterm::event::KeyModifiers;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn issue(key: &str, parent: Option<&str>, summary: &str) -> Issue {
        Issue {
            key: key.into(),
            id: key.into(),
            summary: summary.into(),
            status: "To Do".into(),
            assignee: None,
            priority: None,
            parent: parent.map(str::to_string),
            issue_type: None,
            fields: BTreeMap::new(),
        }
    }

    fn client() -> JiraClient {
        JiraClient::new(JiraCredentials {
            server: "https://acme.atlassian.net".into(),
            email: "me@acme.test".into(),
            token: "t".into(),
        })
    }

    fn input(issues: Vec<Issue>) -> TicketPickerInput {
        TicketPickerInput {
            issues,
            extra_fields: Vec::new(),
            catalog: FieldCatalog::default(),
            projects: vec!["SWY".into()],
            context: ContextBar::default(),
        }
    }

    #[test]
    fn test_dispatch_normal_mode() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config")).unwrap();
        let mut session = FilterSession::new();
        let picker = TicketPicker::new(&mut store, &mut session, client(), input(vec![]));
        assert_eq!(dispatch(&picker, key(KeyCode::Char('r'))), Message::Refresh);
        assert_eq!(dispatch(&picker, key(KeyCode::Char('j'))), Message::Move(1));
        assert_eq!(dispatch(&picker, key(KeyCode::Esc)), Message::Cancel);
        assert_eq!(dispatch(&picker, key(KeyCode::Char('/'))), Message::FocusFilter);
    }

    #[test]
    fn test_filter_then_select() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config")).unwrap();
        let mut session = FilterSession::new();
        let issues = vec![issue("SWY-1", None, "login page"), issue("SWY-2", None, "billing")];
        let mut picker = TicketPicker::new(&mut store, &mut session, client(), input(issues));

        picker.update(Message::FocusFilter).unwrap();
        for c in "bill".chars() {
            let msg = dispatch(&picker, key(KeyCode::Char(c)));
            picker.update(msg).unwrap();
        }
        let msg = dispatch(&picker, key(KeyCode::Enter));
        picker.update(msg).unwrap();
        assert_eq!(
            picker.update(Message::Select).unwrap(),
            Some(TicketOutcome::Selected("SWY-2".into()))
        );
        assert_eq!(dispatch(&picker, key(KeyCode::Esc)), Message::ClearFilter);
    }

    #[test]
    fn test_tree_toggle_keeps_selection() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config")).unwrap();
        let mut session = FilterSession::new();
        let issues = vec![
            issue("SWY-2", Some("SWY-1"), "child"),
            issue("SWY-3", None, "other"),
            issue("SWY-1", None, "epic"),
        ];
        let mut picker = TicketPicker::new(&mut store, &mut session, client(), input(issues));
        picker.update(Message::Move(0)).unwrap();
        assert_eq!(picker.selected_key().as_deref(), Some("SWY-2"));
        picker.update(Message::ToggleTree).unwrap();
        assert!(picker.is_tree_mode());
        assert_eq!(picker.selected_key().as_deref(), Some("SWY-2"));
        let keys: Vec<String> = picker
            .visible_rows()
            .iter()
            .map(|r| picker.issues[r.index].key.clone())
            .collect();
        assert_eq!(keys, vec!["SWY-3", "SWY-1", "SWY-2"]);
    }

    #[test]
    fn test_filter_manager_opens_for_selected_project() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config")).unwrap();
        let mut session = FilterSession::new();
        let mut picker = TicketPicker::new(
            &mut store,
            &mut session,
            client(),
            input(vec![issue("OPS-4", None, "x")]),
        );
        picker.update(Message::ShowFilters).unwrap();
        match &picker.modal {
            ModalState::Filters(manager) => assert_eq!(manager.project(), "OPS"),
            _ => panic!("filter manager not open"),
        }
        assert!(matches!(dispatch(&picker, key(KeyCode::Esc)), Message::ModalInput(_)));
        picker.update(Message::ModalInput(key(KeyCode::Esc))).unwrap();
        assert!(matches!(picker.modal, ModalState::None));
    }
}
