//! Input state shared by the pickers: single-line editors, the `/` filter
//! bar, list selection, and the prompt/confirm dialogs built on them.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Single-line text editor with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineInput {
    value: String,
    /// Cursor position in characters.
    cursor: usize,
}

impl LineInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map_or(self.value.len(), |(i, _)| i)
    }

    /// Apply an editing key. Returns whether the value changed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let len = self.value.chars().count();
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let changed = !self.value.is_empty();
                self.clear();
                changed
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let at = self.byte_index(self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace if self.cursor > 0 => {
                let at = self.byte_index(self.cursor - 1);
                self.value.remove(at);
                self.cursor -= 1;
                true
            }
            KeyCode::Delete if self.cursor < len => {
                let at = self.byte_index(self.cursor);
                self.value.remove(at);
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(len);
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = len;
                false
            }
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Filter bar
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    /// Key consumed; the query may have changed.
    Edited,
    /// Enter: focus returns to the list, query kept.
    Done,
    /// Esc: query cleared and bar hidden.
    Cleared,
}

/// The `/` filter bar at the bottom of a picker.
#[derive(Debug, Clone, Default)]
pub struct FilterBar {
    input: LineInput,
    focused: bool,
}

impl FilterBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self) {
        self.focused = true;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Shown while focused or while a query is applied.
    pub fn is_visible(&self) -> bool {
        self.focused || !self.input.is_empty()
    }

    pub fn query(&self) -> &str {
        self.input.value()
    }

    pub fn input(&self) -> &LineInput {
        &self.input
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.focused = false;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FilterAction {
        match key.code {
            KeyCode::Esc => {
                self.clear();
                FilterAction::Cleared
            }
            KeyCode::Enter | KeyCode::Down | KeyCode::Tab => {
                self.focused = false;
                FilterAction::Done
            }
            _ => {
                self.input.handle_key(key);
                FilterAction::Edited
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Selection
// ─────────────────────────────────────────────────────────────────────────────

/// Cursor over a list whose length changes as filters apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    index: usize,
}

impl Selection {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set(&mut self, index: usize, len: usize) {
        self.index = index.min(len.saturating_sub(1));
    }

    pub fn clamp(&mut self, len: usize) {
        self.set(self.index, len);
    }

    pub fn move_by(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.index = 0;
            return;
        }
        let next = (self.index as isize + delta).clamp(0, len as isize - 1);
        self.index = next as usize;
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}

/// Navigation keys shared by every list: j/k, arrows, paging, g/G.
pub fn navigation_delta(key: KeyEvent, page: usize) -> Option<isize> {
    let page = page.max(1) as isize;
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Some(1),
        KeyCode::Char('k') | KeyCode::Up => Some(-1),
        KeyCode::PageDown => Some(page),
        KeyCode::PageUp => Some(-page),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(page / 2),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(-page / 2),
        KeyCode::Char('g') | KeyCode::Home => Some(isize::MIN / 2),
        KeyCode::Char('G') | KeyCode::End => Some(isize::MAX / 2),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dialogs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResult {
    Pending,
    Submitted(String),
    Cancelled,
}

/// Titled single-line prompt. Enter submits a non-empty trimmed value.
#[derive(Debug, Clone)]
pub struct TextPrompt {
    pub title: String,
    pub label: Option<String>,
    pub placeholder: String,
    pub hint: Option<String>,
    pub input: LineInput,
}

impl TextPrompt {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            label: None,
            placeholder: String::new(),
            hint: None,
            input: LineInput::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn initial(mut self, value: impl Into<String>) -> Self {
        self.input = LineInput::with_value(value);
        self
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PromptResult {
        match key.code {
            KeyCode::Esc => PromptResult::Cancelled,
            KeyCode::Enter => {
                let value = self.input.value().trim();
                if value.is_empty() {
                    PromptResult::Pending
                } else {
                    PromptResult::Submitted(value.to_string())
                }
            }
            _ => {
                self.input.handle_key(key);
                PromptResult::Pending
            }
        }
    }
}

/// Answer to a yes/no dialog; `None` while undecided.
pub fn confirm_answer(key: KeyEvent) -> Option<bool> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(false),
        _ => None,
    }
}
