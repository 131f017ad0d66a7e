//! Picker frame layout and width-aware text helpers.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Terminal columns occupied by `text`.
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Longest prefix of `text` that fits in `max_width` columns.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > max_width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

/// Like [`truncate_to_width`], ending in `…` when anything was cut.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if display_width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 1 {
        return "…".to_string();
    }
    let truncated = truncate_to_width(text, max_width - 1);
    format!("{truncated}…")
}

/// Cut or pad `text` to exactly `width` columns, for fixed-width table cells.
pub fn pad_to_width(text: &str, width: usize, alignment: Alignment) -> String {
    let cell = truncate_to_width(text, width);
    let pad = width.saturating_sub(display_width(&cell));
    let (left, right) = match alignment {
        Alignment::Left => (0, pad),
        Alignment::Right => (pad, 0),
        Alignment::Center => (pad / 2, pad - pad / 2),
    };
    format!("{}{cell}{}", " ".repeat(left), " ".repeat(right))
}

/// Drop whatever spans of `line` overflow `max_width`; the last one is cut mid-span.
pub fn fit_line_to_width<'a>(line: Line<'a>, max_width: usize) -> Line<'a> {
    let Line {
        spans,
        alignment,
        style,
    } = line;
    let mut out: Vec<Span<'a>> = Vec::new();
    let mut used = 0usize;

    for span in spans {
        if used >= max_width {
            break;
        }
        let span_width = display_width(span.content.as_ref());
        if used + span_width <= max_width {
            used += span_width;
            out.push(span);
        } else {
            let truncated = truncate_to_width(span.content.as_ref(), max_width - used);
            if !truncated.is_empty() {
                out.push(Span::styled(truncated, span.style));
            }
            break;
        }
    }

    Line {
        spans: out,
        alignment,
        style,
    }
}

/// Centered popup sized by percentage, at least `min_*`, never touching the edges of `r`.
pub fn popup_rect(
    percent_x: u16,
    percent_y: u16,
    min_width: u16,
    min_height: u16,
    r: Rect,
) -> Rect {
    let max_width = r.width.saturating_sub(2).max(1);
    let max_height = r.height.saturating_sub(2).max(1);

    let target_width = (r.width.saturating_mul(percent_x) / 100).max(min_width);
    let target_height = (r.height.saturating_mul(percent_y) / 100).max(min_height);

    let width = target_width.min(max_width);
    let height = target_height.min(max_height);

    Rect {
        x: r.x + (r.width.saturating_sub(width)) / 2,
        y: r.y + (r.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

/// Standard picker frame: context bar, body, optional status line,
/// optional filter bar, footer.
pub struct PickerAreas {
    pub context: Rect,
    pub body: Rect,
    pub status: Option<Rect>,
    pub filter: Option<Rect>,
    pub footer: Rect,
}

pub fn picker_areas(area: Rect, with_status: bool, filter_visible: bool) -> PickerAreas {
    let mut constraints = vec![Constraint::Length(1), Constraint::Min(3)];
    if with_status {
        constraints.push(Constraint::Length(1));
    }
    if filter_visible {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Length(1));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let mut next = 2;
    let mut take = |present: bool| {
        present.then(|| {
            let rect = chunks[next];
            next += 1;
            rect
        })
    };
    let status = take(with_status);
    let filter = take(filter_visible);

    PickerAreas {
        context: chunks[0],
        body: chunks[1],
        status,
        filter,
        footer: chunks[chunks.len() - 1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 6), "hello…");
        assert_eq!(truncate_with_ellipsis("hello", 0), "");
    }

    #[test]
    fn test_pad_to_width() {
        assert_eq!(pad_to_width("ab", 4, Alignment::Left), "ab  ");
        assert_eq!(pad_to_width("ab", 4, Alignment::Right), "  ab");
        assert_eq!(pad_to_width("abcdef", 3, Alignment::Left), "abc");
    }

    #[test]
    fn test_picker_areas_stack() {
        let areas = picker_areas(Rect::new(0, 0, 80, 24), true, true);
        assert_eq!(areas.context.y, 0);
        assert_eq!(areas.footer.y, 23);
        assert_eq!(areas.filter.map(|r| (r.y, r.height)), Some((20, 3)));
        assert_eq!(areas.status.map(|r| r.y), Some(19));
        assert_eq!(areas.body.height, 18);
    }

    #[test]
    fn test_popup_rect_is_centered_and_clamped() {
        let r = Rect::new(0, 0, 100, 40);
        let p = popup_rect(50, 50, 10, 5, r);
        assert_eq!((p.x, p.y, p.width, p.height), (25, 10, 50, 20));
        let tiny = popup_rect(50, 50, 200, 200, Rect::new(0, 0, 10, 10));
        assert_eq!((tiny.width, tiny.height), (8, 8));
    }
}
