//! Modal popups and the chrome every picker shares: context bar, footer,
//! filter bar, toasts.

use super::layout::{fit_line_to_width, popup_rect, truncate_with_ellipsis};
use super::status::{
    border_style, dim_style, issue_status_style, priority_style, text_style, title_style, AMBER,
    CYAN, DARK, DIM, GREEN, PALE, RED, SURFACE,
};
use crate::data::TicketDetails;
use crate::integrations::jira::browse_url;
use crate::tui::input::{FilterBar, LineInput, TextPrompt};
use crate::tui::toast::{ToastKind, Toasts};
use crate::tui::ContextBar;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

pub fn draw_context_bar(f: &mut Frame, area: Rect, context: &ContextBar) {
    let line = Line::from(Span::styled(
        context.text(),
        Style::default().fg(PALE).bg(DARK),
    ));
    f.render_widget(
        Paragraph::new(fit_line_to_width(line, area.width as usize))
            .style(Style::default().bg(DARK)),
        area,
    );
}

/// Footer of `key action` pairs.
pub fn draw_footer(f: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let mut spans = Vec::with_capacity(hints.len() * 3);
    for (key, action) in hints {
        spans.push(Span::styled(
            format!(" {key} "),
            Style::default().fg(GREEN).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!("{action} "), dim_style()));
    }
    let line = fit_line_to_width(Line::from(spans), area.width as usize);
    f.render_widget(Paragraph::new(line).style(Style::default().bg(SURFACE)), area);
}

/// Render an input with a block cursor, or the placeholder when empty.
pub fn input_line(input: &LineInput, placeholder: &str, focused: bool) -> Line<'static> {
    let cursor_style = Style::default().fg(SURFACE).bg(GREEN);
    if input.is_empty() {
        let mut spans = Vec::new();
        if focused {
            spans.push(Span::styled(" ", cursor_style));
        }
        spans.push(Span::styled(placeholder.to_string(), dim_style()));
        return Line::from(spans);
    }
    let chars: Vec<char> = input.value().chars().collect();
    let at = input.cursor().min(chars.len());
    let before: String = chars[..at].iter().collect();
    let mut spans = vec![Span::styled(before, text_style())];
    if focused {
        let under = chars.get(at).map_or(" ".to_string(), |c| c.to_string());
        spans.push(Span::styled(under, cursor_style));
        let after: String = chars.iter().skip(at + 1).collect();
        spans.push(Span::styled(after, text_style()));
    } else {
        let after: String = chars[at..].iter().collect();
        spans.push(Span::styled(after, text_style()));
    }
    Line::from(spans)
}

pub fn draw_filter_bar(f: &mut Frame, area: Rect, bar: &FilterBar) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(if bar.is_focused() {
            border_style()
        } else {
            dim_style()
        })
        .title(Span::styled(" / filter ", title_style()));
    let line = input_line(bar.input(), "type to filter…", bar.is_focused());
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn modal_block(title: &str, accent: ratatui::style::Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Thick)
        .border_style(Style::default().fg(accent))
        .style(Style::default().bg(SURFACE))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        ))
}

pub fn draw_prompt(f: &mut Frame, prompt: &TextPrompt) {
    let height = 5 + u16::from(prompt.label.is_some()) + u16::from(prompt.hint.is_some());
    let area = popup_rect(80, 0, 40, height + 1, f.area());
    f.render_widget(Clear, area);

    let mut lines = Vec::new();
    if let Some(label) = &prompt.label {
        lines.push(Line::from(Span::styled(label.clone(), text_style())));
    }
    lines.push(input_line(&prompt.input, &prompt.placeholder, true));
    if let Some(hint) = &prompt.hint {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(hint.clone(), dim_style())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Enter confirm   Esc cancel", dim_style())));

    f.render_widget(
        Paragraph::new(lines)
            .block(modal_block(&prompt.title, GREEN))
            .wrap(Wrap { trim: false }),
        area,
    );
}

pub fn draw_confirm(f: &mut Frame, message: &str) {
    let area = popup_rect(50, 0, 60, 7, f.area());
    f.render_widget(Clear, area);
    let lines = vec![
        Line::from(Span::styled(message.to_string(), text_style())),
        Line::from(""),
        Line::from(Span::styled("y yes    n / Esc no", Style::default().fg(AMBER))),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .block(modal_block("Confirm", AMBER))
            .wrap(Wrap { trim: false }),
        area,
    );
}

/// Scrollable text popup (info panels, format results).
pub fn draw_text_modal(f: &mut Frame, title: &str, lines: Vec<Line<'static>>, scroll: u16, hint: &str) {
    let area = popup_rect(85, 80, 50, 12, f.area());
    f.render_widget(Clear, area);
    let block = modal_block(title, GREEN).title_bottom(Span::styled(format!(" {hint} "), dim_style()));
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        area,
    );
}

pub fn draw_toasts(f: &mut Frame, toasts: &Toasts) {
    if toasts.is_empty() {
        return;
    }
    let screen = f.area();
    let width = (screen.width / 2).clamp(20, 70).min(screen.width);
    let mut y = screen.height.saturating_sub(2);
    for toast in toasts.items().iter().rev() {
        if y < 3 {
            break;
        }
        let accent = match toast.kind {
            ToastKind::Info => GREEN,
            ToastKind::Warning => AMBER,
            ToastKind::Error => RED,
        };
        let area = Rect {
            x: screen.width.saturating_sub(width + 1),
            y: y - 3,
            width,
            height: 3,
        };
        f.render_widget(Clear, area);
        let text = truncate_with_ellipsis(&toast.message, width.saturating_sub(4) as usize);
        f.render_widget(
            Paragraph::new(Span::styled(text, text_style())).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(accent))
                    .style(Style::default().bg(SURFACE)),
            ),
            area,
        );
        y -= 3;
    }
}

/// Summary, meta grid, URL and description of a ticket.
pub fn ticket_info_lines(details: &TicketDetails, server: &str) -> Vec<Line<'static>> {
    let label = |text: &str| {
        Span::styled(
            format!("{text:<10}"),
            Style::default().fg(DIM).add_modifier(Modifier::BOLD),
        )
    };
    let priority = details.priority_label().to_string();
    let url = browse_url(server, &details.key);

    let mut lines = vec![
        Line::from(Span::styled(
            details.summary.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            label("STATUS"),
            Span::styled(format!("{:<22}", details.status), issue_status_style(&details.status)),
            label("PRIORITY"),
            Span::styled(priority.clone(), priority_style(&priority)),
        ]),
        Line::from(vec![
            label("ASSIGNEE"),
            Span::styled(format!("{:<22}", details.assignee_label()), text_style()),
            label("REPORTER"),
            Span::styled(details.reporter_label().to_string(), text_style()),
        ]),
        Line::from(vec![
            label("LABELS"),
            Span::styled(details.labels_label(), Style::default().fg(CYAN)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("URL  ", Style::default().fg(DIM).add_modifier(Modifier::BOLD)),
            Span::styled(url, Style::default().fg(CYAN).add_modifier(Modifier::UNDERLINED)),
        ]),
        Line::from(""),
        Line::from(Span::styled("─".repeat(40), dim_style())),
        Line::from(Span::styled(
            "DESCRIPTION",
            Style::default().fg(DIM).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    let (description, cut) = details.description_excerpt();
    if description.is_empty() {
        lines.push(Line::from(Span::styled("—", dim_style())));
    } else {
        lines.extend(
            description
                .lines()
                .map(|l| Line::from(Span::styled(l.to_string(), text_style()))),
        );
        if cut {
            lines.push(Line::from(Span::styled("…truncated", dim_style())));
        }
    }
    lines
}
