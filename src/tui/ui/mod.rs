pub mod layout;
pub mod modals;
pub mod status;

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use status::{border_style, cursor_style, dim_style, header_style, title_style, BG};

/// A bordered table with the shared header and cursor styling.
pub fn draw_table(
    f: &mut Frame,
    area: Rect,
    title: &str,
    header: &[&str],
    widths: &[Constraint],
    rows: Vec<Row<'static>>,
    selected: Option<usize>,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style())
        .style(Style::default().bg(BG))
        .title(Span::styled(format!(" {title} "), title_style()));

    if rows.is_empty() {
        f.render_widget(
            Paragraph::new(Line::from(Span::styled("  Nothing to show.", dim_style()))).block(block),
            area,
        );
        return;
    }

    let header_row = Row::new(header.iter().map(|h| Cell::from(h.to_string()))).style(header_style());
    let table = Table::new(rows, widths.to_vec())
        .header(header_row)
        .block(block)
        .row_highlight_style(cursor_style())
        .column_spacing(2);

    let mut state = TableState::default();
    state.select(selected);
    f.render_stateful_widget(table, area, &mut state);
}

/// Rows that fit in a bordered table with a header.
pub fn table_page_size(area: Rect) -> usize {
    area.height.saturating_sub(3) as usize
}
