//! Result pane: the displayed exchange's prompt, generated SQL, and a page of rows

use crate::exchange::{QueryExchange, Row, format_cell};
use crate::paginator::PageWindow;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row as TableRow, Table, Widget, Wrap},
};

const MAX_COLUMN_WIDTH: usize = 32;

pub struct ResultsPane<'a> {
    exchange: Option<&'a QueryExchange>,
    window: Option<PageWindow<'a, Row>>,
    is_latest: bool,
}

impl<'a> ResultsPane<'a> {
    pub fn new(
        exchange: Option<&'a QueryExchange>,
        window: Option<PageWindow<'a, Row>>,
        is_latest: bool,
    ) -> Self {
        Self {
            exchange,
            window,
            is_latest,
        }
    }
}

/// Display widths per column, sized to the header and the visible cells
fn column_widths(columns: &[&str], rows: &[Row]) -> Vec<u16> {
    columns
        .iter()
        .map(|column| {
            let widest_cell = rows
                .iter()
                .map(|row| {
                    row.get(*column)
                        .map(|value| format_cell(value).chars().count())
                        .unwrap_or(0)
                })
                .max()
                .unwrap_or(0);
            widest_cell.max(column.chars().count()).clamp(1, MAX_COLUMN_WIDTH) as u16
        })
        .collect()
}

/// "Showing X to Y of Z results · Page P of N"
pub fn page_summary(window: &PageWindow<'_, Row>) -> String {
    if window.total_rows == 0 {
        return "No rows returned".to_string();
    }
    format!(
        "Showing {} to {} of {} results · Page {} of {}",
        window.first_row, window.last_row, window.total_rows, window.page, window.total_pages
    )
}

impl Widget for ResultsPane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.is_latest {
            "📊 Latest Result"
        } else {
            "📊 Selected Result (Esc for latest)"
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        block.render(area, buf);

        let Some(exchange) = self.exchange else {
            let lines = vec![
                Line::from(vec![Span::styled(
                    "Welcome to NLQuery!",
                    Style::default().fg(Color::Green),
                )]),
                Line::from(""),
                Line::from(vec![Span::styled(
                    "Ask a question below, e.g. \"Show me the top 5 customers by order value\".",
                    Style::default().fg(Color::Gray),
                )]),
                Line::from(vec![Span::styled(
                    "Type / for commands.",
                    Style::default().fg(Color::DarkGray),
                )]),
            ];
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .render(inner, buf);
            return;
        };

        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // question
                Constraint::Length(5), // generated SQL or error
                Constraint::Min(3),    // table
                Constraint::Length(1), // pagination
            ])
            .split(inner);

        Paragraph::new(exchange.prompt.as_str())
            .style(Style::default().fg(Color::Blue))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::BOTTOM).title("Question"))
            .render(sections[0], buf);

        if exchange.failed {
            let message = exchange
                .message
                .as_deref()
                .unwrap_or("Sorry, there was an error processing your request.");
            Paragraph::new(message)
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::BOTTOM).title("Error"))
                .render(sections[1], buf);
            return;
        }

        let sql = if exchange.query.is_empty() {
            "(no query generated)"
        } else {
            exchange.query.as_str()
        };
        Paragraph::new(sql)
            .style(Style::default().fg(Color::Yellow))
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::BOTTOM).title("Generated SQL"))
            .render(sections[1], buf);

        let Some(window) = self.window else {
            return;
        };

        let columns = exchange.columns();
        if columns.is_empty() {
            let text = exchange.message.as_deref().unwrap_or("No rows returned");
            Paragraph::new(text)
                .style(Style::default().fg(Color::Gray))
                .wrap(Wrap { trim: true })
                .render(sections[2], buf);
        } else {
            let widths = column_widths(&columns, window.rows);
            let header = TableRow::new(columns.iter().map(|c| Cell::from(c.to_uppercase())))
                .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
            let rows = window.rows.iter().map(|row| {
                TableRow::new(columns.iter().map(|column| {
                    Cell::from(row.get(*column).map(format_cell).unwrap_or_default())
                }))
            });
            Table::new(rows, widths.into_iter().map(Constraint::Length))
                .header(header)
                .column_spacing(2)
                .render(sections[2], buf);
        }

        if sections[3].height == 0 {
            return;
        }
        let mut spans = vec![Span::styled(
            page_summary(&window),
            Style::default().fg(Color::DarkGray),
        )];
        if window.total_pages > 1 {
            let hint = match (window.has_previous(), window.has_next()) {
                (true, true) => "  ◀ PgUp · PgDn ▶",
                (false, true) => "  PgDn ▶",
                (true, false) => "  ◀ PgUp",
                (false, false) => "",
            };
            spans.push(Span::styled(hint, Style::default().fg(Color::Cyan)));
        }
        buf.set_line(sections[3].x, sections[3].y, &Line::from(spans), sections[3].width);
    }
}
