//! Query history sidebar

use crate::exchange::QueryExchange;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Lists past exchanges, newest at the top, marking the one on screen
pub struct HistoryPanel<'a> {
    exchanges: &'a [QueryExchange],
    displayed_id: Option<&'a str>,
    show_timestamps: bool,
}

impl<'a> HistoryPanel<'a> {
    pub fn new(exchanges: &'a [QueryExchange], displayed_id: Option<&'a str>) -> Self {
        Self {
            exchanges,
            displayed_id,
            show_timestamps: true,
        }
    }

    pub fn show_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    /// Lines for one entry: number and prompt, then query or error, then optional time
    ///
    /// `number` is the 1-based position in the session, as used by `/show`.
    fn entry_lines(
        &self,
        number: usize,
        exchange: &QueryExchange,
        width: usize,
    ) -> Vec<Line<'static>> {
        let is_displayed = self.displayed_id == Some(exchange.id.as_str());
        let marker = if is_displayed { "▶ " } else { "  " };

        let prompt_style = if is_displayed {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Blue)
        };

        let label = format!("#{} ", number);
        let summary_width = width.saturating_sub(2 + label.chars().count());
        let mut lines = vec![Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Cyan)),
            Span::styled(label, Style::default().fg(Color::DarkGray)),
            Span::styled(exchange.summary(summary_width), prompt_style),
        ])];

        let detail = if exchange.failed {
            Span::styled(
                format!("  ✗ {}", one_line(exchange.message.as_deref().unwrap_or("failed"), width)),
                Style::default().fg(Color::Red),
            )
        } else {
            Span::styled(
                format!("  {}", one_line(&exchange.query, width)),
                Style::default().fg(Color::Gray),
            )
        };
        lines.push(Line::from(vec![detail]));

        if self.show_timestamps {
            let local = exchange.created_at.with_timezone(&chrono::Local);
            lines.push(Line::from(vec![Span::styled(
                format!("  {} · {} rows", local.format("%Y-%m-%d %H:%M:%S"), exchange.row_count()),
                Style::default().fg(Color::DarkGray),
            )]));
        }

        lines
    }
}

/// Collapse whitespace and cut to `width` characters
fn one_line(text: &str, width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let limit = width.saturating_sub(3).max(1);
    if flat.chars().count() <= limit {
        flat
    } else {
        let mut cut: String = flat.chars().take(limit.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

impl Widget for HistoryPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("🕘 Query History ({})", self.exchanges.len()));

        let inner_area = block.inner(area);
        block.render(area, buf);

        if inner_area.height == 0 {
            return;
        }
        if self.exchanges.is_empty() {
            let line = Line::from(vec![Span::styled(
                "No queries yet",
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
            return;
        }

        let width = inner_area.width as usize;
        let height = inner_area.height as usize;

        // newest first; make sure the displayed entry is scrolled into view
        let mut all_lines: Vec<Line> = Vec::new();
        let mut displayed_start = 0;
        for (index, exchange) in self.exchanges.iter().enumerate().rev() {
            if self.displayed_id == Some(exchange.id.as_str()) {
                displayed_start = all_lines.len();
            }
            all_lines.extend(self.entry_lines(index + 1, exchange, width));
            all_lines.push(Line::from(""));
        }

        let entry_height = if self.show_timestamps { 4 } else { 3 };
        let offset = (displayed_start + entry_height).saturating_sub(height);
        for (i, line) in all_lines.iter().skip(offset).take(height).enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}
