use crate::events::{Activity, ControllerPhase};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// One-line status bar: connection, activity, and the latest notice
pub struct StatusLine<'a> {
    phase: ControllerPhase,
    conversation_id: Option<&'a str>,
    error: Option<&'a str>,
    info: Option<&'a str>,
}

impl<'a> StatusLine<'a> {
    pub fn new(phase: ControllerPhase, conversation_id: Option<&'a str>) -> Self {
        Self {
            phase,
            conversation_id,
            error: None,
            info: None,
        }
    }

    pub fn error(mut self, error: Option<&'a str>) -> Self {
        self.error = error;
        self
    }

    pub fn info(mut self, info: Option<&'a str>) -> Self {
        self.info = info;
        self
    }
}

fn activity_dots() -> &'static str {
    let tick = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        / 300;
    match tick % 4 {
        0 => ".",
        1 => "..",
        2 => "...",
        _ => "   ",
    }
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let mut spans = Vec::new();

        let phase_color = match self.phase {
            ControllerPhase::Ready(Activity::Idle) => Color::Green,
            ControllerPhase::Ready(Activity::Submitting) => Color::Yellow,
            _ => Color::DarkGray,
        };
        spans.push(Span::styled(
            format!("● {}", self.phase.display_name()),
            Style::default().fg(phase_color),
        ));
        if matches!(
            self.phase,
            ControllerPhase::Ready(Activity::Submitting) | ControllerPhase::Creating
        ) {
            spans.push(Span::styled(activity_dots(), Style::default().fg(Color::Yellow)));
        }

        let conversation = match self.conversation_id {
            Some(id) => format!("  conversation {}", short_id(id)),
            None => "  stateless (no conversation)".to_string(),
        };
        spans.push(Span::styled(conversation, Style::default().fg(Color::DarkGray)));

        if let Some(error) = self.error {
            spans.push(Span::styled(
                format!("  ❌ {}", error),
                Style::default().fg(Color::Red),
            ));
        } else if let Some(info) = self.info {
            spans.push(Span::styled(format!("  {}", info), Style::default().fg(Color::Gray)));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((index, _)) => &id[..index],
        None => id,
    }
}
