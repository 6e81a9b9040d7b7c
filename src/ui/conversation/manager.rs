use crate::client::{HttpQueryService, QueryService};
use crate::config::Config;
use crate::controller::SessionController;
use crate::events::{AppEvent, QueryOutcome, TuiEvent};
use crate::ui::conversation::{
    ComposerResult, ConversationComposer, HistoryPanel, ParsedCommand, ResultsPane, SlashCommand,
    StatusLine, help_lines,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};
use tokio::sync::mpsc;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Wires terminal input to the session controller and renders its state
///
/// Submissions run on spawned tasks; their outcomes come back over a channel
/// and are applied by [`ConversationManager::process_outcomes`] on the UI task.
pub struct ConversationManager<S: QueryService + 'static = HttpQueryService> {
    controller: SessionController<S>,
    composer: ConversationComposer,
    outcome_tx: mpsc::UnboundedSender<QueryOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<QueryOutcome>,
    info: Option<String>,
    /// An info message newer than the last query error; it takes the status line
    info_after_error: bool,
    show_help: bool,
    show_timestamps: bool,
}

impl<S: QueryService + 'static> ConversationManager<S> {
    pub fn new(controller: SessionController<S>, config: &Config) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            composer: ConversationComposer::new(
                "e.g., Show me the top 5 customers by order value",
            ),
            outcome_tx,
            outcome_rx,
            info: Some("Type a question and press Enter. /help lists commands.".to_string()),
            info_after_error: false,
            show_help: false,
            show_timestamps: config.ui.show_timestamps,
        }
    }

    pub fn controller(&self) -> &SessionController<S> {
        &self.controller
    }

    /// Handle a terminal event
    pub fn handle_event(&mut self, event: TuiEvent) -> ConversationAction {
        match event {
            TuiEvent::Key(key) => self.handle_key(key),
            TuiEvent::Paste(text) => {
                self.composer.handle_paste(&text);
                ConversationAction::None
            }
            TuiEvent::Resize(_, _) | TuiEvent::Tick => ConversationAction::None,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        // any key dismisses the help screen; Esc only dismisses it
        if self.show_help {
            self.show_help = false;
            if key.code == KeyCode::Esc {
                return ConversationAction::None;
            }
        }

        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
        {
            return self.apply(AppEvent::ExitRequest);
        }

        if !self.composer.is_palette_open() {
            let navigation = match key.code {
                KeyCode::PageDown => Some(AppEvent::ChangePage { delta: 1 }),
                KeyCode::PageUp => Some(AppEvent::ChangePage { delta: -1 }),
                KeyCode::Up => Some(AppEvent::SelectRelative { delta: -1 }),
                KeyCode::Down => Some(AppEvent::SelectRelative { delta: 1 }),
                KeyCode::Esc => Some(AppEvent::SelectLatest),
                _ => None,
            };
            if let Some(event) = navigation {
                return self.apply(event);
            }
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(prompt) => self.apply(AppEvent::Submit { prompt }),
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    /// Apply an application event to the controller
    pub fn apply(&mut self, event: AppEvent) -> ConversationAction {
        match event {
            AppEvent::Submit { prompt } => self.submit(prompt),
            AppEvent::Select { id } => {
                self.controller.select(&id);
            }
            AppEvent::SelectLatest => self.controller.select_latest(),
            AppEvent::SelectRelative { delta } => {
                self.controller.select_relative(delta);
            }
            AppEvent::ChangePage { delta } => {
                self.controller.change_page(delta);
            }
            AppEvent::GoToPage { page } => {
                self.controller.go_to_page(page);
            }
            AppEvent::QueryCompleted(outcome) => {
                self.controller.complete_submission(outcome);
                self.composer.set_busy(false);
                self.info_after_error = false;
            }
            AppEvent::ShowInfo { message } => {
                self.info = Some(message);
                self.info_after_error = true;
            }
            AppEvent::ExitRequest => return ConversationAction::Exit,
        }
        ConversationAction::None
    }

    fn submit(&mut self, prompt: String) {
        if self.controller.is_submitting() {
            // keep what the user typed so it can be sent once the current query finishes
            self.composer.set_content(&prompt);
            self.apply(AppEvent::ShowInfo {
                message: "A query is already running".to_string(),
            });
            return;
        }

        let Some(pending) = self.controller.begin_submission(&prompt) else {
            return;
        };

        self.info = None;
        self.composer.set_busy(true);
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let outcome = pending.run().await;
            let _ = tx.send(outcome);
        });
    }

    /// Apply finished submissions (called from main loop)
    pub fn process_outcomes(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply(AppEvent::QueryCompleted(outcome));
        }
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::Latest => self.apply(AppEvent::SelectLatest),
            SlashCommand::Prev => self.apply(AppEvent::SelectRelative { delta: -1 }),
            SlashCommand::Next => self.apply(AppEvent::SelectRelative { delta: 1 }),
            SlashCommand::Page => match command.page_target() {
                Some(page) => self.apply(AppEvent::GoToPage { page }),
                None => self.apply(AppEvent::ShowInfo {
                    message: "Usage: /page <number|first|last>".to_string(),
                }),
            },
            SlashCommand::Show => {
                let count = self.controller.exchanges().len();
                let target = command
                    .history_number()
                    .and_then(|n| self.controller.exchanges().get(n - 1))
                    .map(|exchange| exchange.id.clone());
                match target {
                    Some(id) => self.apply(AppEvent::Select { id }),
                    None => self.apply(AppEvent::ShowInfo {
                        message: format!("Usage: /show <1-{}>", count.max(1)),
                    }),
                }
            }
            SlashCommand::Help => {
                self.show_help = true;
                ConversationAction::None
            }
            SlashCommand::Quit => self.apply(AppEvent::ExitRequest),
        }
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    pub fn composer(&self) -> &ConversationComposer {
        &self.composer
    }

    pub fn is_help_open(&self) -> bool {
        self.show_help
    }

    /// Error for the status line, unless a newer info message replaced it
    fn status_error(&self) -> Option<&str> {
        if self.info_after_error {
            None
        } else {
            self.controller.last_error()
        }
    }
}

/// Command and key reference drawn over the result pane
fn render_help(area: Rect, buf: &mut Buffer) {
    let lines = help_lines();
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height,
    };
    Clear.render(popup, buf);
    Paragraph::new(lines.join("\n"))
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help (any key to close)")
                .style(Style::default().fg(Color::Cyan)),
        )
        .render(popup, buf);
}

impl<S: QueryService + 'static> Widget for &ConversationManager<S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
            .split(area);

        let main = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(10),   // results
                Constraint::Length(1), // status
                Constraint::Length(5), // composer
            ])
            .split(columns[0]);

        let controller = &self.controller;
        let displayed = controller.displayed();
        ResultsPane::new(displayed, controller.page_view(), controller.selected_id().is_none())
            .render(main[0], buf);
        if self.show_help {
            render_help(main[0], buf);
        }

        StatusLine::new(controller.phase(), controller.conversation_id())
            .error(self.status_error())
            .info(self.info.as_deref())
            .render(main[1], buf);

        self.composer.render(main[2], buf);

        HistoryPanel::new(controller.exchanges(), displayed.map(|e| e.id.as_str()))
            .show_timestamps(self.show_timestamps)
            .render(columns[1], buf);
    }
}
