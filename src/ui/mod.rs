//! Terminal front end

pub mod conversation;

use crate::config::Config;
use crate::controller::SessionController;
use crate::events::TuiEvent;
use anyhow::{Context, Result};
use conversation::{ConversationAction, ConversationManager};
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Run the interactive session until the user exits
pub async fn run(config: &Config, controller: SessionController) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut manager = ConversationManager::new(controller, config);

    let result = event_loop(&mut terminal, &mut manager).await;

    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

async fn event_loop(terminal: &mut Tui, manager: &mut ConversationManager) -> Result<()> {
    loop {
        manager.process_outcomes();

        terminal.draw(|frame| frame.render_widget(&*manager, frame.size()))?;

        let tui_event = if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) => TuiEvent::Key(key),
                Event::Paste(text) => TuiEvent::Paste(text),
                Event::Resize(width, height) => TuiEvent::Resize(width, height),
                _ => continue,
            }
        } else {
            TuiEvent::Tick
        };

        if manager.handle_event(tui_event) == ConversationAction::Exit {
            tracing::info!("Exit requested");
            return Ok(());
        }

        // let spawned submissions make progress between frames
        tokio::task::yield_now().await;
    }
}
