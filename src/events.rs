use crate::exchange::QueryExchange;
use crate::error::NlQueryError;

/// Lifecycle of the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    /// Nothing has been requested from the service yet
    Uninitialized,
    /// Waiting for the conversation to be created
    Creating,
    /// Accepting user input
    Ready(Activity),
}

/// What a ready controller is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    /// One submission is in flight; further submissions are ignored
    Submitting,
}

impl ControllerPhase {
    pub fn display_name(&self) -> &'static str {
        match self {
            ControllerPhase::Uninitialized => "Not connected",
            ControllerPhase::Creating => "Connecting",
            ControllerPhase::Ready(Activity::Idle) => "Ready",
            ControllerPhase::Ready(Activity::Submitting) => "Running query",
        }
    }
}

/// Result of one submission, produced off the controller and applied back to it
#[derive(Debug)]
pub struct QueryOutcome {
    /// Prompt exactly as the user submitted it
    pub prompt: String,
    pub result: Result<QueryExchange, NlQueryError>,
}

/// Internal application events for coordinating between components
#[derive(Debug)]
pub enum AppEvent {
    /// User submitted a prompt
    Submit { prompt: String },

    /// User picked an exchange from history
    Select { id: String },

    /// Show the most recent exchange
    SelectLatest,

    /// Move through history relative to the displayed exchange
    SelectRelative { delta: isize },

    /// Move through the result pages of the displayed exchange
    ChangePage { delta: i64 },

    /// Jump to a specific page
    GoToPage { page: i64 },

    /// A submission finished
    QueryCompleted(QueryOutcome),

    /// Show info message
    ShowInfo { message: String },

    /// Request to exit the application
    ExitRequest,
}

/// TUI-specific events (keyboard, paste, etc.)
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Paste event
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Periodic redraw
    Tick,
}
