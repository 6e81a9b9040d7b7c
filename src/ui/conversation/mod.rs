//! Conversation UI components: composer, result pane, history sidebar

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;
pub mod results;
pub mod status;

pub use commands::{ParsedCommand, SlashCommand, help_lines};
pub use composer::{ComposerResult, ConversationComposer};
pub use history::HistoryPanel;
pub use manager::{ConversationAction, ConversationManager};
pub use results::ResultsPane;
pub use status::StatusLine;
