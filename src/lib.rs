//! nlquery - terminal client for natural-language-to-SQL query services
//!
//! A question typed in plain language is sent to a remote service that turns
//! it into SQL, runs it, and answers with the query and its rows. nlquery keeps
//! the conversation, the list of past exchanges, and which result page is on
//! screen.
//!
//! # Architecture
//!
//! - `paginator`: fixed-size page windows over result rows
//! - `exchange`: one prompt and its outcome
//! - `session`: conversation id plus ordered exchanges
//! - `client`: the remote query service and its HTTP implementation
//! - `controller`: startup, submission, selection, and paging state machine
//! - `ui`: ratatui front end
//! - `cli` / `commands`: command-line entry points
//!
//! # Example
//!
//! ```no_run
//! use nlquery::{Config, QueryClient, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let client = QueryClient::from_config(&config)?;
//!     let mut controller = SessionController::new(client, config.page_size);
//!     controller.start().await;
//!     if let Some(exchange) = controller.submit("How many orders shipped today?").await {
//!         println!("{}", exchange.query);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod exchange;
pub mod paginator;
pub mod session;
pub mod ui;

// Re-export commonly used types
pub use client::{HttpQueryService, QueryClient, QueryService};
pub use config::Config;
pub use controller::SessionController;
pub use error::{NlQueryError, Result};
pub use exchange::QueryExchange;
pub use paginator::{PageWindow, paginate};
pub use session::ConversationSession;

#[cfg(test)]
pub mod test_utils;
