//! Command-line interface definition for nlquery

use clap::{Parser, Subcommand};

use crate::config::{API_KEY_ENV, API_URL_ENV, Config};

/// nlquery - ask your database questions in plain language
///
/// Without a subcommand, starts the interactive terminal UI.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "nlquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the query service
    #[arg(long, global = true, env = API_URL_ENV)]
    pub api_url: Option<String>,

    /// API key sent in the X-API-Key header
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Rows per result page
    #[arg(long, global = true)]
    pub page_size: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Ask a single question and print the generated SQL and results
    Ask {
        /// The question, in plain language
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Result page to print
        #[arg(short, long, default_value_t = 1)]
        page: i64,
    },

    /// List previous queries known to the service
    History,

    /// Print the message transcript of a conversation
    Transcript {
        /// Conversation id
        conversation_id: String,
    },

    /// Show or create the configuration file
    Config {
        /// Print the effective configuration
        #[arg(long, conflicts_with = "init")]
        show: bool,

        /// Write the current configuration to ~/.nlquery/config.toml
        #[arg(long)]
        init: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.api_url {
            config.api_base_url = url.clone();
        }
        if let Some(key) = &self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
    }

    /// Interactive mode owns the terminal, so logging goes to a file
    pub fn is_interactive(&self) -> bool {
        self.command.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_is_interactive() {
        let cli = Cli::try_parse_from(["nlquery"]).unwrap();
        assert!(cli.is_interactive());
    }

    #[test]
    fn test_ask_joins_words() {
        let cli = Cli::try_parse_from(["nlquery", "ask", "top", "customers", "--page", "2"]).unwrap();
        match cli.command {
            Some(Commands::Ask { question, page }) => {
                assert_eq!(question.join(" "), "top customers");
                assert_eq!(page, 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "nlquery",
            "history",
            "--api-url",
            "http://db.internal:9000/api/v1",
            "--api-key",
            "secret",
            "--page-size",
            "25",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.api_base_url, "http://db.internal:9000/api/v1");
        assert_eq!(config.api_key(), "secret");
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn test_config_flags_conflict() {
        assert!(Cli::try_parse_from(["nlquery", "config", "--show", "--init"]).is_err());
    }
}
