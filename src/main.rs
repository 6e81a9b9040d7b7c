//! nlquery - natural-language database queries from the terminal

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use nlquery::cli::{Cli, Commands};
use nlquery::config::Config;
use nlquery::{QueryClient, SessionController, commands, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let mut config = Config::load()?;
    cli.apply(&mut config);
    config.validate()?;

    // the TUI owns the terminal, so its logs go to a file
    let log_file = if cli.is_interactive() {
        Some(open_log_file(&config)?)
    } else {
        None
    };
    init_tracing(cli.verbose, log_file);
    tracing::debug!(api = %config.base_url(), page_size = config.page_size, "Configuration loaded");

    match cli.command {
        None => run_interactive(config).await,
        Some(Commands::Ask { question, page }) => {
            commands::ask(&config, &question.join(" "), page).await
        }
        Some(Commands::History) => commands::history(&config).await,
        Some(Commands::Transcript { conversation_id }) => {
            commands::transcript(&config, &conversation_id).await
        }
        Some(Commands::Config { show, init }) => commands::config(&config, show, init),
    }
}

async fn run_interactive(config: Config) -> Result<()> {
    println!("🚀 Connecting to {}...", config.base_url());

    let client = QueryClient::from_config(&config)?;
    let mut controller =
        SessionController::new(client, config.page_size).with_history_loading(config.load_history);
    controller.start().await;

    if controller.conversation_id().is_none() {
        tracing::warn!("Running without a conversation; follow-up questions will lack context");
    }

    ui::run(&config, controller).await
}

fn open_log_file(config: &Config) -> Result<File> {
    fs::create_dir_all(&config.home).context("Failed to create .nlquery directory")?;
    let path = config.log_path();
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

fn init_tracing(verbose: bool, log_file: Option<File>) {
    let default_level = match (verbose, log_file.is_some()) {
        (true, _) => "nlquery=debug",
        (false, true) => "nlquery=info",
        // keep one-shot output clean unless asked
        (false, false) => "nlquery=warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, stderr_layer) = match log_file {
        Some(file) => (
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false)),
            None,
        ),
        None => (None, Some(fmt::layer().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
}
