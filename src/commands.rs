//! Handlers for the one-shot subcommands

use anyhow::{Context, Result};
use std::fmt::{self, Write as _};

use crate::client::{QueryClient, QueryService, TranscriptMessage};
use crate::config::Config;
use crate::controller::SessionController;
use crate::exchange::{QueryExchange, Row, format_cell};
use crate::paginator::PageWindow;
use crate::ui::conversation::results::page_summary;

const MAX_CELL_WIDTH: usize = 40;

pub async fn ask(config: &Config, question: &str, page: i64) -> Result<()> {
    let client = QueryClient::from_config(config)?;
    let output = ask_with(client, config.page_size, question, page).await?;
    print!("{}", output);
    Ok(())
}

/// Run one question through a fresh session and render the answer
pub async fn ask_with<S: QueryService>(
    client: QueryClient<S>,
    page_size: usize,
    question: &str,
    page: i64,
) -> Result<String> {
    let mut controller = SessionController::new(client, page_size);
    controller.start().await;

    if controller.submit(question).await.is_none() {
        anyhow::bail!("Question is empty");
    }
    controller.go_to_page(page);

    let exchange = controller
        .displayed()
        .context("No exchange recorded for the question")?;
    let mut out = String::new();
    writeln!(out, "❓ {}", exchange.prompt)?;

    if exchange.failed {
        let message = exchange.message.as_deref().unwrap_or("unknown error");
        writeln!(out, "❌ {}", message)?;
        return Ok(out);
    }

    writeln!(out, "🧾 SQL:")?;
    for line in exchange.query.lines() {
        writeln!(out, "   {}", line)?;
    }
    writeln!(out)?;

    if let Some(window) = controller.page_view() {
        if window.total_rows == 0 {
            if let Some(message) = &exchange.message {
                writeln!(out, "{}", message)?;
            }
        } else {
            out.push_str(&render_table(exchange, &window)?);
        }
        writeln!(out, "{}", page_summary(&window))?;
    }
    Ok(out)
}

pub async fn history(config: &Config) -> Result<()> {
    let client = QueryClient::from_config(config)?;
    let exchanges = client
        .history()
        .await
        .context("Failed to fetch query history")?;

    if exchanges.is_empty() {
        println!("📭 No queries yet. Run 'nlquery' to ask your first question!");
        return Ok(());
    }

    print!("{}", render_history(&exchanges)?);
    Ok(())
}

fn render_history(exchanges: &[QueryExchange]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "🕘 Query history ({}):", exchanges.len())?;
    writeln!(out, "{}", "=".repeat(50))?;
    for exchange in exchanges.iter().rev() {
        let local = exchange.created_at.with_timezone(&chrono::Local);
        writeln!(out, "📋 {}", exchange.prompt)?;
        if exchange.failed {
            writeln!(out, "   ❌ {}", exchange.message.as_deref().unwrap_or("failed"))?;
        } else {
            writeln!(out, "   🧾 {}", exchange.query.split_whitespace().collect::<Vec<_>>().join(" "))?;
        }
        writeln!(
            out,
            "   🕒 {} · {} rows · id {}",
            local.format("%Y-%m-%d %H:%M:%S"),
            exchange.row_count(),
            exchange.id
        )?;
        writeln!(out)?;
    }
    Ok(out)
}

pub async fn transcript(config: &Config, conversation_id: &str) -> Result<()> {
    let client = QueryClient::from_config(config)?;
    let messages = client
        .transcript(conversation_id)
        .await
        .with_context(|| format!("Failed to fetch conversation {}", conversation_id))?;

    if messages.is_empty() {
        println!("📭 Conversation {} has no messages.", conversation_id);
        return Ok(());
    }

    print!("{}", render_transcript(&messages)?);
    Ok(())
}

fn render_transcript(messages: &[TranscriptMessage]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for message in messages {
        let icon = match message.role.as_str() {
            "user" => "🧑",
            "assistant" => "🤖",
            _ => "•",
        };
        writeln!(out, "{} {}: {}", icon, message.role, message.content)?;
    }
    Ok(out)
}

pub fn config(config: &Config, show: bool, init: bool) -> Result<()> {
    if init {
        let path = config.save()?;
        println!("✅ Wrote configuration to {}", path.display());
        return Ok(());
    }

    if !show && !config.config_path().exists() {
        println!("📭 No config file at {}.", config.config_path().display());
        println!("Run 'nlquery config --init' to create one with the defaults.");
        return Ok(());
    }

    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("📍 {}", config.config_path().display());
    println!("{}", "=".repeat(50));
    print!("{}", content);
    Ok(())
}

/// Plain-text table of the current page, columns in service order
fn render_table(
    exchange: &QueryExchange,
    window: &PageWindow<'_, Row>,
) -> Result<String, fmt::Error> {
    let columns = exchange.columns();
    let cells: Vec<Vec<String>> = window
        .rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| clip(&row.get(*column).map(format_cell).unwrap_or_default()))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| pad(&column.to_uppercase(), *width))
        .collect();
    writeln!(out, "{}", header.join("  ").trim_end())?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", rule.join("  "))?;
    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
    }
    Ok(out)
}

fn clip(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= MAX_CELL_WIDTH {
        flat
    } else {
        let mut cut: String = flat.chars().take(MAX_CELL_WIDTH - 1).collect();
        cut.push('…');
        cut
    }
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}
