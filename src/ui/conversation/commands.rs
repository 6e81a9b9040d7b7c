use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Show the most recent exchange
    Latest,
    /// Show the previous (older) exchange
    Prev,
    /// Show the next (newer) exchange
    Next,
    /// Show a numbered exchange from the history panel
    Show,
    /// Jump to a result page
    Page,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Page number given to `/page`, accepting `first` and `last`
    pub fn page_target(&self) -> Option<i64> {
        if self.command != SlashCommand::Page {
            return None;
        }

        let arg = self.argument()?.trim().to_lowercase();
        match arg.as_str() {
            "first" => Some(1),
            "last" => Some(i64::MAX),
            other => other.parse().ok(),
        }
    }

    /// 1-based history number given to `/show`, with or without a leading `#`
    pub fn history_number(&self) -> Option<usize> {
        if self.command != SlashCommand::Show {
            return None;
        }
        self.argument()?
            .trim()
            .trim_start_matches('#')
            .parse()
            .ok()
            .filter(|n| *n > 0)
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Latest => "show the most recent result",
            SlashCommand::Prev => "show the previous query in history",
            SlashCommand::Next => "show the next query in history",
            SlashCommand::Show => "show query #n from the history panel",
            SlashCommand::Page => "jump to a result page (number, first, last)",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let args: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(&head).ok().or(match head.as_str() {
        "q" | "exit" | "bye" => Some(SlashCommand::Quit),
        "l" | "last" => Some(SlashCommand::Latest),
        "p" | "previous" => Some(SlashCommand::Prev),
        "n" => Some(SlashCommand::Next),
        "h" | "?" => Some(SlashCommand::Help),
        _ => None,
    })?;

    let argument = if args.is_empty() {
        None
    } else {
        Some(args.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Help screen lines: one per command, then the key bindings
pub fn help_lines() -> Vec<String> {
    let mut lines: Vec<String> = command_entries()
        .iter()
        .map(|entry| format!("/{:<8} {}", entry.keyword, entry.description))
        .collect();
    lines.push(String::new());
    lines.extend(
        [
            "Enter         send the question",
            "Shift+Enter   new line",
            "↑ / ↓         older / newer query",
            "PgUp / PgDn   previous / next result page",
            "Esc           back to the latest result",
            "Ctrl+C        quit",
        ]
        .map(String::from),
    );
    lines
}
