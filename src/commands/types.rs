//! Command types and definitions.

use std::fmt;

/// Slash commands understood in private chats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Show the welcome message.
    Start,

    /// Start the creation wizard.
    Create,

    /// Abort the running wizard.
    Cancel,

    /// Check that the bot can reach the Bot API.
    Ping,

    /// Show help information.
    Help,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Accepts both `/cmd` and `/cmd@BotName`; anything after the first
    /// whitespace is ignored. Returns `None` if the message is not a known
    /// command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(cmd, _)| cmd);

        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "create" | "new" => Some(Self::Create),
            "cancel" => Some(Self::Cancel),
            "ping" => Some(Self::Ping),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Create => "create",
            Self::Cancel => "cancel",
            Self::Ping => "ping",
            Self::Help => "help",
        }
    }

    /// Returns the command description for help.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Start => "Show the welcome message",
            Self::Create => "Create a new giveaway",
            Self::Cancel => "Cancel giveaway creation",
            Self::Ping => "Check the connection to Telegram",
            Self::Help => "Show this help message",
        }
    }

    /// Every command, in help order.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::Start,
            Self::Create,
            Self::Cancel,
            Self::Ping,
            Self::Help,
        ]
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}
