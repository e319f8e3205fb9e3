//! In-chat control command types.

/// What a control line asks the chat loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatCommand {
    /// End the session.
    Exit,
    /// Drop every turn after the system prompt and forget session facts.
    Reset,
    /// List the available commands.
    Help,
}

/// A command entry in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDef {
    pub command: ChatCommand,
    pub description: &'static str,
    /// Exact spellings that trigger the command. The first one is shown in help.
    pub text_aliases: &'static [&'static str],
}

impl CommandDef {
    /// Primary alias (first in list).
    pub fn primary_alias(&self) -> &str {
        self.text_aliases.first().copied().unwrap_or_default()
    }
}
