/// Chat command registry.
use crate::types::{ChatCommand, CommandDef};

/// Build the built-in command list.
pub fn builtin_commands() -> Vec<CommandDef> {
    vec![
        CommandDef {
            command: ChatCommand::Exit,
            description: "End the chat.",
            text_aliases: &["/exit", "/quit", ":q", ":quit"],
        },
        CommandDef {
            command: ChatCommand::Reset,
            description: "Clear the conversation context (the log file is kept).",
            text_aliases: &["/reset"],
        },
        CommandDef {
            command: ChatCommand::Help,
            description: "Show available commands.",
            text_aliases: &["/help"],
        },
    ]
}

pub struct CommandRegistry {
    commands: Vec<CommandDef>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: builtin_commands(),
        }
    }

    pub fn all(&self) -> &[CommandDef] {
        &self.commands
    }

    /// Look up a command by one of its exact aliases.
    pub fn find_by_alias(&self, alias: &str) -> Option<&CommandDef> {
        self.commands
            .iter()
            .find(|c| c.text_aliases.contains(&alias))
    }

    /// One line per command: aliases, then description.
    pub fn help_text(&self) -> String {
        self.commands
            .iter()
            .map(|c| format!("  {:<24} {}", c.text_aliases.join(", "), c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_unique() {
        let registry = CommandRegistry::new();
        let mut seen = std::collections::HashSet::new();
        for def in registry.all() {
            for alias in def.text_aliases {
                assert!(seen.insert(*alias), "duplicate alias {alias}");
            }
        }
    }

    #[test]
    fn finds_exit_by_every_alias() {
        let registry = CommandRegistry::new();
        for alias in ["/exit", "/quit", ":q", ":quit"] {
            assert_eq!(
                registry.find_by_alias(alias).map(|d| d.command),
                Some(ChatCommand::Exit)
            );
        }
        assert_eq!(registry.find_by_alias("/exit").unwrap().primary_alias(), "/exit");
    }

    #[test]
    fn help_lists_every_command() {
        let help = CommandRegistry::new().help_text();
        assert_eq!(help.lines().count(), 3);
        assert!(help.contains("/reset"));
    }
}
