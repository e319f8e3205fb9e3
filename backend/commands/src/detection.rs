/// Control command detection for chat input lines.
use crate::registry::CommandRegistry;
use crate::types::ChatCommand;

/// Detect a control command. The whole trimmed line must equal an alias;
/// anything else, including unknown `/words`, is a normal message.
pub fn detect_command(text: &str, registry: &CommandRegistry) -> Option<ChatCommand> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('/') || trimmed.starts_with(':')) {
        return None;
    }
    registry.find_by_alias(trimmed).map(|def| def.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_with_surrounding_whitespace() {
        let registry = CommandRegistry::new();
        assert_eq!(detect_command("  /reset \n", &registry), Some(ChatCommand::Reset));
        assert_eq!(detect_command(":q", &registry), Some(ChatCommand::Exit));
        assert_eq!(detect_command("/help", &registry), Some(ChatCommand::Help));
    }

    #[test]
    fn normal_text_and_unknown_commands_pass_through() {
        let registry = CommandRegistry::new();
        assert_eq!(detect_command("hello /exit", &registry), None);
        assert_eq!(detect_command("/exit now", &registry), None);
        assert_eq!(detect_command("/EXIT", &registry), None);
        assert_eq!(detect_command("/weather", &registry), None);
        assert_eq!(detect_command("", &registry), None);
    }
}
