//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Switch to another model.  The name may be empty.
    Model(String),

    /// List the models the service offers.
    ListModels,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent to the model as a prompt.  Matching is exact: `/Help` and
/// `/models please` are prompts.
///
/// # Examples
///
/// ```
/// # use gemi::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert_eq!(
///     parse_command("/model gemini-2.5-pro"),
///     Some(ChatCommand::Model("gemini-2.5-pro".to_string()))
/// );
/// assert!(parse_command("Hello, Gemini!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    if let Some(name) = input.strip_prefix("/model ") {
        return Some(ChatCommand::Model(name.trim().to_string()));
    }

    match input {
        "/models" | "/list-models" => Some(ChatCommand::ListModels),
        "/help" => Some(ChatCommand::Help),
        "/quit" => Some(ChatCommand::Quit),
        _ => None,
    }
}

/// Returns the help text for chat commands, as Markdown.
pub fn help_text() -> &'static str {
    "# Available Commands\n\n\
     * **`/models`** or **`/list-models`** - List available models\n\
     * **`/model MODEL_NAME`** - Switch to a different model\n\
     * **`/help`** - Show this help message\n\
     * **`/quit`** or **`Ctrl+C`** - Exit the chat"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model gemini-2.0-flash"),
            Some(ChatCommand::Model("gemini-2.0-flash".to_string()))
        );
        assert_eq!(
            parse_command("/model   models/gemini-2.0-flash  "),
            Some(ChatCommand::Model("models/gemini-2.0-flash".to_string()))
        );
    }

    #[test]
    fn parse_model_with_empty_name() {
        assert_eq!(
            parse_command("/model "),
            Some(ChatCommand::Model(String::new()))
        );
        assert_eq!(
            parse_command("/model    "),
            Some(ChatCommand::Model(String::new()))
        );
    }

    #[test]
    fn parse_list_models() {
        assert_eq!(parse_command("/models"), Some(ChatCommand::ListModels));
        assert_eq!(parse_command("/list-models"), Some(ChatCommand::ListModels));
    }

    #[test]
    fn parse_help_and_quit() {
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
    }

    #[test]
    fn everything_else_is_a_prompt() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/model"), None);
        assert_eq!(parse_command("/models now"), None);
        assert_eq!(parse_command("/HELP"), None);
        assert_eq!(parse_command("/exit"), None);
        assert_eq!(parse_command("what does /help do?"), None);
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for command in ["/models", "/list-models", "/model MODEL_NAME", "/help", "/quit"] {
            assert!(help.contains(command), "missing {command}");
        }
    }
}
