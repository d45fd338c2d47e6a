// ABOUTME: Generic slash-command parsing for chat messages.
// ABOUTME: Platform-agnostic /command handling with a // escape sequence.

/// Represents a parsed command from a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The command name (without the slash), lowercased
    pub name: String,
    /// Parsed arguments (handles quoted strings)
    pub args: Vec<String>,
    /// The raw argument string after the command name
    pub raw_args: String,
}

impl Command {
    /// Create a new command with name and arguments
    pub fn new(name: impl Into<String>, args: Vec<String>, raw_args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args,
            raw_args: raw_args.into(),
        }
    }

    /// Get the first argument if present
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(|s| s.as_str())
    }
}

/// Result of parsing a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// A slash command was recognized
    Command(Command),
    /// A regular message (routed to the agent)
    Message(String),
    /// Message should be ignored (empty or whitespace only)
    Ignore,
}

impl ParseResult {
    pub fn is_command(&self) -> bool {
        matches!(self, ParseResult::Command(_))
    }

    pub fn as_command(&self) -> Option<&Command> {
        match self {
            ParseResult::Command(cmd) => Some(cmd),
            _ => None,
        }
    }
}

/// Parse arguments from a string, respecting quoted strings
fn parse_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = '"';

    for c in input.chars() {
        match c {
            '"' | '\'' if !in_quotes => {
                in_quotes = true;
                quote_char = c;
            }
            c if c == quote_char && in_quotes => {
                in_quotes = false;
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Parse a chat message to determine if it's a command.
///
/// # Command Recognition
/// - `/command [args]` - the command name runs to the first whitespace and is
///   matched case-insensitively; the trimmed remainder is the argument string
///
/// # Escape Sequence
/// - Messages starting with `//` are regular messages beginning with a
///   literal `/` (the second slash is kept)
/// - Empty messages are ignored
pub fn parse_message(body: &str) -> ParseResult {
    let trimmed = body.trim();

    if trimmed.is_empty() {
        return ParseResult::Ignore;
    }

    // Escape sequence: // at start means a literal slash message
    if let Some(escaped) = trimmed.strip_prefix("//") {
        let escaped = format!("/{}", escaped.trim_start());
        if escaped == "/" {
            return ParseResult::Ignore;
        }
        return ParseResult::Message(escaped);
    }

    if let Some(after_slash) = trimmed.strip_prefix('/') {
        // Must start with an alphabetic character to be a command
        if after_slash
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic())
        {
            let parts: Vec<&str> = after_slash.splitn(2, char::is_whitespace).collect();
            let name = parts[0].to_lowercase();
            let raw_args = parts.get(1).map(|s| s.trim()).unwrap_or("").to_string();
            let args = parse_args(&raw_args);
            return ParseResult::Command(Command::new(name, args, raw_args));
        }
        return ParseResult::Message(trimmed.to_string());
    }

    ParseResult::Message(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_command() {
        let result = parse_message("/help");
        assert!(matches!(
            result,
            ParseResult::Command(ref cmd) if cmd.name == "help"
        ));
    }

    #[test]
    fn test_parse_command_with_args() {
        let result = parse_message("/switch abc-123");
        match result {
            ParseResult::Command(cmd) => {
                assert_eq!(cmd.name, "switch");
                assert_eq!(cmd.args, vec!["abc-123"]);
                assert_eq!(cmd.raw_args, "abc-123");
            }
            _ => panic!("Expected command"),
        }
    }

    #[test]
    fn test_parse_command_case_insensitive() {
        let result = parse_message("/SESSIONS 2");
        match result {
            ParseResult::Command(cmd) => {
                assert_eq!(cmd.name, "sessions");
                assert_eq!(cmd.args, vec!["2"]);
            }
            _ => panic!("Expected command"),
        }
    }

    #[test]
    fn test_parse_command_trims_raw_args() {
        let result = parse_message("/new   My Project  ");
        match result {
            ParseResult::Command(cmd) => {
                assert_eq!(cmd.name, "new");
                assert_eq!(cmd.raw_args, "My Project");
            }
            _ => panic!("Expected command"),
        }
    }

    #[test]
    fn test_parse_quoted_args() {
        let result = parse_message("/new \"my project\" extra");
        match result {
            ParseResult::Command(cmd) => {
                assert_eq!(cmd.args, vec!["my project", "extra"]);
            }
            _ => panic!("Expected command"),
        }
    }

    #[test]
    fn test_parse_escape_sequence() {
        let result = parse_message("//not a command");
        match result {
            ParseResult::Message(msg) => assert_eq!(msg, "/not a command"),
            _ => panic!("Expected message"),
        }
    }

    #[test]
    fn test_parse_regular_message() {
        let result = parse_message("hello world");
        match result {
            ParseResult::Message(msg) => assert_eq!(msg, "hello world"),
            _ => panic!("Expected message"),
        }
    }

    #[test]
    fn test_parse_empty_and_whitespace_ignored() {
        assert!(matches!(parse_message(""), ParseResult::Ignore));
        assert!(matches!(parse_message("   "), ParseResult::Ignore));
        assert!(matches!(parse_message("//"), ParseResult::Ignore));
    }

    #[test]
    fn test_non_alphabetic_after_slash_is_message() {
        assert!(matches!(parse_message("/123"), ParseResult::Message(_)));
        assert!(matches!(parse_message("/-flag"), ParseResult::Message(_)));
        assert!(matches!(parse_message("/"), ParseResult::Message(_)));
    }

    #[test]
    fn test_slash_path_parses_as_command() {
        // The grammar takes everything up to the first space as the name;
        // unrecognized names get the unknown-command reply downstream
        match parse_message("/tmp/file.txt") {
            ParseResult::Command(cmd) => assert_eq!(cmd.name, "tmp/file.txt"),
            _ => panic!("Expected command"),
        }
    }

    #[test]
    fn test_command_first_arg() {
        let cmd = Command::new("test", vec!["a".into(), "b".into()], "a b");
        assert_eq!(cmd.first_arg(), Some("a"));
    }

    #[test]
    fn test_parse_result_accessors() {
        let cmd_result = parse_message("/help");
        assert!(cmd_result.is_command());
        assert_eq!(cmd_result.as_command().unwrap().name, "help");

        let msg_result = parse_message("hi");
        assert!(!msg_result.is_command());
        assert!(msg_result.as_command().is_none());
    }
}
