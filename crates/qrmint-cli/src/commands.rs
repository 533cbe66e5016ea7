//! Slash commands for the interactive session.
//!
//! Commands are invoked by typing `/` followed by the command name, e.g.
//! `/preset red` or `/size 500`. Anything else is text to encode.

/// A parsed slash command from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show available commands
    Help,
    /// Leave the session
    Quit,
    /// Empty the input
    Clear,
    /// Show renderer, style and result state
    Status,
    /// Save the export PNG
    Download,
    /// Copy the export PNG to the clipboard
    Copy,
    /// Show or set the module color
    Dark(Option<String>),
    /// Show or set the background color
    Light(Option<String>),
    /// Show or set the export size
    Size(Option<String>),
    /// List presets or apply one
    Preset(Option<String>),
    /// Unknown command
    Unknown(String),
}

/// Command metadata for help display.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    /// Primary command name (without the /)
    pub name: &'static str,
    /// Alternative names for the command
    pub aliases: &'static [&'static str],
    /// Argument placeholder, if the command takes one
    pub usage: Option<&'static str>,
    /// Brief description for help
    pub description: &'static str,
}

/// Static registry of all available commands.
pub static COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "help",
        aliases: &["?"],
        usage: None,
        description: "Show available commands",
    },
    CommandInfo {
        name: "quit",
        aliases: &["q", "exit"],
        usage: None,
        description: "Leave the session",
    },
    CommandInfo {
        name: "clear",
        aliases: &[],
        usage: None,
        description: "Empty the input",
    },
    CommandInfo {
        name: "status",
        aliases: &["s"],
        usage: None,
        description: "Show the current result and style",
    },
    CommandInfo {
        name: "download",
        aliases: &["d", "save"],
        usage: None,
        description: "Save the QR code as PNG",
    },
    CommandInfo {
        name: "copy",
        aliases: &["c"],
        usage: None,
        description: "Copy the QR code image to the clipboard",
    },
    CommandInfo {
        name: "dark",
        aliases: &["fg"],
        usage: Some("<#rrggbb>"),
        description: "Module color",
    },
    CommandInfo {
        name: "light",
        aliases: &["bg"],
        usage: Some("<#rrggbb>"),
        description: "Background color",
    },
    CommandInfo {
        name: "size",
        aliases: &[],
        usage: Some("<pixels>"),
        description: "Export size",
    },
    CommandInfo {
        name: "preset",
        aliases: &["p"],
        usage: Some("<name>"),
        description: "Apply a color preset (no name lists them)",
    },
];

/// Parse a slash command from user input.
///
/// Returns `None` if the input is not a command. Returns
/// `Command::Unknown` if the command is not recognized.
pub fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();
    if !is_command(input) {
        return None;
    }

    let content = &input[1..];

    let (cmd_str, args) = match content.find(char::is_whitespace) {
        Some(idx) => {
            let (c, a) = content.split_at(idx);
            (c.to_lowercase(), Some(a.trim().to_string()))
        }
        None => (content.to_lowercase(), None),
    };

    Some(match cmd_str.as_str() {
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        "clear" => Command::Clear,
        "status" | "s" => Command::Status,
        "download" | "d" | "save" => Command::Download,
        "copy" | "c" => Command::Copy,
        "dark" | "fg" => Command::Dark(args),
        "light" | "bg" => Command::Light(args),
        "size" => Command::Size(args),
        "preset" | "p" => Command::Preset(args),
        other => Command::Unknown(other.to_string()),
    })
}

/// Check if input starts with '/' (is a command).
pub fn is_command(input: &str) -> bool {
    let input = input.trim();
    input.starts_with('/') && !input.starts_with("//")
}

/// Unescape a leading `//` so text like `//etc/hosts` can be encoded.
pub fn unescape_slash(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(rest) = trimmed.strip_prefix("//") {
        format!("/{rest}")
    } else {
        input.to_string()
    }
}

/// Render the help listing.
pub fn help_text() -> String {
    let mut out = String::from("Type text and press Enter to generate. Commands:\n");
    for cmd in COMMANDS {
        let usage = cmd.usage.map(|u| format!(" {u}")).unwrap_or_default();
        let head = format!("/{}{usage}", cmd.name);
        out.push_str(&format!("  {head:<22} {}", cmd.description));
        if !cmd.aliases.is_empty() {
            let aliases: Vec<String> = cmd.aliases.iter().map(|a| format!("/{a}")).collect();
            out.push_str(&format!(" ({})", aliases.join(", ")));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_help_commands() {
        assert!(matches!(parse_command("/help"), Some(Command::Help)));
        assert!(matches!(parse_command("/?"), Some(Command::Help)));
        assert!(matches!(parse_command("/HELP"), Some(Command::Help)));
        assert!(matches!(parse_command("  /help  "), Some(Command::Help)));
    }

    #[test]
    fn test_parse_quit_commands() {
        assert!(matches!(parse_command("/quit"), Some(Command::Quit)));
        assert!(matches!(parse_command("/q"), Some(Command::Quit)));
        assert!(matches!(parse_command("/exit"), Some(Command::Quit)));
    }

    #[test]
    fn test_parse_action_commands() {
        assert!(matches!(parse_command("/clear"), Some(Command::Clear)));
        assert!(matches!(parse_command("/status"), Some(Command::Status)));
        assert!(matches!(parse_command("/download"), Some(Command::Download)));
        assert!(matches!(parse_command("/save"), Some(Command::Download)));
        assert!(matches!(parse_command("/copy"), Some(Command::Copy)));
    }

    #[test]
    fn test_parse_style_commands_with_args() {
        match parse_command("/dark #6B21A8") {
            Some(Command::Dark(Some(s))) => assert_eq!(s, "#6B21A8"),
            other => panic!("Expected Dark with args, got {other:?}"),
        }

        match parse_command("/bg   fff ") {
            Some(Command::Light(Some(s))) => assert_eq!(s, "fff"),
            other => panic!("Expected Light with args, got {other:?}"),
        }

        match parse_command("/size 800") {
            Some(Command::Size(Some(s))) => assert_eq!(s, "800"),
            other => panic!("Expected Size with args, got {other:?}"),
        }

        match parse_command("/preset") {
            Some(Command::Preset(None)) => {}
            other => panic!("Expected Preset without args, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_command() {
        match parse_command("/foobar") {
            Some(Command::Unknown(s)) => assert_eq!(s, "foobar"),
            other => panic!("Expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_non_command() {
        assert!(parse_command("example.com").is_none());
        assert!(parse_command("").is_none());
        assert!(parse_command("   ").is_none());
        assert!(parse_command("//etc/hosts").is_none());
    }

    #[test]
    fn test_unescape_slash() {
        assert_eq!(unescape_slash("//etc/hosts"), "/etc/hosts");
        assert_eq!(unescape_slash("//"), "/");
        assert_eq!(unescape_slash("example.com"), "example.com");
    }

    #[test]
    fn test_registry_matches_parser() {
        for cmd in COMMANDS {
            let parsed = parse_command(&format!("/{}", cmd.name));
            assert!(
                !matches!(parsed, Some(Command::Unknown(_)) | None),
                "/{} should parse",
                cmd.name
            );
            for alias in cmd.aliases {
                let parsed = parse_command(&format!("/{alias}"));
                assert!(!matches!(parsed, Some(Command::Unknown(_)) | None));
            }
        }
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = help_text();
        for cmd in COMMANDS {
            assert!(help.contains(&format!("/{}", cmd.name)));
        }
        assert!(help.contains("<#rrggbb>"));
    }
}
