use super::registry::{find_kind, CommandKind, NO_ARG_COMMANDS, PATH_COMMANDS, RAW_ARG_COMMANDS};

/// One line of session input, resolved to a user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Noop,
    Help,
    ListStyles,
    Generate,
    ResetResult,
    Clear,
    Status,
    SelectImage { path: String },
    SelectStyle { id: String },
    EditPrompt { text: String },
    Save { dir: Option<String> },
    Unknown { command: String },
}

/// Shell-style split so quoted paths with spaces survive; unbalanced quotes
/// fall back to plain whitespace splitting.
fn path_arg(arg: &str) -> String {
    shell_words::split(arg)
        .unwrap_or_else(|_| arg.split_whitespace().map(str::to_string).collect())
        .join(" ")
}

/// Slash commands map through the registry tables; any other non-blank text
/// becomes the custom prompt verbatim.
pub fn parse_command(text: &str) -> Command {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Command::Noop;
    }

    let Some(slash_tail) = trimmed.strip_prefix('/') else {
        return Command::EditPrompt {
            text: trimmed.to_string(),
        };
    };

    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    if command_len == 0 {
        return Command::EditPrompt {
            text: trimmed.to_string(),
        };
    }
    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    if let Some(kind) = find_kind(&command, NO_ARG_COMMANDS) {
        return match kind {
            CommandKind::Help => Command::Help,
            CommandKind::ListStyles => Command::ListStyles,
            CommandKind::Generate => Command::Generate,
            CommandKind::ResetResult => Command::ResetResult,
            CommandKind::Clear => Command::Clear,
            _ => Command::Status,
        };
    }

    if let Some(kind) = find_kind(&command, RAW_ARG_COMMANDS) {
        return match kind {
            CommandKind::SelectStyle => Command::SelectStyle {
                id: arg.to_ascii_lowercase(),
            },
            _ => Command::EditPrompt {
                text: arg.to_string(),
            },
        };
    }

    if let Some(kind) = find_kind(&command, PATH_COMMANDS) {
        let path = path_arg(arg);
        return match kind {
            CommandKind::SelectImage => Command::SelectImage { path },
            _ => Command::Save {
                dir: Some(path).filter(|value| !value.is_empty()),
            },
        };
    }

    Command::Unknown { command }
}
