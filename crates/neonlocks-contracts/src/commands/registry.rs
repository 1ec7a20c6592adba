#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandKind {
    Help,
    ListStyles,
    Generate,
    ResetResult,
    Clear,
    Status,
    SelectImage,
    SelectStyle,
    EditPrompt,
    Save,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub kind: CommandKind,
}

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        kind: CommandKind::Help,
    },
    CommandSpec {
        command: "styles",
        kind: CommandKind::ListStyles,
    },
    CommandSpec {
        command: "generate",
        kind: CommandKind::Generate,
    },
    CommandSpec {
        command: "reset",
        kind: CommandKind::ResetResult,
    },
    CommandSpec {
        command: "clear",
        kind: CommandKind::Clear,
    },
    CommandSpec {
        command: "status",
        kind: CommandKind::Status,
    },
];

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "style",
        kind: CommandKind::SelectStyle,
    },
    CommandSpec {
        command: "prompt",
        kind: CommandKind::EditPrompt,
    },
];

pub(crate) const PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "image",
        kind: CommandKind::SelectImage,
    },
    CommandSpec {
        command: "save",
        kind: CommandKind::Save,
    },
];

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/image <path>",
    "/styles",
    "/style <id>",
    "/prompt <text>",
    "/generate",
    "/reset",
    "/save [dir]",
    "/status",
    "/clear",
    "/help",
];

pub(crate) fn find_kind(command: &str, specs: &[CommandSpec]) -> Option<CommandKind> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.kind)
}
