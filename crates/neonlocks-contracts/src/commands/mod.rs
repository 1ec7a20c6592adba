mod parser;
mod registry;

pub use parser::{parse_command, Command};
pub use registry::SESSION_HELP_COMMANDS;
