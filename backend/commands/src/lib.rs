pub mod detection;
pub mod registry;
pub mod types;

pub use detection::detect_command;
pub use registry::{CommandRegistry, builtin_commands};
pub use types::{ChatCommand, CommandDef};
