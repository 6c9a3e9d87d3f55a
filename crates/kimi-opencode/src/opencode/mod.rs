//! OpenCode-specific output: `opencode.json` and the shell commands that use it.

pub mod command;
pub mod config;
pub mod shell;

pub use command::*;
pub use config::*;
