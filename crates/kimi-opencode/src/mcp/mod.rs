//! Tool-server (MCP) descriptors supplied with a task.

pub mod types;

pub use types::*;
