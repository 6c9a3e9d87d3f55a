//! Run Kimi K2.5 through the OpenCode CLI, routed via OpenRouter.
//!
//! Given a model id and a list of tool servers this crate renders the
//! `opencode.json` the CLI reads, plus two shell commands (stage the config,
//! then run the CLI once and tee its output into the agent log). Executing
//! them is up to the caller; [`runner`] has a local executor for manual runs.

pub mod agent;
pub mod config;
pub mod env;
pub mod mcp;
pub mod model;
pub mod opencode;
pub mod runner;
pub mod task;

pub use agent::{InstalledAgent, KimiOpenCode};
pub use opencode::ExecInput;
