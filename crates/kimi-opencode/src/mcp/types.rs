//! Tool-server descriptors as declared by the task configuration.

use serde::{Deserialize, Serialize};

/// Transport value that marks a locally spawned (stdio) server.
pub const STDIO_TRANSPORT: &str = "stdio";

/// An auxiliary MCP server offered to the agent.
///
/// Fields are carried as declared; nothing here checks that a stdio server
/// has a `command` or that a remote one has a `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolServerDescriptor {
    pub name: String,
    /// `"stdio"` or any remote kind (`"sse"`, `"streamable-http"`, ...).
    pub transport: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
impl ToolServerDescriptor {
    pub fn stdio(name: &str, command: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            transport: STDIO_TRANSPORT.to_string(),
            command: Some(command.to_string()),
            args: Some(args.iter().map(|a| a.to_string()).collect()),
            url: None,
        }
    }

    pub fn remote(name: &str, transport: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            transport: transport.to_string(),
            command: None,
            args: None,
            url: Some(url.to_string()),
        }
    }
}

impl ToolServerDescriptor {
    /// Any transport other than the literal `"stdio"` is remote.
    pub fn is_stdio(&self) -> bool {
        self.transport == STDIO_TRANSPORT
    }
}

/// Names declared more than once, in first-seen order.
pub fn find_duplicate_names(servers: &[ToolServerDescriptor]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut dups: Vec<String> = Vec::new();
    for s in servers {
        if !seen.insert(s.name.as_str()) && !dups.contains(&s.name) {
            dups.push(s.name.clone());
        }
    }
    dups
}
