//! TOML task files: model, instruction and tool servers for one run.
//!
//! ```toml
//! model = "openrouter/moonshotai/kimi-k2.5"
//! instruction_file = "instruction.md"
//!
//! [[mcp_servers]]
//! name = "game"
//! transport = "stdio"
//! command = "/opt/game-mcp"
//! args = ["--port", "7000"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::mcp::ToolServerDescriptor;

#[derive(Debug, Default, Deserialize)]
pub struct TaskFile {
    pub model: Option<String>,
    pub instruction: Option<String>,
    /// Relative paths resolve against the task file's directory.
    pub instruction_file: Option<PathBuf>,
    #[serde(default)]
    pub mcp_servers: Vec<ToolServerDescriptor>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl TaskFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read task file {}", path.display()))?;
        let mut task = Self::from_toml_str(&s)
            .with_context(|| format!("failed to parse task file {}", path.display()))?;
        task.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(task)
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Exactly one of `instruction` / `instruction_file` must be set.
    pub fn instruction_text(&self) -> anyhow::Result<String> {
        match (&self.instruction, &self.instruction_file) {
            (Some(text), None) => Ok(text.clone()),
            (None, Some(file)) => {
                let path = if file.is_absolute() {
                    file.clone()
                } else {
                    self.base_dir.join(file)
                };
                std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read instruction {}", path.display()))
            }
            (Some(_), Some(_)) => bail!("task sets both instruction and instruction_file"),
            (None, None) => bail!("task sets neither instruction nor instruction_file"),
        }
    }
}
