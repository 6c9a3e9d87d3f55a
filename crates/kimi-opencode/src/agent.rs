//! Installed-agent adapter for running Kimi through OpenCode and OpenRouter.

use crate::env::EnvSnapshot;
use crate::mcp::ToolServerDescriptor;
use crate::model::ModelReference;
use crate::opencode::{CommandComposer, ExecInput, OpenCodeConfig, build_opencode_config};

/// An agent whose CLI is already installed in the task environment.
///
/// Implementations only describe what to run; executing the returned
/// commands, in order, is the caller's job.
pub trait InstalledAgent {
    /// Stable identifier used to select the agent.
    fn name(&self) -> &'static str;

    fn create_run_agent_commands(&self, instruction: &str) -> anyhow::Result<Vec<ExecInput>>;
}

/// Kimi K2.5 via the OpenCode CLI with OpenRouter as provider.
#[derive(Debug, Clone)]
pub struct KimiOpenCode {
    model_name: Option<String>,
    mcp_servers: Vec<ToolServerDescriptor>,
    composer: CommandComposer,
}

impl KimiOpenCode {
    pub const NAME: &'static str = "kimi-opencode";

    /// Uses the process-wide credential snapshot.
    pub fn new(model_name: Option<String>, mcp_servers: Vec<ToolServerDescriptor>) -> Self {
        Self::with_composer(
            model_name,
            mcp_servers,
            CommandComposer::new(EnvSnapshot::process().clone()),
        )
    }

    pub fn with_composer(
        model_name: Option<String>,
        mcp_servers: Vec<ToolServerDescriptor>,
        composer: CommandComposer,
    ) -> Self {
        Self {
            model_name,
            mcp_servers,
            composer,
        }
    }

    pub fn model(&self) -> ModelReference {
        ModelReference::resolve(self.model_name.as_deref())
    }

    pub fn build_opencode_config(&self) -> OpenCodeConfig {
        build_opencode_config(&self.model(), &self.mcp_servers)
    }
}

impl InstalledAgent for KimiOpenCode {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn create_run_agent_commands(&self, instruction: &str) -> anyhow::Result<Vec<ExecInput>> {
        tracing::info!(
            "creating run commands: agent={}, model={}, mcp_servers={}",
            Self::NAME,
            self.model(),
            self.mcp_servers.len()
        );
        let commands =
            self.composer
                .compose(instruction, self.model_name.as_deref(), &self.mcp_servers)?;
        Ok(commands.into())
    }
}
