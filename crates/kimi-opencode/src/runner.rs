//! Local executor for composed commands.
//!
//! Stands in for the benchmark host when running a task by hand: each
//! [`ExecInput`] is run through `bash -c`, one after another, with its env
//! layered over the inherited environment.

use anyhow::Context;
use async_trait::async_trait;

use crate::opencode::ExecInput;

/// Captured result of one command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Exit code, or -1 when the process was killed by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn ok(&self) -> bool {
        self.status == 0
    }
}

#[async_trait]
pub trait ExecRunner: Send + Sync {
    /// Run one command to completion.
    ///
    /// Errors represent launch failures; a nonzero status is not an error.
    async fn exec(&self, input: &ExecInput) -> anyhow::Result<ExecOutput>;
}

/// Runs commands with a shell (`bash` by default).
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::with_shell("bash")
    }

    pub fn with_shell(shell: &str) -> Self {
        Self {
            shell: shell.to_string(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecRunner for ShellRunner {
    async fn exec(&self, input: &ExecInput) -> anyhow::Result<ExecOutput> {
        tracing::debug!(
            "exec: shell={}, command_len={}, env_keys={:?}",
            self.shell,
            input.command.len(),
            input.env.keys().collect::<Vec<_>>()
        );
        let output = tokio::process::Command::new(&self.shell)
            .arg("-c")
            .arg(&input.command)
            .envs(&input.env)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to launch {}", self.shell))?;
        let status = output.status.code().unwrap_or(-1);
        tracing::info!(
            "exec finished: status={}, stdout_len={}, stderr_len={}",
            status,
            output.stdout.len(),
            output.stderr.len()
        );
        Ok(ExecOutput {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run `inputs` in order. Stops early only if a command cannot be launched.
pub async fn run_all(
    runner: &dyn ExecRunner,
    inputs: &[ExecInput],
) -> anyhow::Result<Vec<ExecOutput>> {
    let mut outputs = Vec::with_capacity(inputs.len());
    for (i, input) in inputs.iter().enumerate() {
        let out = runner
            .exec(input)
            .await
            .with_context(|| format!("command {} of {} failed to start", i + 1, inputs.len()))?;
        if !out.ok() {
            tracing::warn!("command {} exited with status {}", i + 1, out.status);
        }
        outputs.push(out);
    }
    Ok(outputs)
}
