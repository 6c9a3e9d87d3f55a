//! Setup/run shell commands for one OpenCode invocation.
//!
//! The setup command stages `opencode.json`; the run command waits for the
//! task's services, runs the CLI once, and tees everything into the agent
//! log. Neither retries: whatever the CLI does, the run ends when it exits
//! and judging the outcome is left to the caller.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::config::{OpenCodeConfig, build_opencode_config};
use super::shell::quote;
use crate::env::{EnvLookup, EnvSnapshot, OPENROUTER_API_KEY, live_env};
use crate::mcp::ToolServerDescriptor;
use crate::model::ModelReference;

pub const CONFIG_PATH: &str = "/app/opencode.json";
pub const WORK_DIR: &str = "/app";
pub const READINESS_SCRIPT: &str = "/ensure-services.sh";
pub const AGENT_LOG: &str = "/logs/agent/opencode-kimi.txt";
pub const OPENCODE_BIN: &str = "opencode";

/// One shell command plus the environment to run it with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecInput {
    pub command: String,
    pub env: BTreeMap<String, String>,
}

impl ExecInput {
    /// Copy safe to print: the API key value is masked, other entries untouched.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        if let Some(v) = out.env.get_mut(OPENROUTER_API_KEY) {
            *v = "***".to_string();
        }
        out
    }
}

/// Turns a config and task instruction into the setup and run commands.
#[derive(Debug, Clone)]
pub struct CommandComposer {
    snapshot: EnvSnapshot,
    live: EnvLookup,
}

impl CommandComposer {
    pub fn new(snapshot: EnvSnapshot) -> Self {
        Self {
            snapshot,
            live: live_env,
        }
    }

    /// Replace the fallback consulted when the snapshot has no API key.
    pub fn with_live_env(mut self, live: EnvLookup) -> Self {
        self.live = live;
        self
    }

    /// Environment shared by both commands; empty values are dropped.
    pub fn build_env(&self) -> BTreeMap<String, String> {
        let api_key = self.snapshot.resolve(OPENROUTER_API_KEY, self.live);
        [
            (OPENROUTER_API_KEY, api_key),
            ("OPENCODE_YOLO", "true".to_string()),
            ("OPENCODE_DANGEROUSLY_SKIP_PERMISSIONS", "true".to_string()),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// Write `config` to [`CONFIG_PATH`]. Does not touch services or the CLI.
    ///
    /// Assumes bash: its builtin `echo` writes the quoted JSON verbatim, while
    /// dash's `echo` expands backslash escapes inside JSON strings.
    pub fn setup_command(&self, config: &OpenCodeConfig) -> anyhow::Result<String> {
        let json = config
            .to_pretty_json()
            .context("failed to serialize opencode config")?;
        Ok(format!(
            "echo {} > {CONFIG_PATH} && echo '[kimi-setup] Wrote {CONFIG_PATH}'",
            quote(&json)
        ))
    }

    pub fn run_command(&self, instruction: &str, model: &ModelReference) -> String {
        format!(
            "echo '[kimi-setup] Starting game services...'; \
             {READINESS_SCRIPT}; \
             echo '[kimi-setup] Services ready, starting opencode'; \
             cd {WORK_DIR} && \
             {OPENCODE_BIN} --model {} run --format=json {} \
             2>&1 </dev/null | tee -a {AGENT_LOG}; \
             echo '[kimi] opencode exited' | tee -a {AGENT_LOG}",
            quote(model.raw()),
            quote(instruction)
        )
    }

    /// Setup then run, both carrying the same environment.
    pub fn compose(
        &self,
        instruction: &str,
        model: Option<&str>,
        servers: &[ToolServerDescriptor],
    ) -> anyhow::Result<[ExecInput; 2]> {
        let model = ModelReference::resolve(model);
        let config = build_opencode_config(&model, servers);
        let env = self.build_env();
        tracing::debug!(
            "composing commands: model={}, mcp_servers={}, env_keys={:?}",
            model,
            servers.len(),
            env.keys().collect::<Vec<_>>()
        );
        let setup = ExecInput {
            command: self.setup_command(&config)?,
            env: env.clone(),
        };
        let run = ExecInput {
            command: self.run_command(instruction, &model),
            env,
        };
        Ok([setup, run])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn live_key(key: &str) -> Option<String> {
        (key == OPENROUTER_API_KEY).then(|| "sk-live".to_string())
    }

    fn composer(frozen: Option<&str>, live: EnvLookup) -> CommandComposer {
        let snap = EnvSnapshot::capture_with(|_| frozen.map(str::to_string));
        CommandComposer::new(snap).with_live_env(live)
    }

    // Pull the single-quoted JSON argument back out of the setup command.
    fn embedded_json(setup: &str) -> String {
        let body = setup
            .strip_prefix("echo '")
            .and_then(|s| s.split_once(&format!("' > {CONFIG_PATH}")))
            .map(|(json, _)| json)
            .expect("quoted json in setup command");
        body.replace("'\"'\"'", "'")
    }

    #[test]
    fn missing_key_is_dropped_from_env() {
        let env = composer(None, no_env).build_env();
        assert!(!env.contains_key(OPENROUTER_API_KEY));
        assert_eq!(env.get("OPENCODE_YOLO").map(String::as_str), Some("true"));
        assert_eq!(
            env.get("OPENCODE_DANGEROUSLY_SKIP_PERMISSIONS").map(String::as_str),
            Some("true")
        );
        assert!(env.values().all(|v| !v.is_empty()));
    }

    #[test]
    fn frozen_key_beats_live_key() {
        let env = composer(Some("sk-frozen"), live_key).build_env();
        assert_eq!(env.get(OPENROUTER_API_KEY).map(String::as_str), Some("sk-frozen"));
    }

    #[test]
    fn live_key_used_when_snapshot_empty() {
        let env = composer(Some(""), live_key).build_env();
        assert_eq!(env.get(OPENROUTER_API_KEY).map(String::as_str), Some("sk-live"));
    }

    #[test]
    fn composes_setup_then_run_with_same_env() {
        let [setup, run] = composer(Some("sk"), no_env)
            .compose("do it", None, &[])
            .expect("compose");
        assert_eq!(setup.env, run.env);

        assert!(setup.command.contains(&format!("> {CONFIG_PATH} && ")));
        assert!(setup.command.ends_with("echo '[kimi-setup] Wrote /app/opencode.json'"));
        assert!(!setup.command.contains("ensure-services.sh"));
        assert!(!setup.command.contains("opencode --model"));

        assert!(run.command.contains("ensure-services.sh"));
        assert!(run.command.contains("opencode --model"));
    }

    #[test]
    fn run_command_matches_expected_pipeline() {
        let [_, run] = composer(None, no_env)
            .compose("fix it", Some("openrouter/moonshotai/kimi-k2.5"), &[])
            .expect("compose");
        assert_eq!(
            run.command,
            "echo '[kimi-setup] Starting game services...'; \
             /ensure-services.sh; \
             echo '[kimi-setup] Services ready, starting opencode'; \
             cd /app && \
             opencode --model openrouter/moonshotai/kimi-k2.5 run --format=json 'fix it' \
             2>&1 </dev/null | tee -a /logs/agent/opencode-kimi.txt; \
             echo '[kimi] opencode exited' | tee -a /logs/agent/opencode-kimi.txt"
        );
    }

    #[test]
    fn redacted_masks_only_the_api_key() {
        let [setup, _] = composer(Some("sk-secret"), no_env)
            .compose("task", None, &[])
            .expect("compose");
        let shown = setup.redacted();
        assert_eq!(shown.env.get(OPENROUTER_API_KEY).map(String::as_str), Some("***"));
        assert_eq!(shown.env.get("OPENCODE_YOLO").map(String::as_str), Some("true"));
        assert_eq!(shown.command, setup.command);
        assert_eq!(setup.env.get(OPENROUTER_API_KEY).map(String::as_str), Some("sk-secret"));
    }

    #[test]
    fn redacted_does_not_invent_a_key() {
        let [setup, _] = composer(None, no_env)
            .compose("task", None, &[])
            .expect("compose");
        let shown = setup.redacted();
        assert!(!shown.env.contains_key(OPENROUTER_API_KEY));
        assert_eq!(shown, setup);
    }

    #[test]
    fn hostile_instruction_stays_one_argument() {
        let [_, run] = composer(None, no_env)
            .compose("'; rm -rf / #", None, &[])
            .expect("compose");
        assert!(run.command.contains("run --format=json ''\"'\"'; rm -rf / #' 2>&1"));
    }

    #[test]
    fn embedded_json_round_trips_to_built_config() {
        let servers = vec![
            ToolServerDescriptor::stdio("game", "run.sh", &["--x", "it's"]),
            ToolServerDescriptor::remote("docs", "sse", "https://example"),
        ];
        let [setup, _] = composer(None, no_env)
            .compose("task", Some("openrouter/moonshotai/kimi-k2.5"), &servers)
            .expect("compose");
        let parsed: serde_json::Value =
            serde_json::from_str(&embedded_json(&setup.command)).expect("valid json");
        let expected = serde_json::to_value(build_opencode_config(
            &ModelReference::resolve(Some("openrouter/moonshotai/kimi-k2.5")),
            &servers,
        ))
        .expect("serialize");
        assert_eq!(parsed, expected);
    }
}
