//! `opencode.json` generation from a model reference and tool servers.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::mcp::{ToolServerDescriptor, find_duplicate_names};
use crate::model::ModelReference;

/// Schema URL written into every generated config.
pub const CONFIG_SCHEMA: &str = "https://opencode.ai/config.json";

/// The subset of OpenCode's config this crate writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenCodeConfig {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub provider: BTreeMap<String, ProviderConfig>,
    /// Full model id, not the split parts.
    pub model: String,
    pub permission: BTreeMap<String, String>,
    /// Present only when at least one tool server is configured. Entries keep
    /// declaration order; a repeated name stays where it first appeared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp: Option<IndexMap<String, McpEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub models: BTreeMap<String, ModelOptions>,
}

/// Per-model options; always empty (`{}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {}

/// One `mcp.<name>` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpEntry {
    /// Spawned by the CLI: `[command, args...]`. A missing command stays `null`.
    Local {
        command: Vec<Option<String>>,
        enabled: bool,
    },
    Remote {
        url: Option<String>,
        enabled: bool,
    },
}

impl McpEntry {
    pub fn from_descriptor(server: &ToolServerDescriptor) -> Self {
        if server.is_stdio() {
            let command = std::iter::once(server.command.clone())
                .chain(server.args.iter().flatten().cloned().map(Some))
                .collect();
            McpEntry::Local {
                command,
                enabled: true,
            }
        } else {
            McpEntry::Remote {
                url: server.url.clone(),
                enabled: true,
            }
        }
    }
}

impl OpenCodeConfig {
    /// Indented JSON as written to disk.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Build the config for `model` with `servers` exposed under `mcp`.
///
/// Later servers replace earlier ones with the same name (keeping the first
/// position); each such name is logged at warn level.
pub fn build_opencode_config(
    model: &ModelReference,
    servers: &[ToolServerDescriptor],
) -> OpenCodeConfig {
    let mut models = BTreeMap::new();
    models.insert(model.suffix().to_string(), ModelOptions::default());
    let mut provider = BTreeMap::new();
    provider.insert(model.provider().to_string(), ProviderConfig { models });

    let mut permission = BTreeMap::new();
    permission.insert("*".to_string(), "allow".to_string());

    let mcp = if servers.is_empty() {
        None
    } else {
        for name in find_duplicate_names(servers) {
            tracing::warn!("mcp server '{}' declared more than once; last entry wins", name);
        }
        let mut entries = IndexMap::new();
        for server in servers {
            tracing::debug!(
                "mcp server {} (transport={})",
                server.name,
                server.transport
            );
            entries.insert(server.name.clone(), McpEntry::from_descriptor(server));
        }
        Some(entries)
    };

    OpenCodeConfig {
        schema: CONFIG_SCHEMA.to_string(),
        provider,
        model: model.raw().to_string(),
        permission,
        mcp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(model: Option<&str>, servers: &[ToolServerDescriptor]) -> serde_json::Value {
        let cfg = build_opencode_config(&ModelReference::resolve(model), servers);
        serde_json::to_value(&cfg).expect("serialize config")
    }

    #[test]
    fn default_model_config_shape() {
        let v = build(None, &[]);
        assert_eq!(
            v,
            json!({
                "$schema": "https://opencode.ai/config.json",
                "provider": {
                    "openrouter": { "models": { "moonshotai/kimi-k2.5": {} } }
                },
                "model": "openrouter/moonshotai/kimi-k2.5",
                "permission": { "*": "allow" }
            })
        );
        assert!(v.get("mcp").is_none());
    }

    #[test]
    fn bare_model_keeps_unsplit_model_field() {
        let v = build(Some("kimi-k2.5"), &[]);
        assert_eq!(v["model"], "kimi-k2.5");
        assert_eq!(v["provider"]["openrouter"]["models"]["kimi-k2.5"], json!({}));
    }

    #[test]
    fn stdio_server_becomes_local_entry() {
        let v = build(None, &[ToolServerDescriptor::stdio("name", "run.sh", &["--x"])]);
        assert_eq!(
            v["mcp"]["name"],
            json!({ "type": "local", "command": ["run.sh", "--x"], "enabled": true })
        );
    }

    #[test]
    fn remote_server_becomes_remote_entry() {
        let v = build(None, &[ToolServerDescriptor::remote("name", "sse", "https://example")]);
        assert_eq!(
            v["mcp"]["name"],
            json!({ "type": "remote", "url": "https://example", "enabled": true })
        );
    }

    #[test]
    fn malformed_descriptors_pass_through() {
        let no_command = ToolServerDescriptor {
            name: "broken".into(),
            transport: "stdio".into(),
            command: None,
            args: None,
            url: None,
        };
        let no_url = ToolServerDescriptor {
            name: "nowhere".into(),
            transport: "streamable-http".into(),
            command: Some("ignored".into()),
            args: None,
            url: None,
        };
        let v = build(None, &[no_command, no_url]);
        assert_eq!(v["mcp"]["broken"]["command"], json!([null]));
        assert_eq!(v["mcp"]["nowhere"]["url"], json!(null));
    }

    #[test]
    fn mcp_keys_match_distinct_names_last_wins() {
        let servers = vec![
            ToolServerDescriptor::stdio("game", "old.sh", &[]),
            ToolServerDescriptor::remote("docs", "sse", "https://docs"),
            ToolServerDescriptor::stdio("game", "new.sh", &["-v"]),
        ];
        let cfg = build_opencode_config(&ModelReference::resolve(None), &servers);
        let mcp = cfg.mcp.expect("mcp present");
        assert_eq!(mcp.keys().collect::<Vec<_>>(), vec!["game", "docs"]);
        assert_eq!(
            mcp["game"],
            McpEntry::Local {
                command: vec![Some("new.sh".into()), Some("-v".into())],
                enabled: true
            }
        );
    }

    #[test]
    fn mcp_entries_render_in_declaration_order() {
        let cfg = build_opencode_config(
            &ModelReference::resolve(None),
            &[
                ToolServerDescriptor::stdio("zeta", "z.sh", &[]),
                ToolServerDescriptor::remote("alpha", "sse", "https://alpha"),
            ],
        );
        let text = cfg.to_pretty_json().expect("render");
        let zeta = text.find("\"zeta\"").expect("zeta rendered");
        let alpha = text.find("\"alpha\"").expect("alpha rendered");
        assert!(zeta < alpha, "mcp entries out of declaration order:\n{text}");
    }

    #[test]
    fn pretty_json_parses_back_to_same_config() {
        let cfg = build_opencode_config(
            &ModelReference::resolve(Some("anthropic/claude")),
            &[ToolServerDescriptor::stdio("s", "srv", &["a b"])],
        );
        let text = cfg.to_pretty_json().expect("render");
        assert!(text.contains("\n  \"$schema\""));
        let back: OpenCodeConfig = serde_json::from_str(&text).expect("parse back");
        assert_eq!(back, cfg);
    }
}
