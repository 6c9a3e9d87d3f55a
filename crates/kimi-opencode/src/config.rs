use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub run: Option<RunCfg>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunCfg {
    /// Model used when neither `KIMI_MODEL` nor the task file names one.
    pub model: Option<String>,
    pub execute: Option<bool>,
}

/// Resolve the adapter home: explicit value, else `$HOME/.kimi-opencode`, else `./.kimi-opencode`.
pub fn resolve_home(explicit: &str) -> PathBuf {
    if !explicit.is_empty() {
        expand_home(explicit)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".kimi-opencode")
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".kimi-opencode")
    }
}

/// Model precedence: `KIMI_MODEL` (when non-empty), then the task file, then `[run].model`.
pub fn resolve_model(
    env_model: &str,
    task_model: Option<&str>,
    user_cfg: Option<&UserConfig>,
) -> Option<String> {
    if !env_model.is_empty() {
        return Some(env_model.to_string());
    }
    task_model.map(str::to_string).or_else(|| {
        user_cfg
            .and_then(|c| c.run.as_ref())
            .and_then(|r| r.model.clone())
    })
}

/// Execute precedence: `KIMI_EXECUTE` when set, then `[run].execute`, then `default`.
pub fn resolve_execute(
    env_execute: Option<bool>,
    user_cfg: Option<&UserConfig>,
    default: bool,
) -> bool {
    env_execute.unwrap_or_else(|| {
        user_cfg
            .and_then(|c| c.run.as_ref())
            .and_then(|r| r.execute)
            .unwrap_or(default)
    })
}

pub fn load_user_config(home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = home.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)?;
    let cfg: UserConfig = toml::from_str(&s)?;
    Ok(Some(cfg))
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
