//! Frozen snapshot of the credentials the agent forwards to OpenCode.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

/// OpenRouter API key forwarded to the CLI.
pub const OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";

/// Keys captured into a snapshot.
pub const SNAPSHOT_KEYS: &[&str] = &[OPENROUTER_API_KEY];

static PROCESS_SNAPSHOT: Lazy<EnvSnapshot> = Lazy::new(EnvSnapshot::capture);

/// Lookup used when the frozen value is empty.
pub type EnvLookup = fn(&str) -> Option<String>;

/// Read a variable from the live process environment.
pub fn live_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Values of [`SNAPSHOT_KEYS`] as they were when captured; missing keys map to "".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    values: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self::capture_with(live_env)
    }

    pub fn capture_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let values = SNAPSHOT_KEYS
            .iter()
            .map(|k| (k.to_string(), lookup(k).unwrap_or_default()))
            .collect();
        Self { values }
    }

    /// Snapshot taken the first time any caller asks for it; fixed for the
    /// rest of the process.
    pub fn process() -> &'static EnvSnapshot {
        &PROCESS_SNAPSHOT
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Frozen value if non-empty, otherwise whatever `live` reports, otherwise "".
    pub fn resolve(&self, key: &str, live: EnvLookup) -> String {
        match self.get(key) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => live(key).unwrap_or_default(),
        }
    }
}
