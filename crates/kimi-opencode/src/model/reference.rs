//! Provider-namespaced model references such as `openrouter/moonshotai/kimi-k2.5`.

use std::fmt;

/// Model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "openrouter/moonshotai/kimi-k2.5";

/// Provider assumed for identifiers without a `provider/` prefix.
pub const DEFAULT_PROVIDER: &str = "openrouter";

/// A model identifier split into the provider key and the provider-local model id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReference {
    raw: String,
    provider: String,
    suffix: String,
}

impl ModelReference {
    /// Resolve an optional identifier, falling back to [`DEFAULT_MODEL`] when
    /// it is absent or empty.
    ///
    /// Splits on the first `/` only; anything after it (including further
    /// slashes) is the suffix.
    pub fn resolve(model: Option<&str>) -> Self {
        let raw = match model {
            Some(m) if !m.is_empty() => m,
            _ => DEFAULT_MODEL,
        };
        let (provider, suffix) = match raw.split_once('/') {
            Some((provider, suffix)) => (provider, suffix),
            None => (DEFAULT_PROVIDER, raw),
        };
        Self {
            raw: raw.to_string(),
            provider: provider.to_string(),
            suffix: suffix.to_string(),
        }
    }

    /// Full identifier as given (or defaulted), unsplit.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
