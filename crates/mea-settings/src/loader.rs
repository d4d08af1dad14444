//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`MeaSettings::default()`]
//! 2. If `~/.mea/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `MEA_*` environment overrides
//! 4. Validate the backend URL
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{HttpRoute, MeaSettings, TransportKind};

/// `~/.mea`, falling back to `/tmp/.mea` without `HOME`.
pub fn mea_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".mea")
}

/// Path to the settings file (`~/.mea/settings.json`).
pub fn settings_path() -> PathBuf {
    mea_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<MeaSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an unusable `baseUrl` is
/// an error.
pub fn load_settings_from_path(path: &Path) -> Result<MeaSettings> {
    load_with(path, |name| std::env::var(name).ok())
}

/// Load from `path`, resolving overrides through `lookup` instead of the
/// process environment.
pub fn load_with<F>(path: &Path, lookup: F) -> Result<MeaSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(MeaSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: MeaSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    let _ = settings.server.base()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `MEA_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut MeaSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply `MEA_*` overrides resolved through `lookup`.
///
/// Numbers must parse and fall within range; enums must use a known
/// spelling. Invalid values are ignored with a warning.
pub fn apply_overrides<F>(settings: &mut MeaSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.string("MEA_BASE_URL") {
        settings.server.base_url = v;
    }
    if let Some(v) = env.string("MEA_WS_PATH") {
        settings.server.ws_path = v;
    }
    if let Some(v) = env.parsed("MEA_TRANSPORT", TransportKind::parse) {
        settings.server.transport = v;
    }
    if let Some(v) = env.parsed("MEA_HTTP_ROUTE", HttpRoute::parse) {
        settings.server.http_route = v;
    }
    if let Some(v) = env.parsed("MEA_REQUEST_TIMEOUT_MS", |s| parse_u64_range(s, 1_000, 600_000)) {
        settings.server.request_timeout_ms = v;
    }
    if let Some(v) = env.parsed("MEA_TOP_K", |s| parse_usize_range(s, 1, 100)) {
        settings.chat.top_k = v;
    }
    if let Some(v) = env.parsed("MEA_TYPING_INTERVAL_MS", |s| parse_u64_range(s, 50, 10_000)) {
        settings.chat.typing_interval_ms = v;
    }
    if let Some(v) = env.parsed("MEA_POLL_INTERVAL_MS", |s| parse_u64_range(s, 100, 60_000)) {
        settings.progress.poll_interval_ms = v;
    }
    if let Some(v) = env.string("MEA_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("MEA_TOKEN_FILE") {
        settings.auth.token_file = Some(v);
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}
