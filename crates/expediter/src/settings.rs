//! Layered CLI settings.
//!
//! Loaded from three layers, in priority order:
//! 1. Compiled defaults — [`Settings::default()`]
//! 2. Settings file — `~/.expediter/settings.json`, deep-merged over
//!    the defaults
//! 3. Environment variables — `EXPEDITER_*`, highest priority
//!
//! Deep merge rules: objects merge recursively, arrays and primitives
//! are replaced, nulls in the source are skipped.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use expediter_runtime::orchestrator::DEFAULT_SYSTEM_PROMPT;

/// Database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the `SQLite` file shared by every activation.
    pub path: PathBuf,
    /// Connection pool size.
    pub pool_size: u32,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
        Self {
            path: PathBuf::from(home).join(".expediter").join("expediter.db"),
            pool_size: 8,
            busy_timeout_ms: 30_000,
        }
    }
}

/// Planner endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    /// Base URL of the converse-protocol endpoint.
    pub endpoint: String,
    /// Model identifier.
    pub model_id: String,
    /// Token cap per planner reply.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8787".to_owned(),
            model_id: "anthropic.claude-3-5-sonnet-20241022-v2:0".to_owned(),
            max_tokens: 4096,
            temperature: 0.0,
        }
    }
}

/// Root settings object.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Database settings.
    pub database: DatabaseSettings,
    /// Planner settings.
    pub planner: PlannerSettings,
    /// System instructions framing every planner call.
    pub system_prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            planner: PlannerSettings::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
        }
    }
}

/// Resolve the path to the settings file (`~/.expediter/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
    PathBuf::from(home).join(".expediter").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<Settings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let defaults = serde_json::to_value(Settings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let user: Value = serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in settings file {}", path.display()))?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: Settings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
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
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `EXPEDITER_*` environment overrides.
///
/// Invalid values are silently ignored, falling back to file/default.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Some(v) = read_env_str("EXPEDITER_DB_PATH") {
        settings.database.path = PathBuf::from(v);
    }
    if let Some(v) = read_env_u32("EXPEDITER_POOL_SIZE", 1, 64) {
        settings.database.pool_size = v;
    }
    if let Some(v) = read_env_str("EXPEDITER_PLANNER_ENDPOINT") {
        settings.planner.endpoint = v;
    }
    if let Some(v) = read_env_str("EXPEDITER_MODEL_ID") {
        settings.planner.model_id = v;
    }
    if let Some(v) = read_env_u32("EXPEDITER_MAX_TOKENS", 1, 128_000) {
        settings.planner.max_tokens = v;
    }
    if let Some(v) = read_env_str("EXPEDITER_SYSTEM_PROMPT") {
        settings.system_prompt = v;
    }
}

fn read_env_str(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    std::env::var(name)
        .ok()?
        .parse::<u32>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
