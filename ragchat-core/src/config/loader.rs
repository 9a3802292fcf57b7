//! Configuration loading and management
//!
//! Precedence: defaults < `config.json` < alias env vars < `RAGCHAT__` path env vars.

use super::schema::Config;
use super::validate::validate_config;
use crate::Error;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const ENV_PATH_PREFIX: &str = "RAGCHAT__";
const ENV_ALIASES: [(&str, &str); 3] = [
    ("RAGCHAT_TOKEN", "auth.token"),
    ("RAGCHAT_API_URL", "api.base_url"),
    ("RAGCHAT_WS_URL", "api.ws_url"),
];

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".ragchat"))
            .unwrap_or_else(|| PathBuf::from(".ragchat"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let mut merged = self.file_layer()?;
        for (path, value) in env_overrides(std::env::vars()) {
            insert_at(&mut merged, &path, value);
        }

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Defaults plus `config.json`, without environment overrides or validation
    pub fn load_file(&self) -> crate::Result<Config> {
        Ok(serde_json::from_value(self.file_layer()?)?)
    }

    /// Load the file, apply `edit` and write it back
    pub fn update<F>(&self, edit: F) -> crate::Result<Config>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load_file()?;
        edit(&mut config);
        self.save(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    fn file_layer(&self) -> crate::Result<Value> {
        let mut merged = serde_json::to_value(Config::default())?;
        let path = self.config_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let layer: Value = serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
            overlay(&mut merged, layer);
        }
        Ok(merged)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-merge `layer` into `base`; objects merge per key, anything else replaces
fn overlay(base: &mut Value, layer: Value) {
    let Value::Object(layer_map) = layer else {
        *base = layer;
        return;
    };
    if let Some(base_map) = base.as_object_mut() {
        for (key, value) in layer_map {
            match base_map.get_mut(&key) {
                Some(slot) => overlay(slot, value),
                None => {
                    base_map.insert(key, value);
                }
            }
        }
        return;
    }
    *base = Value::Object(layer_map);
}

/// Set `value` at a dotted path, creating intermediate objects
fn insert_at(node: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        insert_at(child, rest, value);
    }
}

/// Env values are JSON when they parse as JSON, plain strings otherwise
fn parse_env_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| match raw.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    })
}

/// Overrides in application order: aliases first, then `RAGCHAT__A__B` paths
fn env_overrides<I>(vars: I) -> Vec<(Vec<String>, Value)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut aliases = Vec::new();
    let mut paths = Vec::new();

    for (key, raw) in vars {
        if let Some((_, target)) = ENV_ALIASES.iter().find(|(alias, _)| *alias == key) {
            let path: Vec<String> = target.split('.').map(str::to_string).collect();
            aliases.push((path, Value::String(raw)));
            continue;
        }

        let Some(suffix) = key.strip_prefix(ENV_PATH_PREFIX) else {
            continue;
        };
        let path: Vec<String> = suffix
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if !path.is_empty() {
            paths.push((path, parse_env_value(&raw)));
        }
    }

    paths.sort_by(|a, b| a.0.cmp(&b.0));
    aliases.extend(paths);
    aliases
}
