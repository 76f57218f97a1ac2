//! Configuration resolution for SiteGate.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/sitegate/settings.json`)
//! 3. Explicit config file (e.g. `--config`)
//! 4. Environment variables
//!
//! Files are layered field by field: a file only replaces the keys it
//! names, so an explicit file that sets `logging` keeps the global
//! `animation` values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};

/// Complete SiteGate configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Panel animation settings.
///
/// The measurements only feed the simulated surfaces used outside a real
/// browser; a rendered panel measures its own content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Duration of one height transition (milliseconds).
    pub transition_ms: u64,
    /// Natural height of the file-loader inner content.
    pub loader_inner_height_px: u32,
    /// Height of one line of info text.
    pub info_line_height_px: u32,
    /// Characters that fit on one line of info text.
    pub info_chars_per_line: u32,
}

impl AnimationConfig {
    pub const fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            transition_ms: 250,
            loader_inner_height_px: 96,
            info_line_height_px: 18,
            info_chars_per_line: 40,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let global = global_config_path().filter(|p| p.exists());
    let layers: Vec<&Path> = global.as_deref().into_iter().chain(explicit).collect();

    let mut config = load_layers(&layers)?;
    apply_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Layer config files over the defaults, later files winning per field.
pub fn load_layers(paths: &[&Path]) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;
    for path in paths {
        merge_layer(&mut merged, load_config_file(path)?);
    }
    serde_json::from_value(merged).map_err(|e| Error::Config(format!("Invalid config: {e}")))
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sitegate").join("settings.json"))
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    debug!(path = %path.display(), "Loaded config file");
    let layer: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    if !layer.is_object() {
        return Err(Error::Config(format!(
            "Config file {} is not a JSON object",
            path.display()
        )));
    }
    Ok(layer)
}

/// Recursively merge `overlay` into `base`. Objects merge key by key;
/// anything else replaces the base value.
fn merge_layer(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_layer(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply `SITEGATE_*` overrides using `lookup` to read variables.
fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("SITEGATE_TRANSITION_MS") {
        if let Ok(n) = val.parse() {
            config.animation.transition_ms = n;
        }
    }
    if let Some(val) = lookup("SITEGATE_LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some(val) = lookup("SITEGATE_LOG_JSON") {
        config.logging.json = matches!(val.as_str(), "1" | "true" | "yes");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_transition_is_250ms() {
        let config = Config::default();
        assert_eq!(config.animation.transition(), Duration::from_millis(250));
        assert_eq!(config.logging.level, "info");
    }

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "settings.json", r#"{"animation": {"transition_ms": 40}}"#);

        let config = load_layers(&[path.as_path()]).unwrap();
        assert_eq!(config.animation.transition_ms, 40);
        assert_eq!(config.animation.loader_inner_height_px, 96);
        assert!(!config.logging.json);
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "settings.json", "{ not json");
        assert!(matches!(load_config_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn wrongly_typed_field_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "settings.json", r#"{"animation": {"transition_ms": "slow"}}"#);
        assert!(matches!(load_layers(&[path.as_path()]), Err(Error::Config(_))));

        let path = write(&dir, "list.json", "[]");
        assert!(matches!(load_layers(&[path.as_path()]), Err(Error::Config(_))));
    }

    #[test]
    fn overrides_take_priority() {
        let vars: HashMap<&str, &str> = [
            ("SITEGATE_TRANSITION_MS", "5"),
            ("SITEGATE_LOG_LEVEL", "debug"),
            ("SITEGATE_LOG_JSON", "true"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        apply_overrides(&mut config, |k| vars.get(k).map(ToString::to_string));
        assert_eq!(config.animation.transition_ms, 5);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn unparsable_transition_override_is_ignored() {
        let mut config = Config::default();
        apply_overrides(&mut config, |k| {
            (k == "SITEGATE_TRANSITION_MS").then(|| "fast".to_string())
        });
        assert_eq!(config.animation.transition_ms, 250);
    }

    #[test]
    fn explicit_file_overlays_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "popup.json", r#"{"logging": {"level": "trace", "json": true}}"#);
        let config = load_layers(&[path.as_path()]).unwrap();
        assert_eq!(config.logging.level, "trace");
        assert!(config.logging.json);
        assert_eq!(config.animation.transition_ms, 250);
    }

    #[test]
    fn later_file_only_replaces_the_fields_it_sets() {
        let dir = tempfile::tempdir().unwrap();
        let global = write(
            &dir,
            "settings.json",
            r#"{"animation": {"transition_ms": 40}, "logging": {"json": true}}"#,
        );
        let explicit = write(&dir, "popup.json", r#"{"logging": {"level": "debug"}}"#);

        let config = load_layers(&[global.as_path(), explicit.as_path()]).unwrap();
        assert_eq!(config.animation.transition_ms, 40);
        assert_eq!(config.animation.loader_inner_height_px, 96);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }
}
