//! Layered configuration.
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. User global config, `~/.meterboard/config.toml`
//! 3. Project local config, `.meterboard.toml` in the working directory
//! 4. `METERBOARD_*` environment variables
//!
//! Command-line flags are applied by the binary on top of the result.
//! A missing section or field keeps the previous layer's value.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::package::PackageCatalog;
use crate::model::request::ViewMode;

const GLOBAL_CONFIG_FILE: &str = "config.toml";
const PROJECT_CONFIG_FILE: &str = ".meterboard.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Csv,
    Sqlite,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(StoreBackend::Json),
            "csv" | "sheet" => Ok(StoreBackend::Csv),
            "sqlite" | "sql" | "db" => Ok(StoreBackend::Sqlite),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Json => write!(f, "json"),
            StoreBackend::Csv => write!(f, "csv"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// `None` means `~/.meterboard`.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub packages: PackageCatalog,
    pub default_range_days: u32,
    pub default_view: ViewMode,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            packages: PackageCatalog::default(),
            default_range_days: 14,
            default_view: ViewMode::Combined,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive such as `warn` or `meterboard_core=debug`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Partial view of a config file; only what the file names overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    store: Option<StoreLayer>,
    dashboard: Option<DashboardLayer>,
    logging: Option<LoggingLayer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoreLayer {
    backend: Option<StoreBackend>,
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DashboardLayer {
    packages: Option<Vec<String>>,
    default_range_days: Option<u32>,
    default_view: Option<ViewMode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingLayer {
    level: Option<String>,
}

/// Loads the fully resolved configuration, plus a warning for every layer
/// that was ignored. Loading runs before logging is set up, so the caller
/// reports the warnings.
pub fn load() -> (Config, Vec<String>) {
    let mut config = Config::default();
    let mut warnings = Vec::new();

    if let Some(path) = global_config_path() {
        apply_file(&mut config, &path, &mut warnings);
    }
    apply_file(&mut config, Path::new(PROJECT_CONFIG_FILE), &mut warnings);
    warnings.extend(apply_env(&mut config, |key| std::env::var(key).ok()));

    (config, warnings)
}

pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".meterboard").join(GLOBAL_CONFIG_FILE))
}

fn apply_file(config: &mut Config, path: &Path, warnings: &mut Vec<String>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    if let Err(e) = apply_toml(config, &content) {
        warnings.push(format!("ignoring malformed config file {}: {}", path.display(), e));
    }
}

/// Parses one TOML document and merges it over `config`.
pub fn apply_toml(config: &mut Config, content: &str) -> Result<(), toml::de::Error> {
    let layer: ConfigLayer = toml::from_str(content)?;
    merge_layer(config, layer);
    Ok(())
}

fn merge_layer(config: &mut Config, layer: ConfigLayer) {
    if let Some(store) = layer.store {
        if let Some(backend) = store.backend {
            config.store.backend = backend;
        }
        if let Some(dir) = store.data_dir {
            config.store.data_dir = Some(dir);
        }
    }
    if let Some(dashboard) = layer.dashboard {
        if let Some(packages) = dashboard.packages {
            config.dashboard.packages = PackageCatalog::new(packages);
        }
        if let Some(days) = dashboard.default_range_days {
            config.dashboard.default_range_days = days.max(1);
        }
        if let Some(view) = dashboard.default_view {
            config.dashboard.default_view = view;
        }
    }
    if let Some(logging) = layer.logging {
        if let Some(level) = logging.level {
            config.logging.level = level;
        }
    }
}

/// Applies `METERBOARD_*` overrides read through `var`. Returns a warning
/// for each value that could not be used.
pub fn apply_env<F>(config: &mut Config, var: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut warnings = Vec::new();
    if let Some(dir) = var("METERBOARD_DATA_DIR").filter(|v| !v.is_empty()) {
        config.store.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(backend) = var("METERBOARD_BACKEND") {
        match backend.parse() {
            Ok(b) => config.store.backend = b,
            Err(e) => warnings.push(format!("ignoring METERBOARD_BACKEND: {}", e)),
        }
    }
    if let Some(level) = var("METERBOARD_LOG").filter(|v| !v.is_empty()) {
        config.logging.level = level;
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.backend, StoreBackend::Json);
        assert_eq!(config.dashboard.default_range_days, 14);
        assert_eq!(config.dashboard.packages.names().len(), 4);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_partial_toml_keeps_other_values() {
        let mut config = Config::default();
        apply_toml(
            &mut config,
            r#"
[store]
backend = "sqlite"

[dashboard]
packages = ["TN-95", "TN-99"]
"#,
        )
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.data_dir, None);
        assert_eq!(config.dashboard.packages.names(), ["TN-95", "TN-99"]);
        assert_eq!(config.dashboard.default_range_days, 14);
    }

    #[test]
    fn test_later_layers_win() {
        let mut config = Config::default();
        apply_toml(&mut config, "[dashboard]\ndefault_range_days = 30\ndefault_view = \"type-b\"").unwrap();
        apply_toml(&mut config, "[dashboard]\ndefault_range_days = 7").unwrap();
        assert_eq!(config.dashboard.default_range_days, 7);
        assert_eq!(config.dashboard.default_view, ViewMode::TypeB);
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let mut config = Config::default();
        assert!(apply_toml(&mut config, "[store\nbackend=").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("METERBOARD_DATA_DIR", "/srv/meters"),
            ("METERBOARD_BACKEND", "csv"),
            ("METERBOARD_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        let warnings = apply_env(&mut config, |k| env.get(k).map(|v| v.to_string()));
        assert!(warnings.is_empty());

        assert_eq!(config.store.data_dir, Some(PathBuf::from("/srv/meters")));
        assert_eq!(config.store.backend, StoreBackend::Csv);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_bad_env_backend_ignored() {
        let mut config = Config::default();
        let warnings = apply_env(&mut config, |k| (k == "METERBOARD_BACKEND").then(|| "oracle".to_string()));
        assert_eq!(config.store.backend, StoreBackend::Json);
        assert_eq!(warnings, vec!["ignoring METERBOARD_BACKEND: unknown store backend 'oracle'".to_string()]);
    }

    #[test]
    fn test_malformed_file_reports_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[store\nbackend=").unwrap();

        let mut config = Config::default();
        let mut warnings = Vec::new();
        apply_file(&mut config, &path, &mut warnings);
        assert_eq!(config, Config::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("malformed config file"));

        apply_file(&mut config, &dir.path().join("missing.toml"), &mut warnings);
        assert_eq!(warnings.len(), 1);
    }
}
