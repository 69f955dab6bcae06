//! Configuration loading and generation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::filter::Thresholds;
use crate::engine::history::HistoryConfig;
use crate::engine::metrics::MetricsConfig;
use crate::engine::priority::PriorityConfig;
use crate::error::RankError;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Enable debug logging to file
    pub debug: bool,

    /// Path to log directory
    pub log_path: PathBuf,

    /// Disharmony filter floors
    pub thresholds: Thresholds,

    /// How effort and change proneness combine into a priority
    pub priority: PriorityConfig,

    /// Git history collection
    pub history: HistoryConfig,

    /// Class metrics report discovery
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            log_path: default_log_path(),
            thresholds: Thresholds::default(),
            priority: PriorityConfig::default(),
            history: HistoryConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Check every section; runs after CLI overrides are merged.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.priority.validate()?;
        self.history.validate()?;
        if self.metrics.report_glob.trim().is_empty() {
            anyhow::bail!(RankError::invalid_config("metrics.report_glob must not be empty"));
        }
        Ok(())
    }
}

/// Default log path: ~/.config/refactor-first/logs
fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("refactor-first")
        .join("logs")
}

/// Configuration service.
pub struct ConfigService;

impl ConfigService {
    /// Get the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("refactor-first")
            .join("config.toml")
    }

    /// Load configuration from file.
    ///
    /// If `path` is `None`, uses the default path.
    /// If the file doesn't exist, returns default configuration.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);
        let config_dir = path.parent();

        if !path.exists() {
            // Return defaults, never auto-create
            let mut config = Config::default();
            if let Some(dir) = config_dir {
                config.log_path = dir.join("logs");
            }
            return Ok(config);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content).map_err(|e| {
            RankError::invalid_config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })?;

        // If log_path was not explicitly set, use config file's directory/logs
        if config.log_path == default_log_path()
            && let Some(dir) = config_dir
        {
            config.log_path = dir.join("logs");
        }

        Ok(config)
    }

    /// Generate default configuration file at the default path.
    pub fn generate_default() -> Result<PathBuf> {
        let path = Self::default_path();
        Self::generate_at(&path)?;
        Ok(path)
    }

    /// Generate default configuration file at the specified path.
    pub fn generate_at(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = Self::default_config_content();
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Generate default configuration content with comments.
    fn default_config_content() -> String {
        r#"# refactor-first configuration file

# Enable debug logging to file (default: false)
debug = false

# Path to log directory (default: ~/.config/refactor-first/logs)
# log_path = "~/.config/refactor-first/logs"

# A class is a candidate when (wmc > wmc AND atfd > atfd) OR tcc < tcc
[thresholds]
wmc = 47
atfd = 5
tcc = 0.33

# "quick-win": prefer change-prone classes that are cheap to fix
# "weighted": change_weight * change - effort_weight * effort
[priority]
policy = "quick-win"
effort_weight = 1.0
change_weight = 1.0

[history]
# Abort when a git command runs longer than this
timeout_secs = 120
# Only read the most recent N commits (default: all)
# max_commits = 5000

[metrics]
# Class metrics reports written by the static analyser, relative to --dir
report_glob = "**/class-metrics.{json,ndjson,jsonl,yaml,yml}"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::priority::PolicyKind;
    use crate::error::ErrorCode;

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = ConfigService::default_path();
        assert!(path.ends_with("refactor-first/config.toml"));
    }

    #[test]
    fn test_default_path_contains_dot_config() {
        let path = ConfigService::default_path();
        let path_str = path.to_string_lossy();
        assert!(
            path_str.contains(".config"),
            "Path should contain .config: {path_str}",
        );
    }

    #[test]
    fn test_generate_at_creates_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("test_config.toml");

        ConfigService::generate_at(&config_path).unwrap();

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("debug = false"));
        assert!(content.contains("log_path"));
    }

    #[test]
    fn test_generate_at_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("nested").join("dir").join("config.toml");

        ConfigService::generate_at(&config_path).unwrap();

        assert!(config_path.exists());
    }

    #[test]
    fn test_generated_config_round_trips_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        ConfigService::generate_at(&config_path).unwrap();

        let config = ConfigService::load(Some(&config_path)).unwrap();
        let defaults = Config::default();
        assert_eq!(config.thresholds, defaults.thresholds);
        assert_eq!(config.priority, defaults.priority);
        assert_eq!(config.history, defaults.history);
        assert_eq!(config.metrics, defaults.metrics);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = ConfigService::load(Some(&config_path)).unwrap();

        // Should return defaults without creating file
        assert!(!config_path.exists());
        assert!(!config.debug);
        assert_eq!(config.thresholds.wmc, 47);
        assert_eq!(config.log_path, dir.path().join("logs"));
    }

    #[test]
    fn test_load_parses_existing_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "debug = true\n").unwrap();

        let config = ConfigService::load(Some(&config_path)).unwrap();
        assert!(config.debug);
    }

    #[test]
    fn test_load_partial_sections_keep_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "[thresholds]\nwmc = 20\n\n[priority]\npolicy = \"weighted\"\n\n[history]\nmax_commits = 10\n",
        )
        .unwrap();

        let config = ConfigService::load(Some(&config_path)).unwrap();
        assert_eq!(config.thresholds.wmc, 20);
        assert_eq!(config.thresholds.atfd, 5);
        assert_eq!(config.priority.policy, PolicyKind::Weighted);
        assert_eq!(config.history.max_commits, Some(10));
        assert_eq!(config.history.timeout_secs, 120);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("bad.toml");

        fs::write(&config_path, "not valid [[[").unwrap();

        let err = ConfigService::load(Some(&config_path)).unwrap_err();
        let code = err.downcast_ref::<RankError>().unwrap().code;
        assert_eq!(code, ErrorCode::InvalidConfig);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = Config::default();
        config.thresholds.tcc = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.history.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.metrics.report_glob = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_content_has_all_fields() {
        let content = ConfigService::default_config_content();
        assert!(content.contains("debug = false"));
        assert!(content.contains("log_path"));
        assert!(content.contains("[thresholds]"));
        assert!(content.contains("[priority]"));
        assert!(content.contains("[history]"));
        assert!(content.contains("[metrics]"));
    }

    #[test]
    fn test_load_custom_log_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "debug = true\nlog_path = \"/tmp/refactor-first-logs\"\n",
        )
        .unwrap();

        let config = ConfigService::load(Some(&config_path)).unwrap();
        assert!(config.debug);
        assert_eq!(config.log_path, PathBuf::from("/tmp/refactor-first-logs"));
    }
}
