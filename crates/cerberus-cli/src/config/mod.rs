//! Configuration management.

use anyhow::{Context as _, Result};
use cerberus::{DEFAULT_ENGINE_PATH, DEFAULT_TIMEOUT};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::output::OutputFormat;

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "CERBERUS_CONFIG";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Engine executable (`~` is expanded).
    pub engine_path: Option<String>,

    /// Engine time budget in seconds.
    pub timeout_secs: Option<u64>,

    /// Scratch root for job directories.
    pub scratch_dir: Option<String>,

    /// History file.
    pub history_path: Option<String>,

    /// Default output format.
    pub output_format: Option<OutputFormat>,

    /// Default for the engine's string-reference analysis; unset leaves it
    /// to the engine.
    pub include_strings: Option<bool>,

    /// Default for the engine's full disassembly; unset leaves it to the
    /// engine.
    pub disassemble: Option<bool>,

    /// Engine log level.
    pub log_level: Option<String>,
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "cerberus", "cerberusctl")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

impl Config {
    /// Get the config file path.
    pub fn path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Load configuration from file.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Set a key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "engine_path" | "engine" => self.engine_path = Some(value.to_string()),
            "timeout_secs" | "timeout" => {
                self.timeout_secs = Some(
                    value
                        .parse()
                        .with_context(|| format!("timeout_secs must be a number of seconds, got {value:?}"))?,
                );
            }
            "scratch_dir" => self.scratch_dir = Some(value.to_string()),
            "history_path" | "history" => self.history_path = Some(value.to_string()),
            "output_format" | "output" => self.output_format = Some(value.parse()?),
            "include_strings" => self.include_strings = Some(value.parse()?),
            "disassemble" => self.disassemble = Some(value.parse()?),
            "log_level" => self.log_level = Some(value.to_string()),
            _ => anyhow::bail!(
                "Unknown config key: {}\n\n\
                 Available keys:\n  \
                 engine_path      - Analysis engine executable\n  \
                 timeout_secs     - Engine time budget in seconds\n  \
                 scratch_dir      - Where job directories are created\n  \
                 history_path     - History file\n  \
                 output_format    - Default output format (pretty/json/csv/yaml)\n  \
                 include_strings  - Analyse string references (true/false)\n  \
                 disassemble      - Run full disassembly (true/false)\n  \
                 log_level        - Engine log level",
                key
            ),
        }
        Ok(())
    }

    /// Engine executable, falling back to the built-in default.
    #[must_use]
    pub fn engine_path(&self) -> PathBuf {
        expand(self.engine_path.as_deref().unwrap_or(DEFAULT_ENGINE_PATH))
    }

    /// Engine time budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout_secs.map_or(DEFAULT_TIMEOUT, Duration::from_secs)
    }

    /// Scratch root, if configured.
    #[must_use]
    pub fn scratch_dir(&self) -> Option<PathBuf> {
        self.scratch_dir.as_deref().map(expand)
    }

    /// History file, defaulting to the platform data directory.
    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.history_path {
            Some(path) => Ok(expand(path)),
            None => Ok(project_dirs()?.data_dir().join("history.json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine_path(), PathBuf::from(DEFAULT_ENGINE_PATH));
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert!(config.scratch_dir().is_none());
    }

    #[test]
    fn test_set_keys() {
        let mut config = Config::default();
        config.set("engine_path", "/opt/cerberus/bin/cerberus").unwrap();
        config.set("timeout", "60").unwrap();
        config.set("output", "json").unwrap();
        config.set("include_strings", "true").unwrap();

        assert_eq!(config.engine_path(), PathBuf::from("/opt/cerberus/bin/cerberus"));
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.output_format, Some(OutputFormat::Json));
        assert_eq!(config.include_strings, Some(true));
        assert_eq!(config.disassemble, None);

        assert!(config.set("timeout", "soon").is_err());
        assert!(config.set("api_key", "x").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.set("history_path", "/var/lib/cerberus/history.json").unwrap();
        config.set("log_level", "debug").unwrap();

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
