use chrono::FixedOffset;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::clinical::PressorPresets;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
    pub presets: PressorPresets,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
    /// Records kept before the oldest are dropped.
    pub history_limit: usize,
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            path: "data".to_string(),
            history_limit: 200,
            backend: StorageBackend::Memory,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Offset from UTC for CSV timestamps, in minutes.
    pub utc_offset_minutes: i32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig { utc_offset_minutes: 540 }
    }
}

impl ExportConfig {
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::Invalid(format!("utc_offset_minutes out of range: {}", self.utc_offset_minutes))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.history_limit == 0 {
            return Err(ConfigError::Invalid("storage.history_limit must be at least 1".to_string()));
        }
        self.export.utc_offset()?;
        Ok(())
    }
}

/// Load and validate configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
        _ => ConfigError::Io(e),
    })?;
    let config = parse_config(&contents)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical::Drug;
    use std::path::PathBuf;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = r#"
api:
  port: 8080
storage:
  backend: file
  path: /var/lib/ventpad
presets:
  norepinephrine:
    label: Noradrenaline
    default_concentration_mg_ml: 0.05
    choices_mg_ml: [0.05, 0.1]
"#;
        let config = parse_config(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.history_limit, 200);
        assert_eq!(config.presets.default_concentration(Drug::Norepinephrine), Some(0.05));
        assert_eq!(config.presets.default_concentration(Drug::Dopamine), Some(4.0));
        assert_eq!(config.export.utc_offset().unwrap(), FixedOffset::east_opt(9 * 3600).unwrap());
    }

    #[test]
    fn empty_file_is_default() {
        let config = parse_config("\n").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn rejects_zero_history_limit() {
        let config = parse_config("storage:\n  history_limit: 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_out_of_range_offset() {
        let config = parse_config("export:\n  utc_offset_minutes: 100000\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = PathBuf::from("/nonexistent/ventpad/config.yaml");
        assert!(matches!(load_config(&path), Err(ConfigError::NotFound(_))));
    }
}
