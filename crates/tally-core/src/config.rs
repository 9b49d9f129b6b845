//! tally.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::vocabulary::MetricVocabulary;

pub const DEFAULT_PORT: u16 = 8480;
pub const DEFAULT_DATA_DIR: &str = "/var/lib/tally";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid metric name in [metrics].extra: {0:?}")]
    InvalidMetricName(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Deadline applied to each store call. Unset means no deadline.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Metric names accepted in addition to the built-in vocabulary.
    #[serde(default)]
    pub extra: Vec<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            timeout_ms: None,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl TallyConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a config document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: TallyConfig = toml::from_str(content)?;
        config.vocabulary()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Built-in metric names plus `[metrics].extra`.
    pub fn vocabulary(&self) -> Result<MetricVocabulary, ConfigError> {
        MetricVocabulary::with_extra(self.metrics.extra.iter().cloned())
            .map_err(ConfigError::InvalidMetricName)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = TallyConfig::parse("").unwrap();
        assert_eq!(config, TallyConfig::default());
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.store.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert!(config.store.timeout().is_none());
    }

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
[server]
port = 9000

[store]
data_dir = "/tmp/tally"
timeout_ms = 1500

[metrics]
extra = ["map_tile_loads"]
"#;
        let config = TallyConfig::parse(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.store.data_dir, PathBuf::from("/tmp/tally"));
        assert_eq!(config.store.timeout(), Some(Duration::from_millis(1500)));
        assert!(config.vocabulary().unwrap().contains("map_tile_loads"));
    }

    #[test]
    fn test_invalid_extra_metric_rejected() {
        let toml_str = r#"
[metrics]
extra = ["Not Valid"]
"#;
        let err = TallyConfig::parse(toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMetricName(ref n) if n == "Not Valid"));
    }

    #[test]
    fn test_render_roundtrip() {
        let mut config = TallyConfig::default();
        config.metrics.extra.push("map_tile_loads".to_string());
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("map_tile_loads"));
        assert_eq!(TallyConfig::parse(&rendered).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        std::fs::write(&path, "[server]\nport = 1234\n").unwrap();
        let config = TallyConfig::from_file(&path).unwrap();
        assert_eq!(config.server.port, 1234);

        let missing = TallyConfig::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
