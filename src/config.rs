use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::TtlPolicy;
use crate::timeline::{ViewMode, ZoomLevel};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Heading printed above timeline output
  pub title: Option<String>,
  pub remote: RemoteConfig,
  pub mock: MockConfig,
  pub cache: CacheConfig,
  pub timeline: TimelineConfig,
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
  /// REST endpoint. The in-process mock server is used when unset.
  pub base_url: Option<String>,
  pub timeout_secs: u64,
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self {
      base_url: None,
      timeout_secs: 10,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockConfig {
  pub latency_min_ms: u64,
  pub latency_max_ms: u64,
  /// Start with demo projects, tasks and notifications
  pub seed: bool,
}

impl Default for MockConfig {
  fn default() -> Self {
    Self {
      latency_min_ms: 200,
      latency_max_ms: 800,
      seed: true,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  pub default_ttl_secs: u64,
  pub notification_ttl_secs: u64,
  pub search_ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      default_ttl_secs: 300,
      notification_ttl_secs: 60,
      search_ttl_secs: 30,
    }
  }
}

impl CacheConfig {
  pub fn ttl_policy(&self) -> TtlPolicy {
    TtlPolicy {
      default: chrono::Duration::seconds(secs(self.default_ttl_secs)),
      notifications: chrono::Duration::seconds(secs(self.notification_ttl_secs)),
      search: chrono::Duration::seconds(secs(self.search_ttl_secs)),
    }
  }
}

fn secs(value: u64) -> i64 {
  i64::try_from(value).unwrap_or(i64::MAX / 1000)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
  pub show_today: bool,
  pub min_bar_width: f64,
  /// Bars narrower than this print their label outside the bar
  pub label_min_width: f64,
  pub default_mode: ViewMode,
  pub zoom: f64,
}

impl Default for TimelineConfig {
  fn default() -> Self {
    Self {
      show_today: true,
      min_bar_width: 20.0,
      label_min_width: 60.0,
      default_mode: ViewMode::Weeks,
      zoom: 1.0,
    }
  }
}

impl TimelineConfig {
  pub fn zoom_level(&self) -> ZoomLevel {
    ZoomLevel::new(self.zoom)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Filter directive, overridden by SHOTBOARD_LOG
  pub level: String,
  /// Write daily log files here instead of stderr
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "warn".to_string(),
      directory: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./shotboard.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/shotboard/config.yaml
  ///
  /// Built-in defaults apply when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Config::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("shotboard.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("shotboard").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file deserializes to null rather than an empty mapping
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  pub fn remote_timeout(&self) -> Duration {
    Duration::from_secs(self.remote.timeout_secs)
  }

  /// Bearer token for the HTTP remote from SHOTBOARD_API_TOKEN, if set.
  pub fn api_token() -> Option<String> {
    std::env::var("SHOTBOARD_API_TOKEN")
      .ok()
      .filter(|token| !token.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_defaults_without_file() {
    let config = Config::default();
    assert!(config.remote.base_url.is_none());
    assert_eq!(config.remote_timeout(), Duration::from_secs(10));
    assert_eq!(config.mock.latency_min_ms, 200);
    assert_eq!(config.mock.latency_max_ms, 800);
    assert!(config.cache.enabled);
    assert_eq!(config.timeline.default_mode, ViewMode::Weeks);
    assert_eq!(config.log.level, "warn");
  }

  #[test]
  fn test_ttl_policy_from_config() {
    let policy = CacheConfig::default().ttl_policy();
    assert_eq!(policy.default, chrono::Duration::minutes(5));
    assert_eq!(policy.notifications, chrono::Duration::minutes(1));
    assert_eq!(policy.search, chrono::Duration::seconds(30));
  }

  #[test]
  fn test_partial_yaml_keeps_other_defaults() {
    let yaml = r#"
title: Nebula Drift
remote:
  base_url: https://tracker.example.com/api/
cache:
  search_ttl_secs: 5
timeline:
  default_mode: months
  zoom: 9
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.title.as_deref(), Some("Nebula Drift"));
    assert_eq!(
      config.remote.base_url.as_deref(),
      Some("https://tracker.example.com/api/")
    );
    assert_eq!(config.remote.timeout_secs, 10);
    assert_eq!(config.cache.search_ttl_secs, 5);
    assert_eq!(config.cache.default_ttl_secs, 300);
    assert_eq!(config.timeline.default_mode, ViewMode::Months);
    assert_eq!(config.timeline.zoom_level().value(), 3.0);
    assert!(config.mock.seed);
  }

  #[test]
  fn test_empty_file_is_defaults() {
    let config = Config::parse("  \n").unwrap();
    assert!(config.cache.enabled);
  }

  #[test]
  fn test_load_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "cache:\n  enabled: false\nlog:\n  level: debug").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert!(!config.cache.enabled);
    assert_eq!(config.log.level, "debug");
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");
    assert!(Config::load(Some(&missing)).is_err());
  }

  #[test]
  fn test_invalid_yaml_is_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "timeline:\n  default_mode: fortnights").unwrap();
    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
  }
}
