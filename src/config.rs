use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::WindowerOptions;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for the header (defaults to the API host)
  pub title: Option<String>,
  #[serde(default)]
  pub list: ListConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the jobs API
  #[serde(default = "default_api_url")]
  pub url: String,
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

/// Tuning for the virtualized job list
#[derive(Debug, Clone, Deserialize)]
pub struct ListConfig {
  /// Extra rows rendered beyond the visible range
  #[serde(default = "default_overscan")]
  pub overscan: usize,
  /// Trailing row count that triggers fetching the next page
  #[serde(default = "default_load_ahead")]
  pub load_ahead: usize,
}

impl Default for ListConfig {
  fn default() -> Self {
    Self {
      overscan: default_overscan(),
      load_ahead: default_load_ahead(),
    }
  }
}

impl ListConfig {
  pub fn windower_options(&self) -> WindowerOptions {
    WindowerOptions {
      estimate_size: 1,
      overscan: self.overscan,
      load_ahead: self.load_ahead,
    }
  }
}

fn default_api_url() -> String {
  "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_overscan() -> usize {
  10
}

fn default_load_ahead() -> usize {
  5
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./jobdash.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jobdash/config.yaml
  ///
  /// A missing config file is fine; the defaults point at a local
  /// backend. `JOBDASH_API_URL` overrides the configured URL.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var("JOBDASH_API_URL") {
      config.api.url = url;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("jobdash.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("jobdash").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Host portion of the API URL, for the header bar
  pub fn api_host(&self) -> &str {
    let url = self.api.url.as_str();
    let url = url
      .strip_prefix("https://")
      .or_else(|| url.strip_prefix("http://"))
      .unwrap_or(url);
    url.split('/').next().unwrap_or(url)
  }
}
