use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::api::resource::ResourceKind;

const APP_NAME: &str = "courseterm";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  /// Collection opened at startup
  #[serde(default, deserialize_with = "deserialize_resource")]
  pub default_resource: Option<ResourceKind>,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL; requests go to `<url>/v1/<resource>`
  pub url: String,
  /// Items per list page
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Base URL of the AI-likelihood service; predictions go to
  /// `<ai_url>/predict/`
  pub ai_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter directive used when RUST_LOG is not set
  #[serde(default = "default_log_level")]
  pub level: String,
  pub file: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: None,
    }
  }
}

fn default_page_size() -> u32 {
  10
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_log_level() -> String {
  "info".to_string()
}

fn deserialize_resource<'de, D>(deserializer: D) -> Result<Option<ResourceKind>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let raw: Option<String> = Option::deserialize(deserializer)?;
  raw
    .map(|s| s.parse().map_err(serde::de::Error::custom))
    .transpose()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./courseterm.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/courseterm/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/{}/config.yaml\n\
         with at least:\n\n  api:\n    url: https://lms.example.com/api",
        APP_NAME
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(format!("{}.yaml", APP_NAME));
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join(APP_NAME).join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config =
      serde_yaml::from_str(contents).map_err(|e| eyre!("Failed to parse config: {}", e))?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    self.api_url()?;
    self.ai_url()?;
    if self.api.page_size == 0 {
      return Err(eyre!("api.page_size must be positive"));
    }
    if self.api.timeout_secs == 0 {
      return Err(eyre!("api.timeout_secs must be positive"));
    }
    Ok(())
  }

  /// Parsed base URL of the API.
  pub fn api_url(&self) -> Result<Url> {
    let url = Url::parse(&self.api.url)
      .map_err(|e| eyre!("Invalid api.url '{}': {}", self.api.url, e))?;
    if url.cannot_be_a_base() {
      return Err(eyre!("Invalid api.url '{}': not a base URL", self.api.url));
    }
    Ok(url)
  }

  /// Parsed AI service URL, `None` when predictions are not set up.
  pub fn ai_url(&self) -> Result<Option<Url>> {
    let Some(raw) = &self.api.ai_url else {
      return Ok(None);
    };
    let url = Url::parse(raw).map_err(|e| eyre!("Invalid api.ai_url '{}': {}", raw, e))?;
    if url.cannot_be_a_base() {
      return Err(eyre!("Invalid api.ai_url '{}': not a base URL", raw));
    }
    Ok(Some(url))
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs)
  }

  /// Header title: the configured one, else the API host.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    self
      .api_url()
      .ok()
      .and_then(|u| u.host_str().map(str::to_string))
      .unwrap_or_else(|| APP_NAME.to_string())
  }

  /// Log file path: configured, else `<data dir>/courseterm/courseterm.log`.
  pub fn log_file(&self) -> Result<PathBuf> {
    if let Some(file) = &self.log.file {
      return Ok(file.clone());
    }
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;
    Ok(data_dir.join(APP_NAME).join(format!("{}.log", APP_NAME)))
  }

  /// Get the optional bearer token from environment variables.
  ///
  /// Checks COURSETERM_API_TOKEN first, then LMS_API_TOKEN as fallback.
  pub fn get_api_token() -> Option<String> {
    std::env::var("COURSETERM_API_TOKEN")
      .or_else(|_| std::env::var("LMS_API_TOKEN"))
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}
