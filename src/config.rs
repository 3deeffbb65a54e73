//! Configuration loader and validator for the artisan portal.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub backend: Backend,
    pub site: Site,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    /// Output root; rendered pages land under `<data_dir>/html`.
    pub data_dir: String,
    /// How long a toast notification stays visible.
    pub notify_dismiss_ms: u64,
}

/// Hosted table store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backend {
    pub url: String,
    pub api_key: String,
    pub tables: Tables,
    pub storage_bucket: String,
}

/// Table names used by the pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tables {
    pub artisans: String,
    pub crafts: String,
}

/// Public site settings used to build detail links and QR images.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Site {
    pub public_base_url: String,
    pub profile_path: String,
    pub qr_service: String,
    pub qr_size: u32,
}

impl App {
    /// `data_dir` with a leading `~/` expanded to `$HOME`.
    pub fn resolved_data_dir(&self) -> String {
        if let Some(rest) = self.data_dir.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return format!("{}/{}", home.trim_end_matches('/'), rest);
            }
        }
        self.data_dir.clone()
    }

    pub fn notify_dismiss(&self) -> Duration {
        Duration::from_millis(self.notify_dismiss_ms)
    }
}

impl Config {
    /// Ensure required directories exist (creates `<data_dir>/html` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(Path::new(&self.app.resolved_data_dir()).join("html"))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.notify_dismiss_ms == 0 {
        return Err(ConfigError::Invalid("app.notify_dismiss_ms must be > 0"));
    }

    if reqwest::Url::parse(&cfg.backend.url).is_err() {
        return Err(ConfigError::Invalid("backend.url must be an absolute URL"));
    }
    if cfg.backend.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.api_key must be non-empty"));
    }
    if cfg.backend.tables.artisans.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.tables.artisans must be non-empty"));
    }
    if cfg.backend.tables.crafts.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.tables.crafts must be non-empty"));
    }
    if cfg.backend.storage_bucket.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.storage_bucket must be non-empty"));
    }

    if reqwest::Url::parse(&cfg.site.public_base_url).is_err() {
        return Err(ConfigError::Invalid("site.public_base_url must be an absolute URL"));
    }
    if cfg.site.profile_path.trim().is_empty() {
        return Err(ConfigError::Invalid("site.profile_path must be non-empty"));
    }
    if reqwest::Url::parse(&cfg.site.qr_service).is_err() {
        return Err(ConfigError::Invalid("site.qr_service must be an absolute URL"));
    }
    if cfg.site.qr_size == 0 {
        return Err(ConfigError::Invalid("site.qr_size must be > 0"));
    }

    Ok(())
}

/// Returns a complete example configuration.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  notify_dismiss_ms: 3000

backend:
  url: "https://YOUR_PROJECT.supabase.co/"
  api_key: "YOUR_ANON_OR_SERVICE_KEY"
  tables:
    artisans: "artisans_public"
    crafts: "crafts"
  storage_bucket: "artisan_files"

site:
  public_base_url: "https://example.github.io/artisans-demo/"
  profile_path: "artisan.html"
  qr_service: "https://api.qrserver.com/v1/create-qr-code/"
  qr_size: 120
"#
}
