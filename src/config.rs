//! Configuration file handling
//!
//! ```toml
//! data_dir = "/var/lib/wordloop"
//!
//! [telegram]
//! token = "123456:ABC..."
//! api_url = "https://api.telegram.org"
//! poll_timeout_secs = 30
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_NAME: &str = "wordloop";
const CONFIG_FILE: &str = "config.toml";

/// Environment variable that overrides `telegram.token`
pub const TOKEN_ENV: &str = "WORDLOOP_TELEGRAM_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the vocabulary and pending reminder jobs are kept
    pub data_dir: Option<PathBuf>,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub api_url: String,
    /// Long-poll timeout for getUpdates
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults. The token environment variable wins
    /// over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                log::debug!("Loading config from {}", path.display());
                Self::parse(&fs::read_to_string(&path)?)?
            }
            _ => Self::default(),
        };

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                config.telegram.token = Some(token.trim().to_string());
            }
        }

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Configured data directory, or the platform default
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .ok_or(ConfigError::DataDirNotFound)?
                .join(APP_NAME),
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
