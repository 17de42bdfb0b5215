use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SyncError};
use crate::filter::FilterSet;
use crate::session::SessionConfig;
use crate::transfer::{DEFAULT_MAX_POLLS, TransferLimits};

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
    /// Filter patterns shared by push, pull and prune.
    pub ignore: Vec<String>,
    pub max_polls: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_timeout_secs: Option<u64>,
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: String::new(),
            port: 22,
            username: String::new(),
            identity_file: None,
            ignore: Vec::new(),
            max_polls: Some(DEFAULT_MAX_POLLS),
            transfer_timeout_secs: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// JSON persistence shared by everything stored under `~/.ftpsync`.
pub(crate) trait StorageObject: Sized {
    fn pretty_json(&self) -> Result<String, serde_json::Error>;
    fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError>;
    /// Missing file yields the default value; a malformed one is an error.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError>;
}

impl<T: Serialize + DeserializeOwned + Default> StorageObject for T {
    fn pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |e: &dyn std::fmt::Display| ConfigError::Write(path.to_path_buf(), e.to_string());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(&e))?;
        }
        let body = self.pretty_json().map_err(|e| write_err(&e))?;
        std::fs::write(path, body).map_err(|e| write_err(&e))
    }

    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(ConfigError::Read(path.to_path_buf(), e.to_string())),
        };
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }
}

impl Config {
    /// `~/.ftpsync`
    pub fn storage_dir() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".".to_owned() + env!("CARGO_PKG_NAME")))
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::storage_dir()?.join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::read_from(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.save_to(path)
    }

    pub fn to_pretty_json(&self) -> String {
        self.pretty_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// A `max_polls` of 0 means unbounded, as on the command line.
    pub fn limits(&self) -> TransferLimits {
        TransferLimits {
            max_polls: self.max_polls.filter(|&m| m > 0),
            timeout: self.transfer_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn filter_set(&self) -> Result<FilterSet, SyncError> {
        FilterSet::new(&self.ignore)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            identity_file: self.identity_file.clone(),
            chunk_size: self.chunk_size,
        }
    }
}
