//! Loading, reloading and re-encoding of the rate configuration.
//!
//! Sources are tried in order: a TOML secrets document whose `config` key
//! holds the JSON as a string, then a JSON file, then `config.json` in the
//! per-user config directory.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use directories::ProjectDirs;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::RateConfiguration;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "QuoteCalculator";
const APP_NAME: &str = "QuoteCalculator";

pub const CONFIG_FILENAME: &str = "config.json";
/// Key of the embedded JSON string inside a secrets document.
pub const SECRETS_CONFIG_KEY: &str = "config";
pub const CONFIG_PATH_ENV: &str = "QUOTE_CONFIG";
pub const SECRETS_PATH_ENV: &str = "QUOTE_SECRETS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config directory unavailable")]
    StorageUnavailable,
    #[error("no configuration found (looked for {0})")]
    NotFound(PathBuf),
    #[error("secrets document has no `config` string")]
    MissingSecret,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    TomlEncode(#[from] toml::ser::Error),
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

pub fn parse_config(json: &str) -> Result<RateConfiguration, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

pub fn parse_secrets(document: &str) -> Result<RateConfiguration, ConfigError> {
    let table: toml::Table = document.parse()?;
    let json = table
        .get(SECRETS_CONFIG_KEY)
        .and_then(toml::Value::as_str)
        .ok_or(ConfigError::MissingSecret)?;
    parse_config(json)
}

pub fn load_config_file(path: &Path) -> Result<RateConfiguration, ConfigError> {
    let data = fs::read_to_string(path)?;
    parse_config(&data)
}

pub fn load_secrets_file(path: &Path) -> Result<RateConfiguration, ConfigError> {
    let data = fs::read_to_string(path)?;
    parse_secrets(&data)
}

pub fn to_json_pretty(config: &RateConfiguration) -> Result<String, ConfigError> {
    Ok(serde_json::to_string_pretty(config)?)
}

#[derive(Serialize)]
struct SecretsDocument<'a> {
    config: &'a str,
}

/// Encodes `config` as a one-line secrets document (`config = "<compact json>"`).
pub fn encode_secrets(config: &RateConfiguration) -> Result<String, ConfigError> {
    let compact = serde_json::to_string(config)?;
    Ok(toml::to_string(&SecretsDocument { config: &compact })?)
}

/// Writes `config` as pretty JSON, creating parent directories as needed.
pub fn save_config_file(path: &Path, config: &RateConfiguration) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json_pretty(config)?)?;
    Ok(())
}

/// Where a configuration is read from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigSource {
    pub secrets: Option<PathBuf>,
    pub file: Option<PathBuf>,
    /// Consulted only when neither of the above produced a configuration.
    pub default_path: Option<PathBuf>,
}

impl ConfigSource {
    /// No explicit sources; falls back to the per-user default path.
    pub fn new() -> Self {
        Self {
            secrets: None,
            file: None,
            default_path: default_config_path(),
        }
    }

    pub fn with_secrets(mut self, path: impl Into<PathBuf>) -> Self {
        self.secrets = Some(path.into());
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// A broken secrets document falls through to the file sources; an
    /// unreadable file is an error.
    pub fn load(&self) -> Result<RateConfiguration, ConfigError> {
        if let Some(path) = &self.secrets {
            match load_secrets_file(path) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration from secrets");
                    return Ok(config);
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "secrets unusable, trying config file");
                }
            }
        }

        let path = match (&self.file, &self.default_path) {
            (Some(path), _) => path,
            (None, Some(path)) if path.exists() => path,
            (None, Some(path)) => return Err(ConfigError::NotFound(path.clone())),
            (None, None) => return Err(ConfigError::StorageUnavailable),
        };
        let config = load_config_file(path)?;
        info!(
            path = %path.display(),
            material_types = config.materials.len(),
            "loaded configuration"
        );
        Ok(config)
    }
}

/// Current configuration snapshot plus the source it is reloaded from.
///
/// Pricing calls take a snapshot and keep it for the whole computation, so a
/// reload never shows them a half-updated table.
#[derive(Debug)]
pub struct ConfigHandle {
    source: ConfigSource,
    current: Arc<RateConfiguration>,
    generation: u64,
}

impl ConfigHandle {
    pub fn open(source: ConfigSource) -> Result<Self, ConfigError> {
        let config = source.load()?;
        Ok(Self {
            source,
            current: Arc::new(config),
            generation: 1,
        })
    }

    pub fn from_config(config: RateConfiguration) -> Self {
        Self {
            source: ConfigSource::default(),
            current: Arc::new(config),
            generation: 1,
        }
    }

    pub fn snapshot(&self) -> Arc<RateConfiguration> {
        Arc::clone(&self.current)
    }

    /// Incremented on every successful reload or replace.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Re-reads the source. On failure the previous snapshot stays current.
    pub fn reload(&mut self) -> Result<Arc<RateConfiguration>, ConfigError> {
        let config = self.source.load()?;
        self.replace(config);
        info!(generation = self.generation, "configuration reloaded");
        Ok(self.snapshot())
    }

    /// Installs an edited configuration without touching the source.
    pub fn replace(&mut self, config: RateConfiguration) {
        self.current = Arc::new(config);
        self.generation += 1;
    }
}
