//! Relocator configuration.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, EVENT_CHANNEL_SIZE};

/// Configuration shared by the engine, the coordinator and the CLI.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct RelocatorConfig {
    /// TOML file holding the root directory preference.
    #[builder(default = "default_settings_path()")]
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// Root directory used when none has been stored yet.
    #[builder(default = "default_root()")]
    #[serde(default = "default_root")]
    pub default_root: PathBuf,

    /// Name of the push channel carrying progress events.
    #[builder(default = "default_channel_name()")]
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Buffer size of the push channel.
    #[builder(default = "EVENT_CHANNEL_SIZE")]
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Key identifying the root directory preference for cache invalidation.
    #[builder(default = "default_preference_key()")]
    #[serde(default = "default_preference_key")]
    pub preference_key: String,

    /// Move old directories to the trash instead of deleting them.
    #[builder(default = "false")]
    #[serde(default)]
    pub use_trash: bool,

    /// Refuse to relocate into a directory that already holds files.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub require_empty_destination: bool,
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join("relocator")
}

fn default_settings_path() -> PathBuf {
    app_dir(dirs::config_dir()).join("settings.toml")
}

fn default_root() -> PathBuf {
    app_dir(dirs::data_dir())
}

fn default_channel_name() -> String {
    "relocation".to_string()
}

fn default_channel_capacity() -> usize {
    EVENT_CHANNEL_SIZE
}

fn default_preference_key() -> String {
    "root_directory".to_string()
}

fn default_true() -> bool {
    true
}

impl RelocatorConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.channel_capacity == Some(0) {
            return Err("Channel capacity must be greater than zero".to_string());
        }
        if self.channel_name.as_ref().is_some_and(|n| n.is_empty()) {
            return Err("Channel name cannot be empty".to_string());
        }
        if self.preference_key.as_ref().is_some_and(|k| k.is_empty()) {
            return Err("Preference key cannot be empty".to_string());
        }
        Ok(())
    }
}

impl RelocatorConfig {
    /// Create a new config builder.
    pub fn builder() -> RelocatorConfigBuilder {
        RelocatorConfigBuilder::default()
    }

    /// Default location of the config file.
    pub fn config_path() -> PathBuf {
        app_dir(dirs::config_dir()).join("config.toml")
    }

    /// Load the config from the default location.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&Self::config_path())
    }

    /// Load the config from `path`, or return defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde defaults cannot guard.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };

        if self.channel_capacity == 0 {
            return invalid("channel_capacity must be greater than zero");
        }
        if self.channel_name.is_empty() {
            return invalid("channel_name cannot be empty");
        }
        if self.preference_key.is_empty() {
            return invalid("preference_key cannot be empty");
        }
        Ok(())
    }
}

impl Default for RelocatorConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            default_root: default_root(),
            channel_name: default_channel_name(),
            channel_capacity: EVENT_CHANNEL_SIZE,
            preference_key: default_preference_key(),
            use_trash: false,
            require_empty_destination: true,
        }
    }
}
