//! Global daycal configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{DaycalError, DaycalResult};
use crate::event::MAX_SPAN_DAYS;

static DEFAULT_DATA_DIR: &str = "~/.daycal/data";
static DEFAULT_CACHE_DIR: &str = "~/.daycal/cache";
static DEFAULT_COLLECTION: &str = "events";

const STORE_FILE: &str = "documents.json";
const SESSION_FILE: &str = "session.json";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_max_span_days() -> i64 {
    MAX_SPAN_DAYS
}

/// Configuration at ~/.config/daycal/config.toml
///
/// Every key can be overridden from the environment with a `DAYCAL_` prefix,
/// e.g. `DAYCAL_DATA_DIR=/tmp/daycal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaycalConfig {
    /// Where the document store keeps its file.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Where the offline mirror and the session live.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Document collection holding events.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Color given to new events that don't pick one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_color: Option<String>,

    /// Longest span, in days past the start date, a saved event may cover.
    #[serde(default = "default_max_span_days")]
    pub max_span_days: i64,

    #[serde(default)]
    pub show_week_numbers: bool,
}

impl Default for DaycalConfig {
    fn default() -> Self {
        DaycalConfig {
            data_dir: default_data_dir(),
            cache_dir: default_cache_dir(),
            collection: default_collection(),
            default_color: None,
            max_span_days: default_max_span_days(),
            show_week_numbers: false,
        }
    }
}

impl DaycalConfig {
    pub fn config_path() -> DaycalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DaycalError::Config("Could not determine config directory".into()))?
            .join("daycal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the global config, writing a commented default file on first run.
    pub fn load() -> DaycalResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> DaycalResult<Self> {
        let config: DaycalConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("DAYCAL").try_parsing(true))
            .build()
            .map_err(|e| DaycalError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| DaycalError::Config(e.to_string()))?;

        if config.max_span_days < 0 {
            return Err(DaycalError::Config(format!(
                "max_span_days must not be negative, got {}",
                config.max_span_days
            )));
        }

        Ok(config)
    }

    /// Keys `set` accepts.
    pub const SETTABLE_KEYS: &'static [&'static str] = &[
        "data_dir",
        "cache_dir",
        "collection",
        "default_color",
        "max_span_days",
        "show_week_numbers",
    ];

    /// Change one setting from its text form. An empty `default_color` unsets it.
    pub fn set(&mut self, key: &str, value: &str) -> DaycalResult<()> {
        let value = value.trim();
        let invalid = |expected: &str| {
            DaycalError::Config(format!("Invalid value '{value}' for {key}: expected {expected}"))
        };

        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "cache_dir" => self.cache_dir = PathBuf::from(value),
            "collection" if !value.is_empty() => self.collection = value.to_string(),
            "collection" => return Err(invalid("a collection name")),
            "default_color" => {
                self.default_color = (!value.is_empty()).then(|| value.to_string());
            }
            "max_span_days" => {
                self.max_span_days = value
                    .parse::<i64>()
                    .ok()
                    .filter(|days| *days >= 0)
                    .ok_or_else(|| invalid("a number of days"))?;
            }
            "show_week_numbers" => {
                self.show_week_numbers = value.parse().map_err(|_| invalid("true or false"))?;
            }
            _ => {
                return Err(DaycalError::Config(format!(
                    "Unknown setting '{key}'. Available: {}",
                    Self::SETTABLE_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Save the current config to ~/.config/daycal/config.toml
    pub fn save(&self) -> DaycalResult<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> DaycalResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| DaycalError::Config(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DaycalError::Config(format!("Could not create config directory: {e}"))
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| DaycalError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> DaycalResult<()> {
        let contents = format!(
            "\
# daycal configuration

# Where events are stored:
# data_dir = \"{}\"

# Offline copy of your events and the signed-in session:
# cache_dir = \"{}\"

# Color for new events (defaults to {}):
# default_color = \"#34C759\"

# Show ISO week numbers in the month view:
# show_week_numbers = false
",
            DEFAULT_DATA_DIR,
            DEFAULT_CACHE_DIR,
            crate::event::DEFAULT_COLOR,
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DaycalError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| DaycalError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn data_path(&self) -> PathBuf {
        expand(&self.data_dir)
    }

    pub fn cache_path(&self) -> PathBuf {
        expand(&self.cache_dir)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_path().join(STORE_FILE)
    }

    pub fn session_path(&self) -> PathBuf {
        self.cache_path().join(SESSION_FILE)
    }

    /// Span limit for saved events, never above what the projector expands.
    pub fn effective_max_span_days(&self) -> i64 {
        self.max_span_days.min(MAX_SPAN_DAYS)
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
