//! User configuration stored as a JSON document (by default `~/.trashrc`).
//!
//! The home directory is always handed in by the caller; nothing here looks at
//! the process environment.

use crate::errors::{Result, TrashError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the configuration document inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".trashrc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub trash_dir: PathBuf,
    pub confirm_delete: bool,
    pub use_fancy_ui: bool,
    /// Items older than this many days are pruned; 0 disables.
    pub auto_empty_days: u32,
    /// Upper bound for the payload area in MiB; 0 disables.
    pub max_trash_size_mb: u64,
}

impl Config {
    /// Keys in display order.
    pub const KEYS: [&'static str; 5] = [
        "trash_dir",
        "confirm_delete",
        "use_fancy_ui",
        "auto_empty_days",
        "max_trash_size_mb",
    ];

    pub fn for_home(home: &Path) -> Self {
        Self {
            trash_dir: home.join(".local").join("share").join("Trash"),
            confirm_delete: true,
            use_fancy_ui: false,
            auto_empty_days: 30,
            max_trash_size_mb: 1024,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "trash_dir" => self.trash_dir.display().to_string(),
            "confirm_delete" => self.confirm_delete.to_string(),
            "use_fancy_ui" => self.use_fancy_ui.to_string(),
            "auto_empty_days" => self.auto_empty_days.to_string(),
            "max_trash_size_mb" => self.max_trash_size_mb.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Parses `raw` according to the type of `key` and stores it.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        match key {
            "trash_dir" => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(TrashError::invalid_config("trash_dir must not be empty"));
                }
                self.trash_dir = PathBuf::from(raw);
            }
            "confirm_delete" => self.confirm_delete = parse_bool(key, raw)?,
            "use_fancy_ui" => self.use_fancy_ui = parse_bool(key, raw)?,
            "auto_empty_days" => self.auto_empty_days = parse_number(key, raw)?,
            "max_trash_size_mb" => self.max_trash_size_mb = parse_number(key, raw)?,
            _ => return Err(TrashError::invalid_config(format!("unknown config key: {key}"))),
        }
        Ok(())
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        other => Err(TrashError::invalid_config(format!(
            "{key} expects true/false, got {other:?}"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        TrashError::invalid_config(format!("{key} expects a non-negative integer, got {raw:?}"))
    })
}

/// Location of the configuration document plus the home it derives defaults from.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    home: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            home: home.into(),
        }
    }

    /// `<home>/.trashrc`
    pub fn in_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self::new(home.join(CONFIG_FILE_NAME), home)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn defaults(&self) -> Config {
        Config::for_home(&self.home)
    }

    /// Reads the document, writing defaults first when it does not exist yet.
    /// Keys missing from the document fall back to their defaults.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no config file, writing defaults");
            return self.reset();
        }
        let raw = fs::read_to_string(&self.path).map_err(|err| TrashError::storage(&self.path, err))?;
        self.merge_with_defaults(&raw)
            .map_err(|err| TrashError::serialization(&self.path, err))
    }

    fn merge_with_defaults(&self, raw: &str) -> serde_json::Result<Config> {
        let mut merged = serde_json::to_value(self.defaults())?;
        let overrides: serde_json::Map<String, Value> = serde_json::from_str(raw)?;
        if let Value::Object(base) = &mut merged {
            base.extend(overrides);
        }
        serde_json::from_value(merged)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| TrashError::storage(parent, err))?;
        }
        let raw = serde_json::to_string_pretty(config)
            .map_err(|err| TrashError::serialization(&self.path, err))?;
        fs::write(&self.path, raw).map_err(|err| TrashError::storage(&self.path, err))
    }

    /// Overwrites the document with defaults and returns them.
    pub fn reset(&self) -> Result<Config> {
        let defaults = self.defaults();
        self.save(&defaults)?;
        info!(path = %self.path.display(), "config reset to defaults");
        Ok(defaults)
    }
}
