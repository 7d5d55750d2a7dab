//! Store configuration and default location resolution.
//!
//! The default database lives at `<data dir>/<app name>/Database.sqlite`.
//! The data dir is read from `PERSISTKIT_DATA_DIR` or else taken from the
//! platform's per-user application data directory. The app name is read
//! from `PERSISTKIT_APP_NAME` or else derived from the running executable.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::error::{Result, StoreError};

/// File name of the default database.
pub const DEFAULT_FILE_NAME: &str = "Database.sqlite";

/// Application directory name used when none can be derived.
pub const FALLBACK_APP_NAME: &str = "persistkit";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid number of milliseconds: {value}")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{var} is not a valid boolean: {value}")]
    InvalidFlag { var: &'static str, value: String },

    #[error("an in-memory store cannot be opened read-only")]
    ReadOnlyInMemory,

    #[error("a read-only store cannot be recreated on open")]
    ReadOnlyRecreate,

    #[error("no application data directory could be determined")]
    NoDataDir,
}

/// Where a store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Location {
    /// The platform default database file.
    #[default]
    Default,
    /// An explicit database file.
    File(PathBuf),
    /// An anonymous store that lives as long as its handle.
    InMemory,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Default => f.write_str("<default>"),
            Location::File(path) => write!(f, "{}", path.display()),
            Location::InMemory => f.write_str(":memory:"),
        }
    }
}

/// Configuration for opening a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Where the database lives.
    pub location: Location,
    /// How long a write waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Open without write access.
    pub read_only: bool,
    /// Delete any existing database file before opening.
    pub recreate_on_open: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: Location::Default,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            read_only: false,
            recreate_on_open: false,
        }
    }
}

impl StoreConfig {
    /// Configuration for an explicit database file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            ..Self::default()
        }
    }

    /// Configuration for an anonymous in-memory store.
    pub fn in_memory() -> Self {
        Self {
            location: Location::InMemory,
            ..Self::default()
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn recreate_on_open(mut self, recreate: bool) -> Self {
        self.recreate_on_open = recreate;
        self
    }

    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - PERSISTKIT_DATABASE: database file, or `:memory:` (default: platform location)
    /// - PERSISTKIT_BUSY_TIMEOUT_MS: lock wait in milliseconds (default: 5000)
    /// - PERSISTKIT_READ_ONLY: open without write access (default: false)
    /// - PERSISTKIT_RECREATE_ON_OPEN: start from an empty database (default: false)
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`StoreConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(db) = lookup("PERSISTKIT_DATABASE").filter(|v| !v.is_empty()) {
            config.location = if db == ":memory:" {
                Location::InMemory
            } else {
                Location::File(PathBuf::from(db))
            };
        }

        if let Some(ms) = lookup("PERSISTKIT_BUSY_TIMEOUT_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| ConfigError::InvalidTimeout {
                var: "PERSISTKIT_BUSY_TIMEOUT_MS",
                value: ms.clone(),
            })?;
            config.busy_timeout = Duration::from_millis(ms);
        }

        if let Some(v) = lookup("PERSISTKIT_READ_ONLY") {
            config.read_only = parse_flag("PERSISTKIT_READ_ONLY", &v)?;
        }

        if let Some(v) = lookup("PERSISTKIT_RECREATE_ON_OPEN") {
            config.recreate_on_open = parse_flag("PERSISTKIT_RECREATE_ON_OPEN", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot be opened.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.read_only && self.location == Location::InMemory {
            return Err(ConfigError::ReadOnlyInMemory);
        }
        if self.read_only && self.recreate_on_open {
            return Err(ConfigError::ReadOnlyRecreate);
        }
        Ok(())
    }

    /// Resolve the database file, or `None` for an in-memory store.
    ///
    /// For [`Location::Default`] the application directory is created if
    /// it does not exist yet.
    pub fn resolve_path(&self) -> Result<Option<PathBuf>> {
        match &self.location {
            Location::Default => default_database_file().map(Some),
            Location::File(path) => Ok(Some(path.clone())),
            Location::InMemory => Ok(None),
        }
    }
}

fn parse_flag(var: &'static str, value: &str) -> std::result::Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}

/// The default database file, creating its directory if needed.
pub fn default_database_file() -> Result<PathBuf> {
    let dir = app_data_dir(|name| std::env::var_os(name).map(PathBuf::from))
        .map_err(|e| StoreError::unavailable(Location::Default, e))?;
    std::fs::create_dir_all(&dir).map_err(|e| StoreError::unavailable(dir.display(), e))?;
    Ok(dir.join(DEFAULT_FILE_NAME))
}

/// The per-application data directory, without creating it.
pub fn app_data_dir<F>(lookup: F) -> std::result::Result<PathBuf, ConfigError>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    let base = match lookup("PERSISTKIT_DATA_DIR") {
        Some(dir) => dir,
        None => platform_data_dir(&lookup).ok_or(ConfigError::NoDataDir)?,
    };
    let app_name = lookup("PERSISTKIT_APP_NAME")
        .and_then(|name| name.to_str().map(str::to_string))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(app_name_from_exe);
    Ok(base.join(app_name))
}

#[cfg(target_os = "macos")]
fn platform_data_dir<F: Fn(&str) -> Option<PathBuf>>(lookup: &F) -> Option<PathBuf> {
    lookup("HOME").map(|home| home.join("Library").join("Application Support"))
}

#[cfg(windows)]
fn platform_data_dir<F: Fn(&str) -> Option<PathBuf>>(lookup: &F) -> Option<PathBuf> {
    lookup("APPDATA")
}

#[cfg(not(any(target_os = "macos", windows)))]
fn platform_data_dir<F: Fn(&str) -> Option<PathBuf>>(lookup: &F) -> Option<PathBuf> {
    lookup("XDG_DATA_HOME")
        .filter(|dir| dir.is_absolute())
        .or_else(|| lookup("HOME").map(|home| home.join(".local").join("share")))
}

fn app_name_from_exe() -> String {
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::file_stem)
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_APP_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_lookup() {
        let env = vars(&[
            ("PERSISTKIT_DATABASE", "/tmp/app.sqlite"),
            ("PERSISTKIT_BUSY_TIMEOUT_MS", "250"),
            ("PERSISTKIT_RECREATE_ON_OPEN", "yes"),
        ]);
        let config = StoreConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.location, Location::File("/tmp/app.sqlite".into()));
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(config.recreate_on_open);
        assert!(!config.read_only);
    }

    #[test]
    fn test_memory_location() {
        let env = vars(&[("PERSISTKIT_DATABASE", ":memory:")]);
        let config = StoreConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.location, Location::InMemory);
        assert_eq!(config.resolve_path().unwrap(), None);
    }

    #[test]
    fn test_invalid_values() {
        let env = vars(&[("PERSISTKIT_BUSY_TIMEOUT_MS", "soon")]);
        assert!(matches!(
            StoreConfig::from_lookup(|k| env.get(k).cloned()),
            Err(ConfigError::InvalidTimeout { .. })
        ));

        let env = vars(&[("PERSISTKIT_READ_ONLY", "maybe")]);
        assert!(matches!(
            StoreConfig::from_lookup(|k| env.get(k).cloned()),
            Err(ConfigError::InvalidFlag { .. })
        ));

        let env = vars(&[("PERSISTKIT_DATABASE", ":memory:"), ("PERSISTKIT_READ_ONLY", "1")]);
        assert_eq!(
            StoreConfig::from_lookup(|k| env.get(k).cloned()),
            Err(ConfigError::ReadOnlyInMemory)
        );
    }

    #[test]
    fn test_validate_read_only_recreate() {
        let config = StoreConfig::at("/tmp/x.sqlite").read_only(true).recreate_on_open(true);
        assert_eq!(config.validate(), Err(ConfigError::ReadOnlyRecreate));
    }

    #[test]
    fn test_app_data_dir_override() {
        let dir = app_data_dir(|k| match k {
            "PERSISTKIT_DATA_DIR" => Some(PathBuf::from("/data")),
            "PERSISTKIT_APP_NAME" => Some(PathBuf::from("Notes")),
            _ => None,
        })
        .unwrap();
        assert_eq!(dir, PathBuf::from("/data/Notes"));
    }

    #[cfg(not(any(target_os = "macos", windows)))]
    #[test]
    fn test_app_data_dir_platform() {
        let dir = app_data_dir(|k| match k {
            "HOME" => Some(PathBuf::from("/home/me")),
            "PERSISTKIT_APP_NAME" => Some(PathBuf::from("Notes")),
            _ => None,
        })
        .unwrap();
        assert_eq!(dir, PathBuf::from("/home/me/.local/share/Notes"));

        let dir = app_data_dir(|k| match k {
            "XDG_DATA_HOME" => Some(PathBuf::from("/xdg")),
            "PERSISTKIT_APP_NAME" => Some(PathBuf::from("Notes")),
            _ => None,
        })
        .unwrap();
        assert_eq!(dir, PathBuf::from("/xdg/Notes"));
    }

    #[test]
    fn test_no_data_dir() {
        assert_eq!(app_data_dir(|_| None), Err(ConfigError::NoDataDir));
    }
}
