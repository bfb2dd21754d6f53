// Application settings
// Loaded from $RATEBOOK_CONFIG or ~/.config/ratebook/config.toml

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use ratebook_recon::ReconPolicy;

/// Overrides the settings file location.
pub const CONFIG_ENV: &str = "RATEBOOK_CONFIG";

/// Overrides the database location (beats the settings file).
pub const DB_ENV: &str = "RATEBOOK_DB";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot access {}: {message}", path.display()),
            Self::Parse { path, message } => write!(f, "invalid settings in {}: {message}", path.display()),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite database file. `None` = platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Reconciliation policy (`[recon]` table)
    pub recon: ReconPolicy,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        if let Some(p) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(p);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ratebook")
            .join("config.toml")
    }

    /// Load settings from the default location, falling back to defaults.
    /// A missing file is normal; an unreadable or invalid one is logged.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            log::debug!("no settings file at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Load settings from an explicit path. Errors are returned, not masked.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Effective database path: `$RATEBOOK_DB`, then the settings file,
    /// then the platform data directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(p) = std::env::var_os(DB_ENV) {
            return PathBuf::from(p);
        }
        self.database.clone().unwrap_or_else(default_database_path)
    }

    /// Write a commented default settings file. Refuses to overwrite.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        let io_err = |e: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if path.exists() {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                message: "file already exists".into(),
            });
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, DEFAULT_CONFIG).map_err(io_err)
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ratebook")
        .join("ratebook.db")
}

const DEFAULT_CONFIG: &str = r#"# ratebook settings

# SQLite database file (default: platform data directory)
# database = "/var/lib/ratebook/ratebook.db"

[recon]
# What to do with uploaded rows whose Material/Unit is not in the stored dataset:
#   "drop"   - discard them (default)
#   "append" - add them to the end of the dataset
unmatched_incoming = "drop"

# How to render a change whose previous value was zero or missing:
#   "zero" - "0.00" (default)
#   "new"  - "new"
zero_baseline = "zero"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use ratebook_recon::{UnmatchedIncoming, ZeroBaseline};

    #[test]
    fn default_file_parses_to_defaults() {
        let settings: Settings = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn load_from_reads_policy_and_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
database = "/tmp/rb.db"

[recon]
unmatched_incoming = "append"
zero_baseline = "new"
"#,
        )
        .unwrap();
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.database, Some(PathBuf::from("/tmp/rb.db")));
        assert_eq!(settings.recon.unmatched_incoming, UnmatchedIncoming::Append);
        assert_eq!(settings.recon.zero_baseline, ZeroBaseline::New);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[recon]\nzero_baseline = \"new\"\n").unwrap();
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.database, None);
        assert_eq!(settings.recon.unmatched_incoming, UnmatchedIncoming::Drop);
    }

    #[test]
    fn invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[recon]\nunmatched_incoming = 3\n").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn write_default_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        Settings::write_default(&path).unwrap();
        assert!(Settings::load_from(&path).is_ok());
        assert!(Settings::write_default(&path).is_err());
    }
}
