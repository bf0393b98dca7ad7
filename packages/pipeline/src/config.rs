use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Longest allowed short name for a registered provider.
pub const MAX_PROVIDER_NAME_LEN: usize = 15;

/// Provider argument that expands to every registered provider.
pub const ALL_PROVIDERS: &str = "all";

/// Environment variable overriding the registry database path.
pub const DATABASE_ENV: &str = "OAIHARVEST_DB";

/// Application directory below the user's home.
pub const APP_DIR_NAME: &str = ".oai-harvest";

const DATABASE_FILE_NAME: &str = "registry.db";

/// Log file written by `oai-harvest`, next to the registry database.
pub const HARVEST_LOG_FILE: &str = "harvest.log";

/// Log file written by `oai-reg`, next to the registry database.
pub const REGISTRY_LOG_FILE: &str = "registry.log";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
}

impl PipelineConfig {
    /// Configuration for the database at `~/.oai-harvest/registry.db`, or
    /// at `$OAIHARVEST_DB` when set.
    pub fn from_env() -> Result<Self> {
        let database_path = match std::env::var_os(DATABASE_ENV) {
            Some(path) if !path.is_empty() => expand_tilde(Path::new(&path)),
            _ => default_database_path()?,
        };
        Ok(Self::new(database_path))
    }

    /// Configuration for an explicit database path, falling back to
    /// [`PipelineConfig::from_env`].
    pub fn resolve(database: Option<&Path>) -> Result<Self> {
        match database {
            Some(path) => Ok(Self::new(expand_tilde(path))),
            None => Self::from_env(),
        }
    }

    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            max_connections: 5,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Directory holding the database, where log files are written too.
    pub fn log_directory(&self) -> PathBuf {
        match self.database_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| PipelineError::Config("cannot determine home directory".into()))
}

/// `~/.oai-harvest/registry.db`
pub fn default_database_path() -> Result<PathBuf> {
    Ok(home_dir()?.join(APP_DIR_NAME).join(DATABASE_FILE_NAME))
}

/// Expand a leading `~` to the user's home directory.
///
/// Paths without one, or when no home directory is known, are returned
/// unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match home_dir() {
        Ok(home) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}
