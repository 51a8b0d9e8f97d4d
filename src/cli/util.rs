//! CLI Common Utilities
//!
//! Shared initialization and context management for command handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, ConfigLoader};
use crate::storage::{Database, PoolConfig, SharedDatabase};
use crate::types::{DraftsmithError, Result};

/// Project directory name
pub const DRAFTSMITH_DIR: &str = ".draftsmith";

/// Command execution context
#[derive(Clone)]
pub struct CommandContext {
    /// Project directory (.draftsmith)
    pub project_dir: PathBuf,
    pub db: SharedDatabase,
    pub config: Config,
    pub project_root: PathBuf,
}

impl CommandContext {
    /// Validate initialization, load config and open the database
    pub fn load() -> Result<Self> {
        let project_dir = require_initialized()?;
        let config = ConfigLoader::load()?;
        let db = open_database(&project_dir, &config)?;
        let project_root = std::env::current_dir()?;

        Ok(Self {
            project_dir,
            db: Arc::new(db),
            config,
            project_root,
        })
    }

    /// Transcript directory, resolved against the project root
    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.config.trace.log_dir)
    }

    pub fn destination_root(&self) -> PathBuf {
        self.resolve(&self.config.persist.destination_root)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

/// `.draftsmith/` if it exists, else `NotInitialized`
pub fn require_initialized() -> Result<PathBuf> {
    let dir = Path::new(DRAFTSMITH_DIR);
    if !dir.exists() {
        return Err(DraftsmithError::NotInitialized);
    }
    Ok(dir.to_path_buf())
}

pub fn is_initialized() -> bool {
    Path::new(DRAFTSMITH_DIR).exists()
}

/// Open and migrate the project database
pub fn open_database(project_dir: &Path, config: &Config) -> Result<Database> {
    let db_path = project_dir.join(&config.storage.database);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::open_with_config(
        &db_path,
        PoolConfig::with_size(config.storage.pool_size),
    )?;
    db.initialize()?;
    Ok(db)
}

// Tests that change the working directory race under parallel test threads,
// so `open_database` is covered with explicit paths only.
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_database_creates_file() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.database = PathBuf::from("data/draftsmith.db");

        let db = open_database(dir.path(), &config).unwrap();
        assert!(dir.path().join("data/draftsmith.db").exists());
        assert_eq!(db.schema_version().unwrap(), crate::storage::database::SCHEMA_VERSION);
    }
}
