//! Init Command
//!
//! Initialize Draftsmith in the current directory.

use crate::cli::ui::Output;
use crate::cli::util::{DRAFTSMITH_DIR, open_database};
use crate::config::{Config, ConfigLoader};
use crate::types::{DraftsmithError, Result};

pub fn run(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;

    if root.join(DRAFTSMITH_DIR).exists() && !force {
        return Err(DraftsmithError::Config(
            "Already initialized. Use --force to overwrite.".to_string(),
        ));
    }

    let project_dir = ConfigLoader::init_project_in(&root, force)?;

    // Global config is optional; never overwrite it from here
    if let Err(e) = ConfigLoader::init_global(false) {
        tracing::debug!("Global config init skipped: {}", e);
    }

    let config = ConfigLoader::load_for(&root).unwrap_or_else(|e| {
        tracing::warn!("Using default config for database setup: {}", e);
        Config::default()
    });
    open_database(&project_dir, &config)?;

    let out = Output::new();
    out.success(&format!("Initialized Draftsmith in {}/", DRAFTSMITH_DIR));
    println!("  Namespace: {}", config.pipeline.namespace_root);
    println!();
    println!("Next steps:");
    println!("  1. Run 'draftsmith ingest' to index the existing codebase (optional)");
    println!("  2. Run 'draftsmith generate \"<feature request>\"'");

    Ok(())
}
