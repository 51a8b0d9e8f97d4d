//! Config Command
//!
//! Usage:
//!   draftsmith config show [-g] [-f text|toml|json|yaml]
//!   draftsmith config path
//!   draftsmith config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::{ConfigFormat, ConfigLoader};
use crate::types::{DraftsmithError, Result};

pub fn show(global: bool, format: &str) -> Result<()> {
    let format: ConfigFormat = format.parse().map_err(DraftsmithError::Config)?;
    ConfigLoader::show_config(global, format)
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

pub fn init_global(force: bool) -> Result<()> {
    let dir = ConfigLoader::init_global(force)?;
    Output::new().success("Initialized global configuration");
    println!("  Directory: {}", dir.display());
    if let Some(config_path) = ConfigLoader::global_config_path() {
        println!("  Config:    {}", config_path.display());
    }
    Ok(())
}

pub fn init_project(force: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let dir = ConfigLoader::init_project_in(&root, force)?;
    Output::new().success("Initialized project configuration");
    println!("  Directory: {}", dir.display());
    println!(
        "  Config:    {}",
        ConfigLoader::project_config_path().display()
    );
    Ok(())
}
