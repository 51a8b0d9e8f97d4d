//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/draftsmith/config.toml)
//! 3. Project config (.draftsmith/config.toml)
//! 4. Environment variables (DRAFTSMITH_* prefix, `__` between levels)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{DraftsmithError, Result};

const PROJECT_DIR: &str = ".draftsmith";
const CONFIG_FILE: &str = "config.toml";

/// Output format for `config show`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl std::str::FromStr for ConfigFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "toml" | "text" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(format!(
                "Unknown format '{}'. Valid values: text, toml, json, yaml",
                s
            )),
        }
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_for(Path::new("."))
    }

    /// Load configuration for the project rooted at `project_root`
    pub fn load_for(project_root: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path_in(project_root);
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // DRAFTSMITH_PIPELINE__MAX_ATTEMPTS -> pipeline.max_attempts
        figment = figment.merge(Env::prefixed("DRAFTSMITH_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| DraftsmithError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| DraftsmithError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Global config directory (~/.config/draftsmith/ on Linux)
    pub fn global_dir() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("draftsmith"))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn project_dir() -> PathBuf {
        PathBuf::from(PROJECT_DIR)
    }

    pub fn project_dir_in(root: &Path) -> PathBuf {
        root.join(PROJECT_DIR)
    }

    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join(CONFIG_FILE)
    }

    pub fn project_config_path_in(root: &Path) -> PathBuf {
        Self::project_dir_in(root).join(CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render a configuration in the requested format
    pub fn render(config: &Config, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Json => Ok(serde_json::to_string_pretty(config)?),
            ConfigFormat::Yaml => {
                serde_yaml::to_string(config).map_err(|e| DraftsmithError::Config(e.to_string()))
            }
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| DraftsmithError::Config(e.to_string()))
            }
        }
    }

    /// Show the effective configuration, or the global file only
    pub fn show_config(global_only: bool, format: ConfigFormat) -> Result<()> {
        let config = if global_only {
            match Self::global_config_path() {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => {
                    println!("No global config file. Run: draftsmith config init --global");
                    return Ok(());
                }
            }
        } else {
            Self::load()?
        };

        println!("{}", Self::render(&config, format)?);
        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            DraftsmithError::Config("Cannot determine global config directory".to_string())
        })?;

        fs::create_dir_all(&global_dir)?;

        let config_path = global_dir.join(CONFIG_FILE);
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_global_config())?;
            info!("Created global config: {}", config_path.display());
        } else {
            info!("Global config exists: {}", config_path.display());
        }

        Ok(global_dir)
    }

    /// Create `.draftsmith/` with a default config under `root`
    pub fn init_project_in(root: &Path, force: bool) -> Result<PathBuf> {
        let project_dir = Self::project_dir_in(root);

        fs::create_dir_all(&project_dir)?;
        fs::create_dir_all(project_dir.join("logs"))?;

        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_project_config())?;
            info!("Created project config: {}", config_path.display());
        }

        Ok(project_dir)
    }

    pub fn is_project_initialized() -> bool {
        Self::project_dir().exists()
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn default_global_config() -> String {
        r#"# Draftsmith Global Configuration
# User-wide defaults. Project settings in .draftsmith/config.toml override these.

version = "1.0"

[llm]
provider = "ollama"
model = "codellama"
timeout_secs = 300
"#
        .to_string()
    }

    fn default_project_config() -> String {
        r#"# Draftsmith Project Configuration
# Project-specific settings that override global defaults.

version = "1.0"

[pipeline]
namespace_root = "com.example.userproductapp"
max_attempts = 5
# Ordered artifacts to generate. Leave empty to derive them from the plan.
targets = []

[trace]
enabled = false
log_dir = ".draftsmith/logs"

[persist]
destination_root = "."
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_project_creates_loadable_config() {
        let temp_dir = TempDir::new().unwrap();

        let dir = ConfigLoader::init_project_in(temp_dir.path(), false).unwrap();
        assert!(dir.join("config.toml").exists());
        assert!(dir.join("logs").exists());

        let config = ConfigLoader::load_from_file(&dir.join("config.toml")).unwrap();
        assert_eq!(config.pipeline.max_attempts, 5);
        assert_eq!(config.trace.log_dir, PathBuf::from(".draftsmith/logs"));
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let dir = ConfigLoader::project_dir_in(temp_dir.path());
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            "[pipeline]\nnamespace_root = \"org.acme.shop\"\nmax_attempts = 2\n",
        )
        .unwrap();

        let config = ConfigLoader::load_for(temp_dir.path()).unwrap();
        assert_eq!(config.pipeline.namespace_root, "org.acme.shop");
        assert_eq!(config.pipeline.max_attempts, 2);
        assert_eq!(config.llm.provider, "ollama");
    }

    #[test]
    fn test_invalid_project_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[pipeline]\nmax_attempts = 0\n").unwrap();

        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_render_formats() {
        let config = Config::default();
        let toml = ConfigLoader::render(&config, ConfigFormat::Toml).unwrap();
        assert!(toml.contains("namespace_root"));
        let json = ConfigLoader::render(&config, ConfigFormat::Json).unwrap();
        assert!(json.contains("\"max_attempts\": 5"));
        let yaml = ConfigLoader::render(&config, ConfigFormat::Yaml).unwrap();
        assert!(yaml.contains("max_attempts: 5"));
    }

    #[test]
    fn test_config_format_parse() {
        assert_eq!("text".parse::<ConfigFormat>().unwrap(), ConfigFormat::Toml);
        assert_eq!("YAML".parse::<ConfigFormat>().unwrap(), ConfigFormat::Yaml);
        assert!("xml".parse::<ConfigFormat>().is_err());
    }
}
