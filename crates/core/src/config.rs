//! Application configuration.
//!
//! Values come from built-in defaults, then `~/.config/bookshelf/config.toml`,
//! then `BOOKSHELF_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::storage::DEFAULT_DATA_FILE;

/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "bookshelf";
/// Name of the config file.
pub const CONFIG_FILE: &str = "config.toml";
/// Prefix for environment overrides, e.g. `BOOKSHELF_DATA_FILE`.
pub const ENV_PREFIX: &str = "BOOKSHELF";

const DEFAULT_CONFIG: &str = r#"# Bookshelf configuration

# Backing file for the collection. Relative paths resolve against the
# working directory.
data_file = "library_data.json"

# Write the collection back to data_file when leaving the program.
save_on_exit = true

# Directory receiving bookshelf.log.
log_dir = "logs"
"#;

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Location of the JSON file holding the collection.
    pub data_file: PathBuf,
    /// Save the collection automatically on exit.
    pub save_on_exit: bool,
    /// Directory for log output.
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            save_on_exit: true,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    /// Load using the default config file location.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load using an explicit config file. A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_layered(path.as_ref(), env_source())
    }

    fn load_layered(path: &Path, env: Environment) -> Result<Self> {
        let defaults = AppConfig::default();
        let settings = Config::builder()
            .set_default("data_file", defaults.data_file.to_string_lossy().into_owned())?
            .set_default("save_on_exit", defaults.save_on_exit)?
            .set_default("log_dir", defaults.log_dir.to_string_lossy().into_owned())?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("invalid config in {}", path.display()))
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

/// Default location of the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write the commented default config if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG).with_context(|| format!("failed to write {}", path.display()))
}
