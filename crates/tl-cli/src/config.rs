//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tl_store::StoreOptions;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the task files.
    pub data_dir: PathBuf,
    /// Keep `<task>.csv~` backups of rewritten files.
    pub backup: bool,
    /// Refresh the parse cache on read.
    pub cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: dirs_data_path().unwrap_or_else(|| PathBuf::from(".")),
            backup: false,
            cache: true,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TL_*)
        figment = figment.merge(Env::prefixed("TL_"));

        figment.extract()
    }

    /// Store options matching this configuration.
    pub const fn store_options(&self) -> StoreOptions {
        StoreOptions {
            write_cache: self.cache,
            backup: self.backup,
        }
    }
}

/// Returns the platform-specific config directory for tl.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tl"))
}

/// Returns the platform-specific data directory for tl.
///
/// On Linux: `~/.local/share/tl`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("tl"))
}
