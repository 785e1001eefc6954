//! Configuration file resolution and loading
//!
//! Each service reads a single bootstrap TOML file. The file is located in
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `<MODULE>_CONFIG` (e.g. `WKMP_SP_CONFIG`)
//! 3. User config directory: `<config_dir>/wkmp/<module>.toml`
//! 4. System config (Linux only): `/etc/wkmp/<module>.toml`
//!
//! A missing file is not an error: callers fall back to built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Logging configuration shared by service binaries
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locates the configuration file for one module
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    module_name: String,
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver for `module_name` (e.g. "wkmp-sp")
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_path: None,
        }
    }

    /// Use an explicit path from the command line, if one was given
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Name of the environment variable consulted by [`resolve`](Self::resolve)
    pub fn env_var_name(&self) -> String {
        format!("{}_CONFIG", self.module_name.to_uppercase().replace('-', "_"))
    }

    /// Resolve the config file path, or `None` when no file exists
    ///
    /// Explicit paths (CLI or environment) are returned even when the file
    /// does not exist so that loading reports the mistake.
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(self.env_var_name()) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        let file_name = format!("{}.toml", self.module_name);

        if let Some(user) = dirs::config_dir().map(|d| d.join("wkmp").join(&file_name)) {
            if user.exists() {
                return Some(user);
            }
        }

        if cfg!(target_os = "linux") {
            let system = PathBuf::from("/etc/wkmp").join(&file_name);
            if system.exists() {
                return Some(system);
            }
        }

        None
    }

    /// Load the resolved config, or defaults when no file is found
    pub fn load_or_default<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.resolve() {
            Some(path) => {
                info!("Loading {} config from {}", self.module_name, path.display());
                load_toml(&path)
            }
            None => {
                warn!(
                    "No config file found for {}, using built-in defaults",
                    self.module_name
                );
                Ok(T::default())
            }
        }
    }
}

/// Read and parse a TOML file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    debug!("Read {} bytes of config from {}", content.len(), path.display());

    toml::from_str(&content).map_err(|source| Error::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}
