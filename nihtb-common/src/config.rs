//! Configuration file resolution and loading
//!
//! Configuration is optional. The file is located with this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `NIHTB_CONFIG`
//! 3. `nihtb.toml` in the working directory
//! 4. `<user config dir>/nihtb/config.toml`
//!
//! When none of these exist the caller falls back to compiled defaults.
//! A missing file never terminates a run; a malformed one does.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "NIHTB_CONFIG";

/// Configuration file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "nihtb.toml";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
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

/// Where a resolved configuration file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    WorkingDirectory,
    UserConfigDir,
}

/// Configuration file resolver
///
/// Holds the application directory name used under the platform config dir.
pub struct ConfigFileResolver {
    app_name: String,
}

impl ConfigFileResolver {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
        }
    }

    /// Locate the configuration file, if any
    ///
    /// An explicit command-line path must exist. An environment path that does
    /// not exist is reported and skipped.
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Result<Option<(PathBuf, ConfigSource)>> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            if !path.exists() {
                return Err(Error::NotFound(path.to_path_buf()));
            }
            return Ok(Some((path.to_path_buf(), ConfigSource::CommandLine)));
        }

        // Priority 2: Environment variable
        if let Ok(value) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(value);
            if path.exists() {
                return Ok(Some((path, ConfigSource::Environment)));
            }
            warn!(
                "{} points to {}, which does not exist; ignoring",
                CONFIG_ENV_VAR,
                path.display()
            );
        }

        // Priority 3: Working directory
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(Some((local, ConfigSource::WorkingDirectory)));
        }

        // Priority 4: Platform config directory
        if let Some(path) = self.user_config_path() {
            if path.exists() {
                return Ok(Some((path, ConfigSource::UserConfigDir)));
            }
        }

        Ok(None)
    }

    /// `<config dir>/<app>/config.toml` for the current platform
    pub fn user_config_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(&self.app_name).join("config.toml"))
    }
}

/// Parse a TOML configuration file
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve and load configuration, falling back to `T::default()`
///
/// Returns the loaded value and the path it was read from.
pub fn load_config<T>(resolver: &ConfigFileResolver, cli_arg: Option<&Path>) -> Result<(T, Option<PathBuf>)>
where
    T: DeserializeOwned + Default,
{
    match resolver.resolve(cli_arg)? {
        Some((path, source)) => {
            let config = load_toml_file(&path)?;
            info!("Loaded configuration from {} ({:?})", path.display(), source);
            Ok((config, Some(path)))
        }
        None => {
            info!("No configuration file found, using built-in defaults");
            Ok((T::default(), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Sample {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_logging_config_default_level() {
        assert_eq!(LoggingConfig::default().level, "info");
    }

    #[test]
    fn test_missing_logging_section_uses_default() {
        let sample: Sample = toml::from_str("name = \"x\"").unwrap();
        assert_eq!(sample.name.as_deref(), Some("x"));
        assert_eq!(sample.logging.level, "info");
    }

    #[test]
    fn test_logging_level_override() {
        let sample: Sample = toml::from_str("[logging]\nlevel = \"debug\"").unwrap();
        assert_eq!(sample.logging.level, "debug");
    }

    #[test]
    fn test_cli_path_must_exist() {
        let resolver = ConfigFileResolver::new("nihtb");
        let result = resolver.resolve(Some(Path::new("/definitely/not/here/nihtb.toml")));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_user_config_path_ends_with_app_dir() {
        let resolver = ConfigFileResolver::new("nihtb");
        if let Some(path) = resolver.user_config_path() {
            assert!(path.ends_with("nihtb/config.toml"));
        }
    }
}
