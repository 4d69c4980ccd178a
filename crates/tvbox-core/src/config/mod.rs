//! Application configuration schemas.
//!
//! All configuration structs are deserialized from a TOML file via the
//! `config` crate, overlaid with `TVBOX__`-prefixed environment variables.
//! Every section has defaults so an absent file yields a usable config.

pub mod host;
pub mod logging;
pub mod plugin;
pub mod screen;

use std::path::Path;

use serde::{Deserialize, Serialize};

use self::host::HostConfig;
use self::logging::LoggingConfig;
use self::plugin::PluginConfig;
use self::screen::ScreenConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host identity and data location.
    #[serde(default)]
    pub host: HostConfig,
    /// Plugin runtime settings.
    #[serde(default)]
    pub plugins: PluginConfig,
    /// Screen geometry handed to plugins.
    #[serde(default)]
    pub screen: ScreenConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file is not an error; environment variables such as
    /// `TVBOX__PLUGINS__DIRECTORY` override file values.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from(Path::new(path)).required(false))
            .add_source(
                config::Environment::with_prefix("TVBOX")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = AppConfig::load(path.to_str().unwrap()).unwrap();

        assert_eq!(config.plugins.suffix, ".tbp");
        assert_eq!(config.plugins.init_timeout_seconds, 10);
        assert_eq!(config.screen.width, 1920);
        assert_eq!(config.host.identity, "com.tvbox.host");
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tvbox.toml");
        std::fs::write(
            &path,
            r#"
[host]
identity = "org.example.box"
debug = false

[plugins]
directory = "/srv/plugins"
external_dirs = ["/opt/a", "/opt/b"]
discover_external = true

[screen]
width = 1280
height = 720
"#,
        )
        .unwrap();

        let config = AppConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.host.identity, "org.example.box");
        assert_eq!(config.plugins.directory, "/srv/plugins");
        assert_eq!(config.plugins.external_dirs.len(), 2);
        assert!(config.plugins.external_discovery_enabled(false));
        assert_eq!(config.screen.height, 720);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_external_discovery_follows_debug() {
        let plugins = PluginConfig::default();
        assert!(plugins.external_discovery_enabled(true));
        assert!(!plugins.external_discovery_enabled(false));
    }
}
