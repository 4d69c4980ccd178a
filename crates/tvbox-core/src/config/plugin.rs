//! Plugin runtime configuration.

use serde::{Deserialize, Serialize};

/// Plugin runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Managed plugin directory holding installed bundles.
    #[serde(default = "default_plugin_directory")]
    pub directory: String,
    /// File name suffix identifying bundles.
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Directories searched for externally installed bundles.
    #[serde(default)]
    pub external_dirs: Vec<String>,
    /// Whether external bundles are discovered. `None` follows `host.debug`.
    #[serde(default)]
    pub discover_external: Option<bool>,
    /// Upper bound for a plugin's `on_init` hook, in seconds.
    #[serde(default = "default_init_timeout")]
    pub init_timeout_seconds: u64,
}

impl PluginConfig {
    /// Resolve external discovery against the host debug flag.
    pub fn external_discovery_enabled(&self, debug: bool) -> bool {
        self.discover_external.unwrap_or(debug)
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: default_plugin_directory(),
            suffix: default_suffix(),
            external_dirs: Vec::new(),
            discover_external: None,
            init_timeout_seconds: default_init_timeout(),
        }
    }
}

fn default_plugin_directory() -> String {
    "./data/plugins".to_string()
}

fn default_suffix() -> String {
    ".tbp".to_string()
}

fn default_init_timeout() -> u64 {
    10
}
