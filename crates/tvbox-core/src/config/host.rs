//! Host identity and data location.

use serde::{Deserialize, Serialize};

/// Settings describing the host application itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// The host's own package identity. External bundles must carry it as
    /// their host marker to be discovered.
    #[serde(default = "default_identity")]
    pub identity: String,
    /// Debug mode; also enables external plugin discovery by default.
    #[serde(default = "default_debug")]
    pub debug: bool,
    /// Root directory for host data (plugin key/value stores live below it).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Plugin identity launched at startup, if any.
    #[serde(default)]
    pub default_plugin: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            debug: default_debug(),
            data_dir: default_data_dir(),
            default_plugin: None,
        }
    }
}

fn default_identity() -> String {
    "com.tvbox.host".to_string()
}

fn default_debug() -> bool {
    cfg!(debug_assertions)
}

fn default_data_dir() -> String {
    "./data".to_string()
}
