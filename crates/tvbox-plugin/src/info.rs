//! Plugin metadata records and scan results.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::HOST_API_VERSION;

/// Icon bytes shipped inside a bundle. Decoding is left to the UI layer.
#[derive(Clone, PartialEq, Eq)]
pub struct PluginIcon {
    /// Archive entry the icon was read from.
    pub entry: String,
    /// Raw image data.
    pub data: Bytes,
}

impl fmt::Debug for PluginIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginIcon")
            .field("entry", &self.entry)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Metadata about a discovered plugin bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin API version the bundle was built against.
    pub api_version: u32,
    /// Key into the plugin's entry point table.
    pub entry_point: String,
    /// Unique plugin identity.
    pub package_name: String,
    /// Human-readable plugin name.
    pub display_name: String,
    /// Version string shown to users.
    pub version_name: String,
    /// Monotonic build number.
    pub version_code: i64,
    /// Icon, if the bundle ships one.
    #[serde(skip)]
    pub icon: Option<PluginIcon>,
    /// Absolute bundle location.
    pub source_path: PathBuf,
    /// Whether the bundle was discovered outside the managed directory.
    pub is_external: bool,
}

impl PluginInfo {
    /// Whether two records describe the same build at the same location.
    ///
    /// Pooled instances survive a rescan only when this holds.
    pub fn same_build(&self, other: &PluginInfo) -> bool {
        self.package_name == other.package_name
            && self.source_path == other.source_path
            && self.version_code == other.version_code
            && self.api_version == other.api_version
            && self.entry_point == other.entry_point
    }

    /// Returns the API mismatch against this host, if any.
    pub fn api_mismatch(&self) -> Option<ApiMismatch> {
        (self.api_version != HOST_API_VERSION).then(|| ApiMismatch {
            package_name: self.package_name.clone(),
            plugin_api_version: self.api_version,
            host_api_version: HOST_API_VERSION,
        })
    }
}

/// A plugin built against a different API version than the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMismatch {
    /// Plugin identity.
    pub package_name: String,
    /// API version declared by the plugin.
    pub plugin_api_version: u32,
    /// API version implemented by the host.
    pub host_api_version: u32,
}

/// Why a directory entry was not accepted as a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Directory, socket or other non-regular entry.
    NotAFile,
    /// File name does not carry the bundle suffix.
    WrongSuffix,
    /// The file could not be opened or stat'ed.
    Unreadable(String),
    /// The file is a bundle candidate but its metadata is invalid.
    InvalidMetadata(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAFile => write!(f, "not a regular file"),
            Self::WrongSuffix => write!(f, "not a plugin bundle"),
            Self::Unreadable(e) => write!(f, "unreadable: {e}"),
            Self::InvalidMetadata(e) => write!(f, "invalid metadata: {e}"),
        }
    }
}

/// A filesystem entry rejected during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEntry {
    /// Entry location.
    pub path: PathBuf,
    /// Rejection cause.
    pub reason: RejectReason,
}

/// Result of a plugin directory scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadedPlugins {
    /// Discovered plugins, ordered by identity.
    pub plugins: Vec<PluginInfo>,
    /// Entries that could not be used, ordered by path.
    pub invalid_files: Vec<RejectedEntry>,
    /// Plugins built against a different API version.
    pub api_mismatches: Vec<ApiMismatch>,
}

impl LoadedPlugins {
    /// Looks up a plugin by identity.
    pub fn get(&self, package_name: &str) -> Option<&PluginInfo> {
        self.plugins.iter().find(|p| p.package_name == package_name)
    }
}
