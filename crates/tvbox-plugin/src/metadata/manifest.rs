//! `manifest.json` schema carried by every bundle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Meta-data key holding the plugin API version (integer or numeric string).
pub const META_API_VERSION: &str = "tvbox.plugin.api_version";

/// Meta-data key holding the entry point name.
pub const META_ENTRY_POINT: &str = "tvbox.plugin.entry_point";

/// Meta-data key naming the host an externally installed bundle targets.
pub const META_HOST_MARKER: &str = "tvbox.plugin.host";

/// Bundle manifest as stored in the archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    /// Plugin identity.
    #[serde(default)]
    pub package: Option<String>,
    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Version string shown to users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    /// 64-bit version code, preferred when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_version_code: Option<i64>,
    /// Legacy 32-bit version code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_code: Option<i32>,
    /// Archive entry holding the icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Free-form meta-data; carries the ABI keys.
    #[serde(default)]
    pub meta_data: BTreeMap<String, Value>,
}

impl BundleManifest {
    /// Resolved version code: the 64-bit field wins over the legacy one.
    pub fn resolved_version_code(&self) -> i64 {
        self.long_version_code
            .or(self.version_code.map(i64::from))
            .unwrap_or(0)
    }

    /// Declared API version, if present and numeric.
    pub fn api_version(&self) -> Option<i64> {
        match self.meta_data.get(META_API_VERSION)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Declared entry point, if present and not blank.
    pub fn entry_point(&self) -> Option<&str> {
        self.meta_string(META_ENTRY_POINT)
    }

    /// Host marker for externally installed bundles.
    pub fn host_marker(&self) -> Option<&str> {
        self.meta_string(META_HOST_MARKER)
    }

    fn meta_string(&self, key: &str) -> Option<&str> {
        self.meta_data
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
