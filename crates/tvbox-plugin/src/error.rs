//! Plugin runtime error taxonomy.

use std::path::PathBuf;

use thiserror::Error;
use tvbox_core::error::{AppError, ErrorKind};

/// Errors returned by the plugin runtime.
///
/// Structural rejections during a scan are not errors; they are reported as
/// [`RejectedEntry`](crate::info::RejectedEntry) values in the scan result.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A bundle could not be opened or lacks required ABI metadata.
    #[error("invalid plugin bundle '{}': {reason}", .path.display())]
    Metadata {
        /// Bundle location.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// A plugin could not be instantiated. The underlying cause is logged,
    /// not carried.
    #[error("failed to load plugin '{package_name}': {reason}")]
    Load {
        /// Identity of the plugin being launched.
        package_name: String,
        /// Short, loader-agnostic description.
        reason: String,
    },

    /// The active plugin was requested before any plugin was launched.
    #[error("no plugin has been launched yet")]
    NotInitialized,

    /// The identity is not part of the last scan.
    #[error("plugin '{0}' is unknown; rescan the plugin directory")]
    NotFound(String),

    /// The identity belongs to an externally installed plugin.
    #[error("plugin '{0}' is installed externally and cannot be managed here")]
    External(String),

    /// Filesystem or internal failure with its cause attached.
    #[error(transparent)]
    Storage(#[from] AppError),
}

impl PluginError {
    /// Helper to construct metadata errors.
    pub fn metadata(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Helper to construct load errors.
    pub fn load(package_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            package_name: package_name.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for plugin runtime operations.
pub type PluginResult<T> = Result<T, PluginError>;

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        let kind = match err {
            PluginError::Storage(inner) => return inner,
            PluginError::NotFound(_) => ErrorKind::NotFound,
            PluginError::External(_) => ErrorKind::Conflict,
            _ => ErrorKind::Plugin,
        };
        AppError::new(kind, err.to_string())
    }
}
