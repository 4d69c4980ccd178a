//! Discovery of externally installed plugins.
//!
//! External bundles live outside the managed directory. They are only
//! considered when they declare this host as their target through the
//! `tvbox.plugin.host` marker, and they are never installed or removed by
//! the runtime.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use tvbox_core::config::plugin::PluginConfig;

use crate::metadata::MetadataParser;

/// Registry of installed applications that may carry plugins.
pub trait ExternalRegistry: Send + Sync + fmt::Debug {
    /// Bundles whose host marker equals `host_identity`.
    ///
    /// Blocking; the manager calls it off the async runtime.
    fn installed_bundles(&self, host_identity: &str) -> Vec<PathBuf>;
}

/// Registry backed by a list of directories.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    dirs: Vec<PathBuf>,
    suffix: String,
    parser: MetadataParser,
}

impl DirectoryRegistry {
    /// Creates a registry over `dirs`, accepting files ending in `suffix`.
    pub fn new(dirs: Vec<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dirs,
            suffix: suffix.into(),
            parser: MetadataParser::new(),
        }
    }

    /// Creates a registry from `plugins.external_dirs`.
    pub fn from_config(config: &PluginConfig) -> Self {
        Self::new(
            config.external_dirs.iter().map(PathBuf::from).collect(),
            config.suffix.clone(),
        )
    }

    fn bundles_in(&self, dir: &Path) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot read external plugin directory");
                return Vec::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(&self.suffix))
            })
            .collect()
    }
}

impl ExternalRegistry for DirectoryRegistry {
    fn installed_bundles(&self, host_identity: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for dir in &self.dirs {
            for path in self.bundles_in(dir) {
                match self.parser.read_manifest(&path) {
                    Ok(manifest) if manifest.host_marker() == Some(host_identity) => {
                        found.push(path);
                    }
                    Ok(manifest) => {
                        debug!(
                            path = %path.display(),
                            marker = ?manifest.host_marker(),
                            "External bundle targets another host"
                        );
                    }
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "Skipping unreadable external bundle");
                    }
                }
            }
        }
        found.sort();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::BundleWriter;

    #[test]
    fn test_only_bundles_marked_for_this_host() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, bundle: BundleWriter| {
            bundle.write_to(&dir.path().join(name)).unwrap();
        };

        write(
            "mine.tbp",
            BundleWriter::new("com.example.mine")
                .api_version(3)
                .entry_point("Entry")
                .host_marker("com.tvbox.host"),
        );
        write(
            "other.tbp",
            BundleWriter::new("com.example.other")
                .api_version(3)
                .entry_point("Entry")
                .host_marker("com.other.host"),
        );
        write(
            "unmarked.tbp",
            BundleWriter::new("com.example.unmarked")
                .api_version(3)
                .entry_point("Entry"),
        );
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let registry = DirectoryRegistry::new(
            vec![dir.path().to_path_buf(), dir.path().join("missing")],
            ".tbp",
        );
        let found = registry.installed_bundles("com.tvbox.host");
        assert_eq!(found, vec![dir.path().join("mine.tbp")]);
    }
}
