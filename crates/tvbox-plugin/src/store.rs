//! Managed plugin directory.
//!
//! Bundles live directly under the plugin directory as `<identity><suffix>`.
//! Code extracted from bundles is cached below `oat/<arch>/` as
//! `<identity>.odex` with an `<identity>.vdex` stamp next to it.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use tvbox_core::error::{AppError, ErrorKind};
use tvbox_core::result::AppResult;

use crate::info::{RejectReason, RejectedEntry};

/// Name of the compiled-artifact cache directory under the plugin directory.
pub const OAT_DIR: &str = "oat";

/// Extensions of cache artifacts keyed by plugin identity.
pub const ARTIFACT_EXTENSIONS: [&str; 2] = ["odex", "vdex"];

/// Entries found directly under the plugin directory.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    /// Readable regular files carrying the bundle suffix.
    pub files: Vec<PathBuf>,
    /// Everything else.
    pub rejected: Vec<RejectedEntry>,
}

/// Filesystem gateway for the managed plugin directory.
#[derive(Debug, Clone)]
pub struct BundleStore {
    /// Managed plugin directory.
    root: PathBuf,
    /// Bundle file name suffix, including the dot.
    suffix: String,
}

impl BundleStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            suffix: suffix.into(),
        }
    }

    /// Managed plugin directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bundle file name suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Root of the compiled-artifact cache.
    pub fn oat_dir(&self) -> PathBuf {
        self.root.join(OAT_DIR)
    }

    /// Artifact cache directory for the running architecture.
    pub fn artifact_dir(&self) -> PathBuf {
        self.oat_dir().join(std::env::consts::ARCH)
    }

    /// Location a bundle for `identity` is installed to.
    pub fn bundle_path(&self, identity: &str) -> PathBuf {
        self.root.join(format!("{identity}{}", self.suffix))
    }

    async fn ensure_root(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create plugin directory: {}", self.root.display()),
                e,
            )
        })
    }

    /// Enumerates entries directly under the plugin directory.
    ///
    /// Nothing is dropped silently: every entry that is not a usable bundle
    /// is returned in `rejected` with its reason. The artifact cache
    /// directory is owned by the store and skipped.
    pub async fn list_candidates(&self) -> AppResult<Candidates> {
        self.ensure_root().await?;

        let mut dir = fs::read_dir(&self.root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to read plugin directory: {}", self.root.display()),
                e,
            )
        })?;

        let mut candidates = Candidates::default();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            if name == OAT_DIR && entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                continue;
            }

            match self.classify(&path, &name).await {
                None => candidates.files.push(path),
                Some(reason) => {
                    debug!(path = %path.display(), %reason, "Rejected plugin directory entry");
                    candidates.rejected.push(RejectedEntry { path, reason });
                }
            }
        }

        candidates.files.sort();
        candidates.rejected.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(candidates)
    }

    async fn classify(&self, path: &Path, name: &str) -> Option<RejectReason> {
        let meta = match fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) => return Some(RejectReason::Unreadable(e.to_string())),
        };
        if !meta.is_file() {
            return Some(RejectReason::NotAFile);
        }
        if !name.ends_with(&self.suffix) {
            return Some(RejectReason::WrongSuffix);
        }
        match fs::File::open(path).await {
            Ok(_) => None,
            Err(e) => Some(RejectReason::Unreadable(e.to_string())),
        }
    }

    /// Copies `source` into the plugin directory as `<identity><suffix>`.
    ///
    /// The copy is written to a hidden temporary file, marked read-only and
    /// renamed over the target, so scans never see a partial bundle.
    pub async fn install(&self, source: &Path, identity: &str) -> AppResult<PathBuf> {
        validate_identity(identity)?;
        self.ensure_root().await?;

        let target = self.bundle_path(identity);
        let temp = self.root.join(format!(
            ".{identity}{}.{}.part",
            self.suffix,
            uuid::Uuid::new_v4().simple()
        ));

        if let Err(e) = self.stage(source, &temp).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }

        #[cfg(windows)]
        if fs::try_exists(&target).await.unwrap_or(false) {
            set_readonly(&target, false).await?;
        }

        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to move bundle into place: {}", target.display()),
                e,
            ));
        }

        info!(
            identity,
            source = %source.display(),
            target = %target.display(),
            "Plugin bundle installed"
        );
        Ok(target)
    }

    async fn stage(&self, source: &Path, temp: &Path) -> AppResult<()> {
        fs::copy(source, temp).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to copy bundle: {}", source.display()),
                e,
            )
        })?;
        set_readonly(temp, true).await
    }

    /// Removes an installed bundle and its cached artifacts.
    ///
    /// Returns whether the bundle itself was removed; an absent bundle yields
    /// `false`. Artifact removal is best effort and only logged.
    pub async fn uninstall(&self, path: &Path, identity: &str) -> AppResult<bool> {
        validate_identity(identity)?;

        let removed = match fs::symlink_metadata(path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to inspect bundle: {}", path.display()),
                    e,
                ));
            }
            Ok(meta) => {
                let result = if meta.is_dir() {
                    fs::remove_dir_all(path).await
                } else {
                    #[cfg(windows)]
                    set_readonly(path, false).await?;
                    fs::remove_file(path).await
                };
                match result {
                    Ok(()) => true,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                    Err(e) => {
                        return Err(AppError::with_source(
                            ErrorKind::Storage,
                            format!("Failed to delete bundle: {}", path.display()),
                            e,
                        ));
                    }
                }
            }
        };

        self.sweep_artifacts(identity).await;

        info!(identity, path = %path.display(), removed, "Plugin bundle uninstalled");
        Ok(removed)
    }

    /// Deletes `<identity>.odex` / `<identity>.vdex` under every arch directory.
    async fn sweep_artifacts(&self, identity: &str) {
        let oat = self.oat_dir();
        let mut dir = match fs::read_dir(&oat).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!(path = %oat.display(), error = %e, "Failed to read artifact cache");
                return;
            }
        };

        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(path = %oat.display(), error = %e, "Failed to read artifact cache");
                    break;
                }
            };
            if !entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                continue;
            }
            for ext in ARTIFACT_EXTENSIONS {
                let artifact = entry.path().join(format!("{identity}.{ext}"));
                match fs::remove_file(&artifact).await {
                    Ok(()) => debug!(path = %artifact.display(), "Removed cached artifact"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(path = %artifact.display(), error = %e, "Failed to remove cached artifact")
                    }
                }
            }
        }
    }
}

/// Identities become file names; anything that could escape the plugin
/// directory is refused.
/// Rejects identities that cannot be used as a file name stem.
pub(crate) fn validate_identity(identity: &str) -> AppResult<()> {
    let invalid = identity.is_empty()
        || identity.starts_with('.')
        || identity.contains(['/', '\\', '\0'])
        || identity.contains("..");
    if invalid {
        return Err(AppError::validation(format!(
            "Invalid plugin identity: '{identity}'"
        )));
    }
    Ok(())
}

async fn set_readonly(path: &Path, readonly: bool) -> AppResult<()> {
    let mut perms = fs::metadata(path).await?.permissions();
    perms.set_readonly(readonly);
    fs::set_permissions(path, perms).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to change permissions: {}", path.display()),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> BundleStore {
        BundleStore::new(dir.path().join("plugins"), ".tbp")
    }

    #[tokio::test]
    async fn test_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let candidates = store.list_candidates().await.unwrap();
        assert!(candidates.files.is_empty());
        assert!(candidates.rejected.is_empty());
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn test_classification() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        std::fs::create_dir_all(store.root()).unwrap();
        std::fs::write(store.root().join("a.tbp"), b"zip").unwrap();
        std::fs::write(store.root().join("b.txt"), b"text").unwrap();
        std::fs::create_dir(store.root().join("c.tbp")).unwrap();
        std::fs::create_dir_all(store.artifact_dir()).unwrap();

        let candidates = store.list_candidates().await.unwrap();
        assert_eq!(candidates.files, vec![store.root().join("a.tbp")]);
        assert_eq!(candidates.rejected.len(), 2);
        assert_eq!(candidates.rejected[0].reason, RejectReason::WrongSuffix);
        assert_eq!(candidates.rejected[1].reason, RejectReason::NotAFile);
    }

    #[tokio::test]
    async fn test_install_is_read_only_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let source = dir.path().join("download.bin");

        std::fs::write(&source, b"first").unwrap();
        let target = store.install(&source, "com.example.a").await.unwrap();
        assert_eq!(target, store.bundle_path("com.example.a"));
        assert!(std::fs::metadata(&target).unwrap().permissions().readonly());

        std::fs::write(&source, b"second").unwrap();
        store.install(&source, "com.example.a").await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"second");

        let leftovers: Vec<_> = std::fs::read_dir(store.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_install_rejects_path_like_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let source = dir.path().join("x.tbp");
        std::fs::write(&source, b"x").unwrap();

        for identity in ["", "../evil", "a/b", ".hidden"] {
            let err = store.install(&source, identity).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_install_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let err = store
            .install(&dir.path().join("nope.tbp"), "com.example.a")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Storage);
        assert!(err.is_io_kind(std::io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_uninstall_sweeps_every_arch() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let source = dir.path().join("src.tbp");
        std::fs::write(&source, b"bundle").unwrap();
        let target = store.install(&source, "com.example.a").await.unwrap();

        let oat = store.oat_dir();
        for arch in ["x86_64", "aarch64"] {
            std::fs::create_dir_all(oat.join(arch)).unwrap();
            std::fs::write(oat.join(arch).join("com.example.a.odex"), b"o").unwrap();
            std::fs::write(oat.join(arch).join("com.example.a.vdex"), b"v").unwrap();
            std::fs::write(oat.join(arch).join("com.example.b.odex"), b"o").unwrap();
        }

        assert!(store.uninstall(&target, "com.example.a").await.unwrap());
        assert!(!target.exists());
        for arch in ["x86_64", "aarch64"] {
            assert!(!oat.join(arch).join("com.example.a.odex").exists());
            assert!(!oat.join(arch).join("com.example.a.vdex").exists());
            assert!(oat.join(arch).join("com.example.b.odex").exists());
        }

        assert!(!store.uninstall(&target, "com.example.a").await.unwrap());
    }

    #[tokio::test]
    async fn test_uninstall_directory_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let bundle = store.root().join("odd.tbp");
        std::fs::create_dir_all(bundle.join("nested")).unwrap();
        std::fs::write(bundle.join("nested/file"), b"x").unwrap();

        assert!(store.uninstall(&bundle, "odd").await.unwrap());
        assert!(!bundle.exists());
    }
}
