//! Entry point resolution.
//!
//! A [`CodeLoader`] turns the entry point name recorded in a bundle's
//! metadata into a constructor. Names are keys into an explicit table: the
//! one exported by the bundle's native library, or the host's own
//! [`EntryPointTable`] of statically linked factories, which acts as the
//! parent loader.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use tvbox_core::error::AppError;
use tvbox_core::result::AppResult;

use crate::api::context::TvBoxContext;
use crate::api::services::{PluginEntry, PluginFactory};
use crate::info::PluginInfo;
use crate::metadata;

/// Type-erased entry point constructor.
pub type EntryFactory =
    Arc<dyn Fn(TvBoxContext) -> Result<Box<dyn PluginEntry>, String> + Send + Sync>;

/// Resolves a bundle's entry point to a constructor.
pub trait CodeLoader: Send + Sync + fmt::Debug {
    /// Returns the constructor named by `info.entry_point`.
    fn resolve(&self, info: &PluginInfo) -> AppResult<EntryFactory>;
}

/// Entry points linked into the host binary, keyed by name.
#[derive(Clone, Default)]
pub struct EntryPointTable {
    entries: HashMap<String, EntryFactory>,
}

impl EntryPointTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a [`PluginFactory`] under `name`.
    pub fn register<F: PluginFactory>(&mut self, name: impl Into<String>) -> &mut Self {
        self.register_fn(name, F::create)
    }

    /// Registers a constructor closure under `name`, replacing any previous one.
    pub fn register_fn<C>(&mut self, name: impl Into<String>, constructor: C) -> &mut Self
    where
        C: Fn(TvBoxContext) -> Result<Box<dyn PluginEntry>, String> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(entry_point = %name, "Registered built-in entry point");
        self.entries.insert(name, Arc::new(constructor));
        self
    }

    /// Looks up a constructor.
    pub fn get(&self, name: &str) -> Option<EntryFactory> {
        self.entries.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered entry points.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for EntryPointTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPointTable")
            .field("entries", &self.names())
            .finish()
    }
}

impl CodeLoader for EntryPointTable {
    fn resolve(&self, info: &PluginInfo) -> AppResult<EntryFactory> {
        self.get(&info.entry_point).ok_or_else(|| {
            AppError::not_found(format!(
                "Entry point '{}' is not registered with the host",
                info.entry_point
            ))
        })
    }
}

/// Loads entry points from the native library shipped in a bundle, falling
/// back to the host's built-in table.
///
/// The library for the running architecture is extracted into the artifact
/// cache as `<identity>.odex`, next to a `<identity>.vdex` stamp that lets
/// later launches skip extraction. Opened libraries are never unloaded.
pub struct BundleCodeLoader {
    artifact_dir: PathBuf,
    builtins: EntryPointTable,
    #[cfg(feature = "dynamic")]
    libraries: std::sync::Mutex<HashMap<PathBuf, Arc<libloading::Library>>>,
}

impl fmt::Debug for BundleCodeLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleCodeLoader")
            .field("artifact_dir", &self.artifact_dir)
            .field("builtins", &self.builtins)
            .finish()
    }
}

impl BundleCodeLoader {
    /// Creates a loader extracting into `artifact_dir`.
    pub fn new(artifact_dir: impl Into<PathBuf>, builtins: EntryPointTable) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            builtins,
            #[cfg(feature = "dynamic")]
            libraries: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Directory extracted libraries are written to.
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Built-in entry points.
    pub fn builtins(&self) -> &EntryPointTable {
        &self.builtins
    }

    fn resolve_builtin(&self, info: &PluginInfo) -> AppResult<EntryFactory> {
        self.builtins.resolve(info)
    }
}

impl CodeLoader for BundleCodeLoader {
    fn resolve(&self, info: &PluginInfo) -> AppResult<EntryFactory> {
        let mut archive = metadata::open_archive(&info.source_path).map_err(AppError::from)?;
        let Some(entry) = metadata::native_library_entry(&archive) else {
            debug!(package = %info.package_name, "Bundle ships no native code, using built-ins");
            return self.resolve_builtin(info);
        };

        match self.resolve_native(info, &mut archive, &entry)? {
            Some(factory) => Ok(factory),
            None => {
                debug!(
                    package = %info.package_name,
                    entry_point = %info.entry_point,
                    "Entry point not exported by bundle library, using built-ins"
                );
                self.resolve_builtin(info)
            }
        }
    }
}

impl BundleCodeLoader {
    #[cfg(feature = "dynamic")]
    fn resolve_native(
        &self,
        info: &PluginInfo,
        archive: &mut zip::ZipArchive<std::fs::File>,
        entry: &str,
    ) -> AppResult<Option<EntryFactory>> {
        native::resolve(self, info, archive, entry)
    }

    #[cfg(not(feature = "dynamic"))]
    fn resolve_native(
        &self,
        info: &PluginInfo,
        _archive: &mut zip::ZipArchive<std::fs::File>,
        entry: &str,
    ) -> AppResult<Option<EntryFactory>> {
        tracing::warn!(
            package = %info.package_name,
            library = entry,
            "Dynamic loading is disabled, ignoring bundled library"
        );
        Ok(None)
    }
}

#[cfg(feature = "dynamic")]
mod native {
    use std::fs::{self, File};
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::UNIX_EPOCH;

    use serde::{Deserialize, Serialize};
    use tracing::{info, warn};
    use zip::ZipArchive;

    use tvbox_core::error::{AppError, ErrorKind};
    use tvbox_core::result::AppResult;

    use super::{BundleCodeLoader, EntryFactory};
    use crate::api::context::TvBoxContext;
    use crate::ffi::abi::{DECLARATION_SYMBOL, DeclarationFn};
    use crate::ffi::safety::{check_declaration, find_entry};
    use crate::info::PluginInfo;

    /// Contents of the `.vdex` file written next to an extracted library.
    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    struct ExtractionStamp {
        bundle_len: u64,
        bundle_modified: u64,
        version_code: i64,
        library: String,
    }

    impl ExtractionStamp {
        fn for_bundle(info: &PluginInfo, library: &str) -> AppResult<Self> {
            let meta = fs::metadata(&info.source_path)?;
            let bundle_modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or_default();
            Ok(Self {
                bundle_len: meta.len(),
                bundle_modified,
                version_code: info.version_code,
                library: library.to_string(),
            })
        }

        fn read(path: &Path) -> Option<Self> {
            let raw = fs::read(path).ok()?;
            serde_json::from_slice(&raw).ok()
        }
    }

    pub(super) fn resolve(
        loader: &BundleCodeLoader,
        info: &PluginInfo,
        archive: &mut ZipArchive<File>,
        entry: &str,
    ) -> AppResult<Option<EntryFactory>> {
        let (path, fresh) = extract(&loader.artifact_dir, info, archive, entry)?;
        let library = open(loader, &path, fresh)?;

        let declare = unsafe { library.get::<DeclarationFn>(DECLARATION_SYMBOL) }.map_err(|e| {
            AppError::with_source(
                ErrorKind::Plugin,
                format!("Library '{}' exports no plugin declaration", path.display()),
                e,
            )
        })?;
        let declaration = unsafe { declare() };
        check_declaration(&declaration).map_err(AppError::plugin)?;

        let Some(constructor) = (unsafe { find_entry(&declaration, &info.entry_point) }) else {
            return Ok(None);
        };

        let library = Arc::clone(&library);
        let factory: EntryFactory = Arc::new(move |context: TvBoxContext| {
            // Keeps the library mapped for as long as the factory exists.
            let _mapped = &library;
            let handle = unsafe { constructor(&context) };
            if handle.is_null() {
                return Err("entry point constructor returned no instance".to_string());
            }
            Ok(unsafe { handle.into_box() })
        });
        Ok(Some(factory))
    }

    /// Extracts the bundled library unless the stamp shows it is current.
    /// Returns the library path and whether it was freshly written.
    fn extract(
        artifact_dir: &Path,
        info: &PluginInfo,
        archive: &mut ZipArchive<File>,
        entry: &str,
    ) -> AppResult<(PathBuf, bool)> {
        let odex = artifact_dir.join(format!("{}.odex", info.package_name));
        let vdex = artifact_dir.join(format!("{}.vdex", info.package_name));
        let stamp = ExtractionStamp::for_bundle(info, entry)?;

        if odex.is_file() && ExtractionStamp::read(&vdex).as_ref() == Some(&stamp) {
            return Ok((odex, false));
        }

        fs::create_dir_all(artifact_dir)?;
        let temp = artifact_dir.join(format!(
            ".{}.odex.{}.part",
            info.package_name,
            uuid::Uuid::new_v4().simple()
        ));

        let written = (|| -> AppResult<()> {
            let mut source = archive.by_name(entry).map_err(|e| {
                AppError::with_source(
                    ErrorKind::Plugin,
                    format!("Cannot read bundled library '{entry}'"),
                    e,
                )
            })?;
            let mut target = File::create(&temp)?;
            io::copy(&mut source, &mut target)?;
            target.sync_all()?;
            fs::rename(&temp, &odex)?;
            Ok(())
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        fs::write(&vdex, serde_json::to_vec(&stamp)?)?;
        info!(
            package = %info.package_name,
            library = entry,
            path = %odex.display(),
            "Extracted plugin library"
        );
        Ok((odex, true))
    }

    fn open(
        loader: &BundleCodeLoader,
        path: &Path,
        fresh: bool,
    ) -> AppResult<Arc<libloading::Library>> {
        let mut libraries = loader
            .libraries
            .lock()
            .map_err(|_| AppError::internal("Library cache lock poisoned"))?;

        if !fresh {
            if let Some(library) = libraries.get(path) {
                return Ok(Arc::clone(library));
            }
        } else if libraries.contains_key(path) {
            warn!(
                path = %path.display(),
                "Plugin library replaced; the previous mapping stays loaded"
            );
        }

        let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
            AppError::with_source(
                ErrorKind::Plugin,
                format!("Cannot open plugin library '{}'", path.display()),
                e,
            )
        })?;
        let library = Arc::new(library);
        libraries.insert(path.to_path_buf(), Arc::clone(&library));
        Ok(library)
    }

}
