//! Bundle metadata extraction.
//!
//! A bundle is a ZIP archive with a `manifest.json` at its root. Parsing
//! only reads the archive; no plugin code is loaded.

pub mod manifest;
pub mod writer;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use bytes::Bytes;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{PluginError, PluginResult};
use crate::info::{PluginIcon, PluginInfo};
use crate::store::validate_identity;

pub use manifest::{BundleManifest, META_API_VERSION, META_ENTRY_POINT, META_HOST_MARKER};
pub use writer::BundleWriter;

/// Archive entry holding the manifest.
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Archive directory holding native code, one subdirectory per architecture.
pub const NATIVE_LIB_DIR: &str = "lib";

/// Reads and validates bundle metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataParser;

impl MetadataParser {
    /// Creates a parser.
    pub fn new() -> Self {
        Self
    }

    /// Parses a bundle from the managed plugin directory.
    pub fn parse(&self, path: &Path) -> PluginResult<PluginInfo> {
        self.parse_bundle(path, false)
    }

    /// Parses an externally installed bundle.
    pub fn parse_external(&self, path: &Path) -> PluginResult<PluginInfo> {
        self.parse_bundle(path, true)
    }

    /// Reads only the manifest of a bundle.
    pub fn read_manifest(&self, path: &Path) -> PluginResult<BundleManifest> {
        let mut archive = open_archive(path)?;
        read_manifest_entry(path, &mut archive)
    }

    fn parse_bundle(&self, path: &Path, is_external: bool) -> PluginResult<PluginInfo> {
        let mut archive = open_archive(path)?;
        let manifest = read_manifest_entry(path, &mut archive)?;

        let package_name = manifest
            .package
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PluginError::metadata(path, "manifest has no package name"))?
            .to_string();
        validate_identity(&package_name).map_err(|e| PluginError::metadata(path, e.message))?;

        let api_version = match manifest.api_version() {
            Some(v) if v >= 1 => u32::try_from(v).map_err(|_| {
                PluginError::metadata(path, format!("{META_API_VERSION} out of range: {v}"))
            })?,
            Some(v) => {
                return Err(PluginError::metadata(
                    path,
                    format!("{META_API_VERSION} must be at least 1, got {v}"),
                ));
            }
            None => {
                return Err(PluginError::metadata(
                    path,
                    format!("missing or non-numeric {META_API_VERSION}"),
                ));
            }
        };

        let entry_point = manifest
            .entry_point()
            .ok_or_else(|| PluginError::metadata(path, format!("missing {META_ENTRY_POINT}")))?
            .to_string();

        let icon = manifest
            .icon
            .as_deref()
            .and_then(|entry| read_icon(path, &mut archive, entry));

        let source_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        Ok(PluginInfo {
            api_version,
            entry_point,
            display_name: manifest
                .label
                .clone()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| package_name.clone()),
            version_name: manifest.version_name.clone().unwrap_or_default(),
            version_code: manifest.resolved_version_code(),
            package_name,
            icon,
            source_path,
            is_external,
        })
    }
}

/// Opens a bundle archive, mapping failures to metadata errors.
pub(crate) fn open_archive(path: &Path) -> PluginResult<ZipArchive<File>> {
    let file = File::open(path)
        .map_err(|e| PluginError::metadata(path, format!("cannot open bundle: {e}")))?;
    ZipArchive::new(file)
        .map_err(|e| PluginError::metadata(path, format!("not a valid bundle archive: {e}")))
}

fn read_manifest_entry(path: &Path, archive: &mut ZipArchive<File>) -> PluginResult<BundleManifest> {
    let mut raw = Vec::new();
    match archive.by_name(MANIFEST_ENTRY) {
        Ok(mut entry) => entry
            .read_to_end(&mut raw)
            .map_err(|e| PluginError::metadata(path, format!("cannot read manifest: {e}")))?,
        Err(ZipError::FileNotFound) => {
            return Err(PluginError::metadata(path, format!("missing {MANIFEST_ENTRY}")));
        }
        Err(e) => {
            return Err(PluginError::metadata(path, format!("cannot read manifest: {e}")));
        }
    };

    serde_json::from_slice(&raw)
        .map_err(|e| PluginError::metadata(path, format!("malformed manifest: {e}")))
}

fn read_icon(path: &Path, archive: &mut ZipArchive<File>, entry: &str) -> Option<PluginIcon> {
    let mut data = Vec::new();
    let read = archive
        .by_name(entry)
        .map_err(|e| e.to_string())
        .and_then(|mut file| file.read_to_end(&mut data).map_err(|e| e.to_string()));

    match read {
        Ok(_) => Some(PluginIcon {
            entry: entry.to_string(),
            data: Bytes::from(data),
        }),
        Err(e) => {
            debug!(path = %path.display(), entry, error = %e, "Bundle icon unavailable");
            None
        }
    }
}

/// Name of the native library entry for the running architecture, if the
/// bundle ships one.
pub fn native_library_entry(archive: &ZipArchive<File>) -> Option<String> {
    let prefix = format!("{NATIVE_LIB_DIR}/{}/", std::env::consts::ARCH);
    let mut names: Vec<&str> = archive
        .file_names()
        .filter(|name| name.starts_with(&prefix) && !name.ends_with('/'))
        .filter(|name| name.ends_with(std::env::consts::DLL_SUFFIX))
        .collect();
    names.sort_unstable();
    names.first().map(|name| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, bundle: BundleWriter) -> std::path::PathBuf {
        let path = dir.path().join(name);
        bundle.write_to(&path).unwrap();
        path
    }

    #[test]
    fn test_parse_complete_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "a.tbp",
            BundleWriter::new("com.example.a")
                .label("Example A")
                .version("1.2.0", 12)
                .api_version(3)
                .entry_point("com.example.a.Entry")
                .icon("res/icon.png", b"\x89PNG".to_vec()),
        );

        let info = MetadataParser::new().parse(&path).unwrap();
        assert_eq!(info.package_name, "com.example.a");
        assert_eq!(info.display_name, "Example A");
        assert_eq!(info.version_name, "1.2.0");
        assert_eq!(info.version_code, 12);
        assert_eq!(info.api_version, 3);
        assert_eq!(info.entry_point, "com.example.a.Entry");
        assert_eq!(info.icon.unwrap().data.as_ref(), b"\x89PNG");
        assert!(info.source_path.is_absolute());
        assert!(!info.is_external);
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "b.tbp",
            BundleWriter::new("com.example.b")
                .legacy_version_code(4)
                .api_version(1)
                .entry_point("Entry"),
        );

        let info = MetadataParser::new().parse_external(&path).unwrap();
        assert_eq!(info.display_name, "com.example.b");
        assert_eq!(info.version_name, "");
        assert_eq!(info.version_code, 4);
        assert!(info.icon.is_none());
        assert!(info.is_external);
    }

    #[test]
    fn test_missing_icon_entry_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = BundleWriter::new("com.example.c")
            .api_version(3)
            .entry_point("Entry")
            .manifest()
            .clone();
        manifest.icon = Some("res/missing.png".into());
        let path = write(&dir, "c.tbp", BundleWriter::from_manifest(manifest));

        let info = MetadataParser::new().parse(&path).unwrap();
        assert!(info.icon.is_none());
    }

    #[test]
    fn test_rejects_invalid_bundles() {
        let dir = tempfile::tempdir().unwrap();
        let parser = MetadataParser::new();

        let garbage = dir.path().join("garbage.tbp");
        std::fs::write(&garbage, b"definitely not a zip").unwrap();

        let cases = [
            garbage,
            write(&dir, "no_api.tbp", BundleWriter::new("a").entry_point("E")),
            write(
                &dir,
                "zero_api.tbp",
                BundleWriter::new("a").api_version(0).entry_point("E"),
            ),
            write(&dir, "no_entry.tbp", BundleWriter::new("a").api_version(2)),
            write(
                &dir,
                "blank_entry.tbp",
                BundleWriter::new("a").api_version(2).entry_point("  "),
            ),
            write(
                &dir,
                "no_package.tbp",
                BundleWriter::new("").api_version(2).entry_point("E"),
            ),
            write(
                &dir,
                "traversal.tbp",
                BundleWriter::new("../../escaped").api_version(2).entry_point("E"),
            ),
            write(
                &dir,
                "hidden.tbp",
                BundleWriter::new(".hidden").api_version(2).entry_point("E"),
            ),
        ];

        for path in cases {
            match parser.parse(&path) {
                Err(PluginError::Metadata { path: p, .. }) => assert_eq!(p, path),
                other => panic!("expected metadata error for {}, got {other:?}", path.display()),
            }
        }
    }

    #[test]
    fn test_native_library_entry_for_running_arch() {
        let dir = tempfile::tempdir().unwrap();
        let lib_name = format!("libdemo{}", std::env::consts::DLL_SUFFIX);
        let path = write(
            &dir,
            "native.tbp",
            BundleWriter::new("com.example.native")
                .api_version(3)
                .entry_point("Entry")
                .native_library(std::env::consts::ARCH, &lib_name, b"ELF".to_vec())
                .native_library("some-other-arch", &lib_name, b"ELF".to_vec()),
        );

        let archive = open_archive(&path).unwrap();
        assert_eq!(
            native_library_entry(&archive),
            Some(format!("lib/{}/{lib_name}", std::env::consts::ARCH))
        );
    }
}
