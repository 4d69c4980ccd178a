//! Bundle packaging.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde_json::Value;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use tvbox_core::error::{AppError, ErrorKind};
use tvbox_core::result::AppResult;

use super::manifest::{BundleManifest, META_API_VERSION, META_ENTRY_POINT, META_HOST_MARKER};
use super::{MANIFEST_ENTRY, NATIVE_LIB_DIR};

/// Builds a bundle archive in the format [`MetadataParser`](super::MetadataParser)
/// reads.
#[derive(Debug, Clone, Default)]
pub struct BundleWriter {
    manifest: BundleManifest,
    files: Vec<(String, Vec<u8>)>,
}

impl BundleWriter {
    /// Starts a bundle for the given identity.
    pub fn new(package: impl Into<String>) -> Self {
        Self::from_manifest(BundleManifest {
            package: Some(package.into()),
            ..Default::default()
        })
    }

    /// Starts a bundle from an existing manifest.
    pub fn from_manifest(manifest: BundleManifest) -> Self {
        Self {
            manifest,
            files: Vec::new(),
        }
    }

    /// Sets the display name.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.manifest.label = Some(label.into());
        self
    }

    /// Sets the version name and 64-bit version code.
    pub fn version(mut self, name: impl Into<String>, code: i64) -> Self {
        self.manifest.version_name = Some(name.into());
        self.manifest.long_version_code = Some(code);
        self
    }

    /// Sets the legacy 32-bit version code.
    pub fn legacy_version_code(mut self, code: i32) -> Self {
        self.manifest.version_code = Some(code);
        self
    }

    /// Declares the plugin API version.
    pub fn api_version(self, version: u32) -> Self {
        self.meta(META_API_VERSION, Value::from(version))
    }

    /// Declares the entry point name.
    pub fn entry_point(self, name: impl Into<String>) -> Self {
        self.meta(META_ENTRY_POINT, Value::from(name.into()))
    }

    /// Marks the bundle as targeting the given host identity.
    pub fn host_marker(self, host: impl Into<String>) -> Self {
        self.meta(META_HOST_MARKER, Value::from(host.into()))
    }

    /// Sets an arbitrary meta-data value.
    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.manifest.meta_data.insert(key.into(), value);
        self
    }

    /// Adds an icon and references it from the manifest.
    pub fn icon(mut self, entry: impl Into<String>, data: Vec<u8>) -> Self {
        let entry = entry.into();
        self.manifest.icon = Some(entry.clone());
        self.files.push((entry, data));
        self
    }

    /// Adds a native library for one architecture.
    pub fn native_library(mut self, arch: &str, file_name: &str, data: Vec<u8>) -> Self {
        self.files
            .push((format!("{NATIVE_LIB_DIR}/{arch}/{file_name}"), data));
        self
    }

    /// Adds an arbitrary archive entry.
    pub fn file(mut self, entry: impl Into<String>, data: Vec<u8>) -> Self {
        self.files.push((entry.into(), data));
        self
    }

    /// Manifest as it will be written.
    pub fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }

    /// Writes the archive to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> AppResult<()> {
        let file = File::create(path).map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create bundle: {}", path.display()),
                e,
            )
        })?;

        let mut zip = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let manifest = serde_json::to_vec_pretty(&self.manifest)?;
        zip.start_file(MANIFEST_ENTRY, options).map_err(zip_error)?;
        zip.write_all(&manifest)?;

        for (entry, data) in &self.files {
            zip.start_file(entry.as_str(), options).map_err(zip_error)?;
            zip.write_all(data)?;
        }

        zip.finish().map_err(zip_error)?;
        Ok(())
    }
}

fn zip_error(err: zip::result::ZipError) -> AppError {
    AppError::with_source(
        ErrorKind::Serialization,
        format!("Bundle archive error: {err}"),
        err,
    )
}
