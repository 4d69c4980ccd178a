//! Packaging a built plugin library into a bundle.

use std::path::{Path, PathBuf};

use tracing::info;

use tvbox_core::error::{AppError, ErrorKind};
use tvbox_core::result::AppResult;
use tvbox_plugin::{BundleWriter, HOST_API_VERSION};

/// Assembles a `.tbp` bundle from a compiled plugin library.
#[derive(Debug, Clone)]
pub struct Packager {
    writer: BundleWriter,
    library: Option<PathBuf>,
    icon: Option<PathBuf>,
    arch: String,
}

impl Packager {
    /// Starts a bundle for `package` whose entry point is `entry_point`,
    /// targeting this SDK's API version and the running architecture.
    pub fn new(package: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            writer: BundleWriter::new(package)
                .api_version(HOST_API_VERSION)
                .entry_point(entry_point),
            library: None,
            icon: None,
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    /// Sets the display name.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.writer = self.writer.label(label);
        self
    }

    /// Sets the version name and code.
    pub fn version(mut self, name: impl Into<String>, code: i64) -> Self {
        self.writer = self.writer.version(name, code);
        self
    }

    /// Overrides the declared API version.
    pub fn api_version(mut self, version: u32) -> Self {
        self.writer = self.writer.api_version(version);
        self
    }

    /// Marks the bundle as targeting a host identity, for external discovery.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.writer = self.writer.host_marker(host);
        self
    }

    /// Native library to ship.
    pub fn library(mut self, path: impl Into<PathBuf>) -> Self {
        self.library = Some(path.into());
        self
    }

    /// Architecture directory the library is stored under.
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Icon image to ship.
    pub fn icon(mut self, path: impl Into<PathBuf>) -> Self {
        self.icon = Some(path.into());
        self
    }

    /// Reads the inputs and writes the bundle to `output`.
    pub fn write_to(self, output: &Path) -> AppResult<()> {
        let mut writer = self.writer;

        if let Some(icon) = &self.icon {
            let name = file_name(icon)?;
            writer = writer.icon(format!("res/{name}"), read(icon)?);
        }

        if let Some(library) = &self.library {
            let name = file_name(library)?;
            writer = writer.native_library(&self.arch, &name, read(library)?);
        }

        writer.write_to(output)?;
        info!(
            package = ?writer.manifest().package,
            output = %output.display(),
            library = ?self.library,
            "Plugin bundle packed"
        );
        Ok(())
    }
}

fn file_name(path: &Path) -> AppResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::validation(format!("Invalid file name: {}", path.display())))
}

fn read(path: &Path) -> AppResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to read {}", path.display()),
            e,
        )
    })
}
