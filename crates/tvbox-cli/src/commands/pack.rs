//! Bundle packaging command.

use std::path::PathBuf;

use clap::Args;

use crate::output;
use tvbox_core::error::AppError;
use tvbox_plugin_sdk::package::Packager;

/// Arguments for the pack command
#[derive(Debug, Args)]
pub struct PackArgs {
    /// Package identity
    #[arg(long)]
    pub package: String,

    /// Entry point name exported by the library
    #[arg(long)]
    pub entry_point: String,

    /// Compiled plugin library
    #[arg(long)]
    pub library: Option<PathBuf>,

    /// Architecture directory for the library; defaults to this machine's
    #[arg(long)]
    pub arch: Option<String>,

    /// Display name
    #[arg(long)]
    pub label: Option<String>,

    /// Version name
    #[arg(long, default_value = "1.0.0")]
    pub version_name: String,

    /// Version code
    #[arg(long, default_value = "1")]
    pub version_code: i64,

    /// Icon image
    #[arg(long)]
    pub icon: Option<PathBuf>,

    /// Host identity, for bundles installed outside the managed directory
    #[arg(long)]
    pub host: Option<String>,

    /// Output bundle path
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Execute the pack command
pub fn execute(args: &PackArgs) -> Result<(), AppError> {
    let mut packager = Packager::new(&args.package, &args.entry_point)
        .version(&args.version_name, args.version_code);

    if let Some(label) = &args.label {
        packager = packager.label(label);
    }
    if let Some(library) = &args.library {
        packager = packager.library(library);
    }
    if let Some(arch) = &args.arch {
        packager = packager.arch(arch);
    }
    if let Some(icon) = &args.icon {
        packager = packager.icon(icon);
    }
    if let Some(host) = &args.host {
        packager = packager.host(host);
    }

    packager.write_to(&args.output)?;
    output::print_success(&format!("Packed {} to {}", args.package, args.output.display()));
    Ok(())
}
