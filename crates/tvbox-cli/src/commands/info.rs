//! Bundle inspection command.

use std::path::PathBuf;

use clap::Args;

use crate::output::{self, OutputFormat};
use tvbox_core::error::AppError;
use tvbox_plugin::MetadataParser;

/// Arguments for the info command
#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Bundle file to inspect
    pub bundle: PathBuf,
}

/// Execute the info command
pub fn execute(args: &InfoArgs, format: OutputFormat) -> Result<(), AppError> {
    let info = MetadataParser::new().parse(&args.bundle)?;
    output::print_plugin(&info, format);
    Ok(())
}
