//! Plugin discovery command.

use clap::Args;
use serde::Serialize;

use crate::output::{self, OutputFormat, PluginRow, RejectedRow};
use tvbox_core::error::AppError;

/// Arguments for the scan command
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Also list entries that were rejected
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct ScanReport {
    plugins: Vec<PluginRow>,
    rejected: Vec<RejectedRow>,
    api_mismatches: Vec<tvbox_plugin::ApiMismatch>,
}

/// Execute the scan command
pub async fn execute(
    args: &ScanArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let manager = super::create_manager(config_path)?;
    let loaded = manager.scan().await?;

    let plugins: Vec<PluginRow> = loaded.plugins.iter().map(PluginRow::from).collect();
    let rejected: Vec<RejectedRow> = loaded.invalid_files.iter().map(RejectedRow::from).collect();

    if format == OutputFormat::Json {
        let report = ScanReport {
            plugins,
            rejected,
            api_mismatches: loaded.api_mismatches,
        };
        output::print_item(&report, format);
        return Ok(());
    }

    println!("Plugins in {}:", manager.store().root().display());
    output::print_list(&plugins, format);

    for mismatch in &loaded.api_mismatches {
        output::print_mismatch(mismatch);
    }

    if args.all {
        println!();
        println!("Rejected entries:");
        output::print_list(&rejected, format);
    } else if !rejected.is_empty() {
        output::print_warning(&format!(
            "{} entries were rejected (use --all to list them)",
            rejected.len()
        ));
    }

    Ok(())
}
