//! Install and uninstall commands.

use std::path::PathBuf;

use clap::Args;

use crate::output::{self, OutputFormat};
use tvbox_core::error::AppError;

/// Arguments for the install command
#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Bundle file to install
    pub bundle: PathBuf,
}

/// Arguments for the uninstall command
#[derive(Debug, Args)]
pub struct UninstallArgs {
    /// Identity of the plugin to remove
    pub package: String,

    /// Skip confirmation
    #[arg(long)]
    pub force: bool,
}

/// Execute the install command
pub async fn install(
    args: &InstallArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let manager = super::create_manager(config_path)?;
    // Populates the identity map so external identities are refused.
    manager.scan().await?;

    let info = manager.install(&args.bundle).await?;
    output::print_success(&format!(
        "Installed {} {} to {}",
        info.package_name,
        info.version_name,
        info.source_path.display()
    ));
    if format == OutputFormat::Json {
        output::print_item(&info, format);
    }
    Ok(())
}

/// Execute the uninstall command
pub async fn uninstall(args: &UninstallArgs, config_path: &str) -> Result<(), AppError> {
    let manager = super::create_manager(config_path)?;
    manager.scan().await?;

    if !args.force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!("Uninstall {}?", args.package))
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if manager.uninstall(&args.package).await? {
        output::print_success(&format!("Uninstalled {}", args.package));
    } else {
        output::print_warning(&format!("{} is not installed", args.package));
    }
    Ok(())
}
