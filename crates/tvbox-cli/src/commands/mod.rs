//! CLI command definitions and dispatch.

pub mod browse;
pub mod info;
pub mod install;
pub mod pack;
pub mod scan;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use tvbox_core::config::AppConfig;
use tvbox_core::error::AppError;
use tvbox_plugin::{EntryPointTable, PluginManager};

/// TvBox plugin runtime tools
#[derive(Debug, Parser)]
#[command(name = "tvbox", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the plugin directories and list what was found
    Scan(scan::ScanArgs),
    /// Read a bundle's metadata without running its code
    Info(info::InfoArgs),
    /// Install a bundle into the managed plugin directory
    Install(install::InstallArgs),
    /// Remove an installed plugin and its cached code
    Uninstall(install::UninstallArgs),
    /// Launch a plugin and query its services
    Launch(browse::LaunchArgs),
    /// Pack a compiled plugin library into a bundle
    Pack(pack::PackArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Scan(args) => scan::execute(args, &self.config, self.format).await,
            Commands::Info(args) => info::execute(args, self.format),
            Commands::Install(args) => install::install(args, &self.config, self.format).await,
            Commands::Uninstall(args) => install::uninstall(args, &self.config).await,
            Commands::Launch(args) => browse::execute(args, &self.config, self.format).await,
            Commands::Pack(args) => pack::execute(args),
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
        .map_err(|e| AppError::configuration(format!("Failed to load config: {}", e)))
}

/// Helper: create a plugin manager with the entry points linked into the CLI
pub fn create_manager(config_path: &str) -> Result<PluginManager, AppError> {
    let config = load_config(config_path)?;

    let mut builtins = EntryPointTable::new();
    plugin_demo::register_entry_points(&mut builtins);

    Ok(PluginManager::builder(config).builtins(builtins).build())
}
