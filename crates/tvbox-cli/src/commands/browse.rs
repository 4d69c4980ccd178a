//! Launch a plugin and query its services.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use tvbox_core::error::AppError;

/// Arguments for the launch command
#[derive(Debug, Args)]
pub struct LaunchArgs {
    /// Identity of the plugin to launch; defaults to `host.default_plugin`
    pub package: Option<String>,

    /// What to query once launched
    #[command(subcommand)]
    pub view: Option<View>,
}

/// Service queries
#[derive(Debug, Subcommand)]
pub enum View {
    /// Main screen rows
    Home,
    /// Keyword search
    Search {
        /// Search keyword
        keyword: String,
        /// 1-based page
        #[arg(short, long, default_value = "1")]
        page: u32,
    },
    /// Detail page of one item
    Detail {
        /// Media identifier
        id: String,
    },
    /// Catalog categories
    Categories,
    /// One page of a category
    Catalog {
        /// Category identifier
        category: String,
        /// 1-based page
        #[arg(short, long, default_value = "1")]
        page: u32,
    },
    /// Options the plugin exposes
    Options,
}

/// Execute the launch command
pub async fn execute(
    args: &LaunchArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let package = args
        .package
        .clone()
        .or(config.host.default_plugin)
        .ok_or_else(|| AppError::validation("No plugin given and no default_plugin configured"))?;

    let manager = super::create_manager(config_path)?;
    manager.scan().await?;
    let plugin = manager.launch(&package).await?;
    if let Some(mismatch) = plugin.api_mismatch() {
        output::print_mismatch(&mismatch);
    }

    match args.view.as_ref().unwrap_or(&View::Home) {
        View::Home => {
            let rows = plugin
                .main_screen_service()
                .home()
                .await
                .map_err(AppError::plugin)?;
            if format == OutputFormat::Json {
                output::print_item(&rows, format);
            } else {
                for row in &rows {
                    println!("{}:", row.title);
                    for card in &row.items {
                        output::print_kv(&card.id, &card.title);
                    }
                }
            }
        }
        View::Search { keyword, page } => {
            let result = plugin
                .media_search_service()
                .search(keyword, *page)
                .await
                .map_err(AppError::plugin)?;
            output::print_item(&result, format);
        }
        View::Detail { id } => {
            let detail = plugin
                .media_detail_service()
                .detail(id)
                .await
                .map_err(AppError::plugin)?;
            output::print_item(&detail, format);
        }
        View::Categories => {
            let categories = plugin
                .media_catalog_service()
                .categories()
                .await
                .map_err(AppError::plugin)?;
            output::print_item(&categories, format);
        }
        View::Catalog { category, page } => {
            let page = plugin
                .media_catalog_service()
                .catalog(category, *page)
                .await
                .map_err(AppError::plugin)?;
            output::print_item(&page, format);
        }
        View::Options => {
            output::print_item(plugin.options(), format);
        }
    }

    Ok(())
}
