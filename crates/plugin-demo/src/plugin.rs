//! Demo plugin entry point.

use std::sync::Arc;

use tracing::info;

use tvbox_plugin_sdk::prelude::*;

use crate::catalog::Catalog;
use crate::services::{CatalogServices, DEFAULT_PAGE_SIZE, PAGE_SIZE_KEY};

/// Entry point instantiated by the host.
#[derive(Debug)]
pub struct DemoEntry {
    package_name: String,
    debug: bool,
    services: Arc<CatalogServices>,
}

impl DemoEntry {
    /// Creates the entry point from the host context.
    pub fn new(context: TvBoxContext) -> Result<Self, String> {
        let catalog = Catalog::bundled()?;
        Ok(Self {
            package_name: context.package_name,
            debug: context.debug,
            services: Arc::new(CatalogServices::new(catalog, context.store)),
        })
    }
}

impl PluginEntry for DemoEntry {
    fn on_init(&self) -> Result<(), String> {
        let page_size = self.services.page_size()?;
        if self.services.catalog().is_empty() {
            return Err("catalog is empty".to_string());
        }
        info!(
            package = %self.package_name,
            items = self.services.catalog().len(),
            page_size,
            debug = self.debug,
            "Demo plugin initialized"
        );
        Ok(())
    }

    fn main_screen_service(&self) -> Arc<dyn MainScreenService> {
        self.services.clone()
    }

    fn media_detail_service(&self) -> Arc<dyn MediaDetailService> {
        self.services.clone()
    }

    fn media_search_service(&self) -> Arc<dyn MediaSearchService> {
        self.services.clone()
    }

    fn media_catalog_service(&self) -> Arc<dyn MediaCatalogService> {
        self.services.clone()
    }

    fn options(&self) -> PluginOptions {
        PluginOptions {
            items: vec![PluginOption {
                key: PAGE_SIZE_KEY.to_string(),
                label: "Items per page".to_string(),
                default_value: DEFAULT_PAGE_SIZE.to_string(),
            }],
        }
    }
}

/// Factory registered under [`ENTRY_POINT`](crate::ENTRY_POINT).
pub struct DemoFactory;

impl PluginFactory for DemoFactory {
    fn create(context: TvBoxContext) -> Result<Box<dyn PluginEntry>, String> {
        Ok(Box::new(DemoEntry::new(context)?))
    }
}
