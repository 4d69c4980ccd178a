//! Service implementations over the bundled catalog.

use std::sync::Arc;

use tracing::debug;

use tvbox_plugin_sdk::prelude::*;

use crate::catalog::Catalog;

/// Store key of the page size option.
pub const PAGE_SIZE_KEY: &str = "page_size";
/// Page size used when the store holds no value.
pub const DEFAULT_PAGE_SIZE: usize = 6;

/// Answers every screen from one catalog.
///
/// The page size is read from the plugin store on each request, so changes
/// made on the settings screen apply without a reload.
#[derive(Debug)]
pub struct CatalogServices {
    catalog: Catalog,
    store: Arc<dyn PluginStore>,
}

impl CatalogServices {
    /// Creates the services.
    pub fn new(catalog: Catalog, store: Arc<dyn PluginStore>) -> Self {
        Self { catalog, store }
    }

    /// Current page size.
    pub fn page_size(&self) -> Result<usize, String> {
        match self.store.get(PAGE_SIZE_KEY) {
            None => Ok(DEFAULT_PAGE_SIZE),
            Some(value) => match value.trim().parse::<usize>() {
                Ok(size) if size > 0 => Ok(size),
                _ => Err(format!("invalid {PAGE_SIZE_KEY}: {value:?}")),
            },
        }
    }

    /// The underlying catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[async_trait]
impl MainScreenService for CatalogServices {
    async fn home(&self) -> Result<Vec<MediaRow>, String> {
        Ok(self.catalog.rows(self.page_size()?))
    }
}

#[async_trait]
impl MediaDetailService for CatalogServices {
    async fn detail(&self, media_id: &str) -> Result<MediaDetail, String> {
        self.catalog
            .detail(media_id)
            .ok_or_else(|| format!("unknown media {media_id}"))
    }
}

#[async_trait]
impl MediaSearchService for CatalogServices {
    async fn search(&self, keyword: &str, page: u32) -> Result<SearchPage, String> {
        let result = self.catalog.search(keyword, page, self.page_size()?);
        debug!(keyword, page, matches = result.items.len(), "Demo search");
        Ok(result)
    }
}

#[async_trait]
impl MediaCatalogService for CatalogServices {
    async fn categories(&self) -> Result<Vec<Category>, String> {
        Ok(self.catalog.categories())
    }

    async fn catalog(&self, category: &str, page: u32) -> Result<CatalogPage, String> {
        self.catalog
            .page(category, page, self.page_size()?)
            .ok_or_else(|| format!("unknown category {category}"))
    }
}
