//! Fixtures shared by unit tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::api::services::*;
use crate::info::PluginInfo;
use crate::plugin::Plugin;

/// Entry point whose services return nothing.
pub(crate) struct NullEntry;

#[async_trait]
impl MainScreenService for NullEntry {
    async fn home(&self) -> Result<Vec<MediaRow>, String> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl MediaDetailService for NullEntry {
    async fn detail(&self, media_id: &str) -> Result<MediaDetail, String> {
        Err(format!("unknown media {media_id}"))
    }
}

#[async_trait]
impl MediaSearchService for NullEntry {
    async fn search(&self, _keyword: &str, _page: u32) -> Result<SearchPage, String> {
        Ok(SearchPage {
            items: Vec::new(),
            has_next: false,
        })
    }
}

#[async_trait]
impl MediaCatalogService for NullEntry {
    async fn categories(&self) -> Result<Vec<Category>, String> {
        Ok(Vec::new())
    }

    async fn catalog(&self, _category: &str, page: u32) -> Result<CatalogPage, String> {
        Ok(CatalogPage {
            items: Vec::new(),
            page,
            has_next: false,
        })
    }
}

impl PluginEntry for NullEntry {
    fn main_screen_service(&self) -> Arc<dyn MainScreenService> {
        Arc::new(NullEntry)
    }
    fn media_detail_service(&self) -> Arc<dyn MediaDetailService> {
        Arc::new(NullEntry)
    }
    fn media_search_service(&self) -> Arc<dyn MediaSearchService> {
        Arc::new(NullEntry)
    }
    fn media_catalog_service(&self) -> Arc<dyn MediaCatalogService> {
        Arc::new(NullEntry)
    }
}

/// Metadata for a bundle at `path`.
pub(crate) fn info(package: &str, path: &Path) -> PluginInfo {
    PluginInfo {
        api_version: crate::HOST_API_VERSION,
        entry_point: format!("{package}.Entry"),
        package_name: package.to_string(),
        display_name: package.to_string(),
        version_name: "1.0".to_string(),
        version_code: 1,
        icon: None,
        source_path: path.to_path_buf(),
        is_external: false,
    }
}

/// A loaded plugin backed by [`NullEntry`].
pub(crate) fn plugin(package: &str, path: &Path) -> Arc<Plugin> {
    Arc::new(Plugin::new(info(package, path), Arc::new(NullEntry)))
}
