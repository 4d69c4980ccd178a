//! A loaded, running plugin.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::api::services::{
    MainScreenService, MediaCatalogService, MediaDetailService, MediaSearchService, PluginEntry,
    PluginOptions,
};
use crate::info::{ApiMismatch, PluginInfo};

/// A plugin instance and its services.
///
/// Services are requested from the entry point on first access and cached
/// for the life of the instance, so a plugin never pays for a service the
/// host does not use.
pub struct Plugin {
    info: PluginInfo,
    entry: Arc<dyn PluginEntry>,
    main_screen: OnceLock<Arc<dyn MainScreenService>>,
    media_detail: OnceLock<Arc<dyn MediaDetailService>>,
    media_search: OnceLock<Arc<dyn MediaSearchService>>,
    media_catalog: OnceLock<Arc<dyn MediaCatalogService>>,
    options: OnceLock<PluginOptions>,
}

impl Plugin {
    pub(crate) fn new(info: PluginInfo, entry: Arc<dyn PluginEntry>) -> Self {
        Self {
            info,
            entry,
            main_screen: OnceLock::new(),
            media_detail: OnceLock::new(),
            media_search: OnceLock::new(),
            media_catalog: OnceLock::new(),
            options: OnceLock::new(),
        }
    }

    /// Metadata the plugin was loaded from.
    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// API version mismatch against the host, if any.
    pub fn api_mismatch(&self) -> Option<ApiMismatch> {
        self.info.api_mismatch()
    }

    /// Main screen rows.
    pub fn main_screen_service(&self) -> Arc<dyn MainScreenService> {
        self.main_screen
            .get_or_init(|| self.entry.main_screen_service())
            .clone()
    }

    /// Media detail lookup.
    pub fn media_detail_service(&self) -> Arc<dyn MediaDetailService> {
        self.media_detail
            .get_or_init(|| self.entry.media_detail_service())
            .clone()
    }

    /// Keyword search.
    pub fn media_search_service(&self) -> Arc<dyn MediaSearchService> {
        self.media_search
            .get_or_init(|| self.entry.media_search_service())
            .clone()
    }

    /// Catalog browsing.
    pub fn media_catalog_service(&self) -> Arc<dyn MediaCatalogService> {
        self.media_catalog
            .get_or_init(|| self.entry.media_catalog_service())
            .clone()
    }

    /// User-adjustable options.
    pub fn options(&self) -> &PluginOptions {
        self.options.get_or_init(|| self.entry.options())
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("package_name", &self.info.package_name)
            .field("source_path", &self.info.source_path)
            .field("version_name", &self.info.version_name)
            .finish_non_exhaustive()
    }
}
