//! Service contract between plugins and the host UI.
//!
//! A plugin's entry point produces four services and its options. Screens
//! consume them through [`Plugin`](crate::plugin::Plugin).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::context::TvBoxContext;

/// A single media item as shown in lists and grids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCard {
    /// Plugin-scoped media identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Secondary line (episode count, year, ...).
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Cover image URL.
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// A titled row of cards on the main screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRow {
    /// Row title.
    pub title: String,
    /// Cards in display order.
    pub items: Vec<MediaCard>,
}

/// A playable episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Plugin-scoped episode identifier.
    pub id: String,
    /// Episode title.
    pub title: String,
}

/// Detail page of one media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDetail {
    /// The item itself.
    pub card: MediaCard,
    /// Synopsis.
    #[serde(default)]
    pub description: String,
    /// Episodes in play order.
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Matches on this page.
    pub items: Vec<MediaCard>,
    /// Whether another page exists.
    pub has_next: bool,
}

/// A browsable catalog category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Plugin-scoped category identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// One page of a catalog category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    /// Items on this page.
    pub items: Vec<MediaCard>,
    /// 1-based page number.
    pub page: u32,
    /// Whether another page exists.
    pub has_next: bool,
}

/// A user-adjustable plugin option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginOption {
    /// Key in the plugin's key/value store.
    pub key: String,
    /// Label shown to users.
    pub label: String,
    /// Value used when nothing is stored.
    pub default_value: String,
}

/// Options a plugin exposes to the settings screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginOptions {
    /// Options in display order.
    pub items: Vec<PluginOption>,
}

/// Content rows for the main screen.
#[async_trait]
pub trait MainScreenService: Send + Sync {
    /// Returns the rows of the home page.
    async fn home(&self) -> Result<Vec<MediaRow>, String>;
}

/// Media detail lookup.
#[async_trait]
pub trait MediaDetailService: Send + Sync {
    /// Returns the detail page for `media_id`.
    async fn detail(&self, media_id: &str) -> Result<MediaDetail, String>;
}

/// Keyword search.
#[async_trait]
pub trait MediaSearchService: Send + Sync {
    /// Returns page `page` (1-based) of results for `keyword`.
    async fn search(&self, keyword: &str, page: u32) -> Result<SearchPage, String>;
}

/// Category browsing with paging.
#[async_trait]
pub trait MediaCatalogService: Send + Sync {
    /// Lists the available categories.
    async fn categories(&self) -> Result<Vec<Category>, String>;

    /// Returns page `page` (1-based) of `category`.
    async fn catalog(&self, category: &str, page: u32) -> Result<CatalogPage, String>;
}

/// The object a plugin's entry point instantiates.
///
/// Service accessors are called at most once per loaded plugin; the host
/// memoizes the results.
pub trait PluginEntry: Send + Sync {
    /// One-time initialization, run before the plugin is handed out.
    fn on_init(&self) -> Result<(), String> {
        Ok(())
    }

    /// Main screen rows.
    fn main_screen_service(&self) -> Arc<dyn MainScreenService>;

    /// Detail lookup.
    fn media_detail_service(&self) -> Arc<dyn MediaDetailService>;

    /// Search.
    fn media_search_service(&self) -> Arc<dyn MediaSearchService>;

    /// Catalog browsing.
    fn media_catalog_service(&self) -> Arc<dyn MediaCatalogService>;

    /// Settings exposed to users.
    fn options(&self) -> PluginOptions {
        PluginOptions::default()
    }
}

/// Constructor of an entry point, registered under a name in an entry point
/// table.
pub trait PluginFactory: 'static {
    /// Instantiates the entry point with the host context.
    fn create(context: TvBoxContext) -> Result<Box<dyn PluginEntry>, String>;
}
