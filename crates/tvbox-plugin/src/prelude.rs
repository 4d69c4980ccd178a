//! Prelude for convenient imports.

pub use async_trait::async_trait;

pub use crate::api::context::{NetworkCapabilities, ScreenGeometry, TvBoxContext};
pub use crate::api::services::{
    CatalogPage, Category, Episode, MainScreenService, MediaCard, MediaCatalogService,
    MediaDetail, MediaDetailService, MediaRow, MediaSearchService, PluginEntry, PluginFactory,
    PluginOption, PluginOptions, SearchPage,
};
pub use crate::api::store::PluginStore;
pub use crate::info::PluginInfo;
pub use crate::plugin::Plugin;
