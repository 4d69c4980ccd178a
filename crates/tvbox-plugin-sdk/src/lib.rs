//! # tvbox-plugin-sdk
//!
//! SDK for developing TvBox plugins.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tvbox_plugin_sdk::prelude::*;
//!
//! struct MyEntry { context: TvBoxContext }
//!
//! impl PluginEntry for MyEntry {
//!     fn main_screen_service(&self) -> Arc<dyn MainScreenService> { /* ... */ }
//!     fn media_detail_service(&self) -> Arc<dyn MediaDetailService> { /* ... */ }
//!     fn media_search_service(&self) -> Arc<dyn MediaSearchService> { /* ... */ }
//!     fn media_catalog_service(&self) -> Arc<dyn MediaCatalogService> { /* ... */ }
//! }
//!
//! struct MyFactory;
//!
//! impl PluginFactory for MyFactory {
//!     fn create(context: TvBoxContext) -> Result<Box<dyn PluginEntry>, String> {
//!         Ok(Box::new(MyEntry { context }))
//!     }
//! }
//!
//! tvbox_plugin_sdk::export_plugin!("com.example.MyEntry" => MyFactory);
//! ```
//!
//! Build the crate as a `cdylib` and package it with [`package::Packager`]
//! (or `tvbox pack`). The entry point name given to `export_plugin!` is the
//! value of the bundle's `tvbox.plugin.entry_point` metadata.

pub mod macros;
pub mod package;

#[doc(hidden)]
pub use tvbox_plugin::ffi::abi;
pub use tvbox_plugin::{BundleWriter, EntryPointTable, HOST_API_VERSION};

/// Prelude for convenient imports.
pub mod prelude {
    pub use std::sync::Arc;

    pub use tvbox_plugin::prelude::*;

    pub use crate::package::Packager;
}
