//! # tvbox-plugin
//!
//! Plugin runtime for TvBox. Provides:
//!
//! - Bundle discovery and install/uninstall in the managed plugin directory
//! - Bundle metadata parsing and validation (no plugin code is run)
//! - Entry point resolution through an explicit symbol table, either
//!   exported by a bundled dynamic library or registered by the host
//! - A pool of loaded plugins with a single active plugin, guarded by one
//!   lock for every mutating operation

pub mod api;
pub mod error;
pub mod external;
pub mod ffi;
pub mod info;
pub mod loader;
pub mod manager;
pub mod metadata;
pub mod plugin;
pub mod pool;
pub mod prelude;
pub mod store;

#[cfg(test)]
mod testing;

pub use api::context::{ContextBuilder, NetworkCapabilities, ScreenGeometry, TvBoxContext};
pub use api::services::{PluginEntry, PluginFactory};
pub use error::{PluginError, PluginResult};
pub use info::{ApiMismatch, LoadedPlugins, PluginIcon, PluginInfo, RejectReason, RejectedEntry};
pub use loader::code::{BundleCodeLoader, CodeLoader, EntryFactory, EntryPointTable};
pub use loader::PluginLoader;
pub use manager::{ManagerSnapshot, PluginManager, PluginManagerBuilder};
pub use metadata::{BundleManifest, BundleWriter, MetadataParser};
pub use plugin::Plugin;
pub use store::BundleStore;

/// Plugin API version implemented by this host.
///
/// Bundles declaring a different version are still loaded; the mismatch is
/// reported as data (see [`ApiMismatch`]).
pub const HOST_API_VERSION: u32 = 3;
