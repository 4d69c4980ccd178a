//! Demo plugin for TvBox.
//!
//! Serves a small catalog compiled into the library. Built as a `cdylib`
//! it can be packed into a bundle and loaded dynamically; linked as an
//! `rlib` the host registers its entry point directly.

pub mod catalog;
pub mod plugin;
pub mod services;

pub use catalog::Catalog;
pub use plugin::{DemoEntry, DemoFactory};

/// Package identity the demo bundle is published under.
pub const PACKAGE_NAME: &str = "com.tvbox.demo";

/// Entry point name exported by this library.
pub const ENTRY_POINT: &str = "com.tvbox.demo.DemoEntry";

tvbox_plugin_sdk::export_plugin!("com.tvbox.demo.DemoEntry" => DemoFactory);
