//! # tvbox-core
//!
//! Core crate for the TvBox host. Contains the configuration schemas and
//! the unified error system shared by the plugin runtime, the host binary
//! and the administration CLI.
//!
//! This crate has **no** internal dependencies on other TvBox crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
