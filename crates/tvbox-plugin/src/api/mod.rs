//! Plugin-facing API: the construction context and the service contract.

pub mod context;
pub mod services;
pub mod store;
