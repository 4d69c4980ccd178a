//! Binary interface for dynamically loaded plugins.

pub mod abi;
pub mod safety;
