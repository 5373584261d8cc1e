//! Internal implementation modules for `opa-core`.
//!
//! Most callers should go through `opa_core::api` rather than importing these
//! modules directly.

pub mod apps;
pub mod config;
pub mod effects;
pub(crate) mod registry_store;
pub(crate) mod stager;
pub mod tooling;

#[cfg(test)]
pub(crate) mod test_support;
