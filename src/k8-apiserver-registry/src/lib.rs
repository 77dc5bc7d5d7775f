//!
//! # Resource registry
//!
//! Turns typed resources into CRUD and watch capable storages: the resource
//! and strategy contracts, the scheme, the generic store and the API
//! registry that installs stores into an API group.
//!
mod api;
pub mod attrs;
mod context;
mod envelope;
mod error;
pub mod gvr;
pub mod names;
mod resource;
pub mod rest;
mod scheme;
mod store;
mod strategy;
mod table;

#[cfg(test)]
mod fixture;

pub use api::*;
pub use context::*;
pub use envelope::*;
pub use error::*;
pub use resource::*;
pub use rest::RestStorage;
pub use rest::ResourceStorage;
pub use rest::StorageProvider;
pub use scheme::*;
pub use store::*;
pub use strategy::*;
pub use table::default_table;

pub use k8_apiserver_storage as storage;
pub use k8_apiserver_types as types;
