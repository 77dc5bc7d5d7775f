//!
//! # Wardle
//!
//! Sample `wardle.example.com` API group: flunders and fischers served from
//! the generic resource registry.
//!
pub mod server;
pub mod strategy;
pub mod v1alpha1;
pub mod v1beta1;
pub mod validation;

pub use server::*;

pub const GROUP: &str = "wardle.example.com";
