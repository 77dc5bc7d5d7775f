//!
//! # API server types
//!
//! Plain data shared by storage, registry and API groups: object metadata,
//! group/version/kind identifiers, label and field selectors, field errors.
//!
mod field;
mod gvk;
mod labels;
mod metadata;
pub mod options;
mod status;
pub mod table;

pub use self::field::*;
pub use self::gvk::*;
pub use self::labels::*;
pub use self::metadata::*;
pub use self::options::*;
pub use self::status::*;
