//!
//! # Resource storage
//!
//! Boundary between resource stores and the persistence engine. Objects are
//! kept in their JSON wire form under string keys.
//!
mod backend;
mod error;
mod in_memory;
pub mod key;
mod options;
mod predicate;

pub use backend::*;
pub use error::StorageError;
pub use in_memory::InMemoryStorage;
pub use in_memory::DEFAULT_EVENT_WINDOW;
pub use in_memory::DEFAULT_WATCH_CAPACITY;
pub use key::NameSpace;
pub use options::*;
pub use predicate::*;

