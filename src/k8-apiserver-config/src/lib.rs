mod error;
mod options;

pub use error::ConfigError;
pub use options::*;
