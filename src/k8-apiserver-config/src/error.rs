use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// failures turning a file or document into usable server options
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read server options from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed server options: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("cannot render server options: {0}")]
    Render(#[source] serde_yaml::Error),
    #[error("no API group configured")]
    NoGroup,
    #[error("invalid server options: {}", .0.join(", "))]
    Invalid(Vec<String>),
}
