mod fischer;
mod flunder;

pub use fischer::*;
pub use flunder::*;

pub const VERSION: &str = "v1alpha1";
