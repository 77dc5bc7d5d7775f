mod flunder;

pub use flunder::*;

pub const VERSION: &str = "v1beta1";
