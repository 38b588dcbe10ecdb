mod error;
mod types;

pub use error::{ProbeError, Result};
pub use types::{masked_argv, CancelFlag};
