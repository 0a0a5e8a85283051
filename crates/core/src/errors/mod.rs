//! Error types for misebridge operations

mod builders;
mod cancel;
mod command;
mod types;

pub use builders::*;
pub use cancel::{CancelReason, Cancelled};
pub use command::{CommandError, CommandResult};
pub use types::{Error, Result};
