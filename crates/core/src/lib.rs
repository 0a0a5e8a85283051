//! Core domain types, errors, and events for `misebridge`.
//!
//! Everything else in the workspace builds on the pieces defined here:
//!
//! - **`errors`**: the workspace `Error` enum, the `CommandError` carried by
//!   failed `mise` invocations, and the `Cancelled` signal raised when a
//!   bounded wait expires.
//! - **`types`**: values decoded from `mise` output (`MiseVersion`,
//!   `ExecutableInfo`, `DevTool`, `MiseTask`, ...).
//! - **`keys`**: typed cache keys. Each key encodes every input of the
//!   invocation it stands for and carries its own progress label.
//! - **`events`**: project lifecycle events and the synchronous bus that fans
//!   them out.
//! - **`constants`**: shared names, limits and timeouts.

pub mod constants;
pub mod errors;
pub mod events;
pub mod keys;
pub mod types;

pub use self::{
    constants::*,
    errors::{CancelReason, Cancelled, CommandError, CommandResult, Error, Result},
    events::{EventBus, ProjectEvent, ProjectEventKind, Subscription},
    keys::*,
    types::*,
};
