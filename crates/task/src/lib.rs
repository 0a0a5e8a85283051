//! Task discovery for `misebridge` projects.
//!
//! [`TaskSources`] reads tasks straight from disk: config tables, included
//! task files and executable scripts in task directories. [`TaskResolver`]
//! keeps a per-environment cache of that list, refreshed in the background
//! and announced with `TaskCacheRefreshed` when what a user would see changes.

pub mod resolver;
pub mod sources;

pub use resolver::{TaskEnvironment, TaskResolver};
pub use sources::{dedupe_by_name, script_tasks, TaskSources};
