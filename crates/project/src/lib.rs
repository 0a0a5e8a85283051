//! Project lifecycle for `misebridge`.
//!
//! A [`Project`] owns one work directory's services: the executable manager,
//! the command cache and its warmer, the task resolver, the config file
//! listener and watcher, and an optional redraw trigger. They are all wired
//! to the project's event bus when it opens and torn down when it is
//! disposed. [`ProjectRegistry`] keeps open projects addressable by
//! [`ProjectId`].

pub mod dirty;
pub mod listener;
pub mod options;
pub mod project;
pub mod redraw;
pub mod registry;
pub mod watcher;

pub use dirty::{DirtySet, DirtySnapshot};
pub use listener::{ConfigFileListener, FileChange};
pub use options::ProjectOptions;
pub use project::{Project, ProjectId};
pub use redraw::{RedrawCallback, RedrawTrigger};
pub use registry::ProjectRegistry;
pub use watcher::ConfigWatcher;
