//! Settings and mise configuration handling for misebridge
//!
//! This crate loads the user's settings and works out which mise config
//! files, task files and env files apply to a project.

pub mod discovery;
pub mod loader;
pub mod settings;
pub mod toml_file;

pub use discovery::*;
pub use loader::*;
pub use settings::*;
pub use toml_file::*;
