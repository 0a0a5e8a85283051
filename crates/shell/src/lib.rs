//! Baseline context of a project: which shell runs mise, where the user's
//! home is, and whether the project lives inside a WSL distribution.

pub mod project_info;
pub mod wsl;

pub use project_info::*;
pub use wsl::*;
