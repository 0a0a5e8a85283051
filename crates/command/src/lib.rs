//! The `mise` subprocess layer for misebridge
//!
//! - [`executor`]: the process seam and its tokio implementation
//! - [`command_line`]: argument building, session env and failure mapping
//! - [`detect`] / [`executable`]: locating, verifying and caching the binary
//! - [`helper`]: typed, cached queries (`env`, `ls`, `task ls`, ...)
//! - [`injection`]: applying the mise environment to launched processes

pub mod command_line;
pub mod detect;
pub mod executable;
pub mod executor;
pub mod fake;
pub mod helper;
pub mod injection;
pub mod session;
pub mod stderr;
pub mod warmer;

pub use command_line::{CommandContext, MiseCommandLine};
pub use detect::{parse_probe_output, ExecutableDetector, VersionProbe};
pub use executable::ExecutableManager;
pub use executor::{ProcessExecutor, ProcessOutput, ProcessRequest, TokioProcessExecutor};
pub use helper::{merge_dev_tools, MiseHelper};
pub use injection::{inject_env, needs_customization, Injection};
pub use session::SessionKey;
pub use stderr::parse_stderr;
pub use warmer::HelperWarmer;
