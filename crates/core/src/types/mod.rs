//! Values decoded from `mise` output and resolved from config files.

mod dev_tool;
mod env;
mod executable;
mod task;
mod version;

pub use dev_tool::{DevTool, DevToolName, DevToolSource, DevTools, DevToolsScope};
pub use env::{EnvVarExtended, EnvVars, EnvVarsExtended};
pub use executable::{is_bare_command, ExecutableInfo};
pub use task::{same_ui_content, MiseTask, TaskKind};
pub use version::MiseVersion;

use serde::{Deserialize, Deserializer};

/// Accepts either a single value or a list where a list is expected.
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
        OneOrMany::Null(()) => Vec::new(),
    })
}
