use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output of `mise env --json`.
pub type EnvVars = BTreeMap<String, String>;

/// Output of `mise env --json-extended`, with redaction applied.
pub type EnvVarsExtended = BTreeMap<String, EnvVarExtended>;

/// A variable together with where it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvVarExtended {
    pub value: String,
    pub source: Option<String>,
    pub tool: Option<String>,
    /// Set when `mise env --redacted` lists the key.
    #[serde(skip_deserializing)]
    pub redacted: bool,
}
