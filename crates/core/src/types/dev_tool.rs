use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One installed or requested tool version, as printed by `mise ls --json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevTool {
    pub version: String,
    pub requested_version: Option<String>,
    pub install_path: Option<String>,
    pub installed: bool,
    pub active: bool,
    pub source: Option<DevToolSource>,
    /// Executable that produced this entry. Filled in after decoding.
    #[serde(skip)]
    pub executable_path: Option<String>,
}

/// Config file that requested a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevToolSource {
    #[serde(rename = "type")]
    pub file_name: String,
    #[serde(rename = "path")]
    pub absolute_path: String,
}

/// Tools keyed by short name (`node`, `python`, ...).
pub type DevTools = BTreeMap<String, Vec<DevTool>>;

/// Tool name with a human-friendly rendering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DevToolName(String);

impl DevToolName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display name for well-known tools, the raw name otherwise.
    ///
    /// Backend prefixes such as `aqua:` or `core:` are ignored for lookup.
    pub fn canonical_name(&self) -> String {
        let short = self.0.rsplit(':').next().unwrap_or(&self.0);
        let known = match short {
            "node" | "nodejs" => "Node.js",
            "python" => "Python",
            "go" | "golang" => "Go",
            "java" => "Java",
            "ruby" => "Ruby",
            "rust" => "Rust",
            "bun" => "Bun",
            "deno" => "Deno",
            "erlang" => "Erlang",
            "elixir" => "Elixir",
            "zig" => "Zig",
            "swift" => "Swift",
            "php" => "PHP",
            "dotnet" => ".NET",
            "terraform" => "Terraform",
            _ => return self.0.clone(),
        };
        known.to_string()
    }
}

impl fmt::Display for DevToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}

/// Which config files `mise ls` should consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevToolsScope {
    Local,
    Global,
    Current,
    /// Global tools overridden by local ones, per tool.
    Combined,
}

impl DevToolsScope {
    pub fn cache_key_segment(&self) -> &'static str {
        match self {
            DevToolsScope::Local => "local",
            DevToolsScope::Global => "global",
            DevToolsScope::Current => "current",
            DevToolsScope::Combined => "combined",
        }
    }

    pub fn command_flag(&self) -> Option<&'static str> {
        match self {
            DevToolsScope::Local => Some("--local"),
            DevToolsScope::Global => Some("--global"),
            DevToolsScope::Current => Some("--current"),
            DevToolsScope::Combined => None,
        }
    }

    /// Flag for a scope that maps onto a single `mise ls` call.
    pub fn require_flag(&self) -> crate::Result<&'static str> {
        self.command_flag().ok_or_else(|| {
            crate::Error::unsupported(
                "dev tools scope",
                format!("'{}' has no single command flag", self.cache_key_segment()),
            )
        })
    }

    pub fn progress_title(&self) -> &'static str {
        match self {
            DevToolsScope::Local => "Loading Mise Dev Tools (Local)",
            DevToolsScope::Global => "Loading Mise Dev Tools (Global)",
            DevToolsScope::Current => "Loading Mise Dev Tools (Current)",
            DevToolsScope::Combined => "Loading Mise Dev Tools",
        }
    }
}

impl std::str::FromStr for DevToolsScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(DevToolsScope::Local),
            "global" => Ok(DevToolsScope::Global),
            "current" => Ok(DevToolsScope::Current),
            "combined" => Ok(DevToolsScope::Combined),
            other => Err(format!("unknown dev tools scope '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ls_output() {
        let json = r#"{
            "node": [{
                "version": "20.11.0",
                "requested_version": "20",
                "install_path": "/home/me/.local/share/mise/installs/node/20.11.0",
                "source": {"type": "mise.toml", "path": "/work/mise.toml"},
                "installed": true,
                "active": true,
                "symlinked_to": null
            }]
        }"#;
        let tools: DevTools = serde_json::from_str(json).unwrap();
        let node = &tools["node"][0];
        assert_eq!(node.version, "20.11.0");
        assert_eq!(node.requested_version.as_deref(), Some("20"));
        assert!(node.installed && node.active);
        let source = node.source.as_ref().unwrap();
        assert_eq!(source.file_name, "mise.toml");
        assert_eq!(source.absolute_path, "/work/mise.toml");
        assert!(node.executable_path.is_none());
    }

    #[test]
    fn test_canonical_names() {
        assert_eq!(DevToolName::new("node").canonical_name(), "Node.js");
        assert_eq!(DevToolName::new("core:python").canonical_name(), "Python");
        assert_eq!(DevToolName::new("aqua:cli/cli").to_string(), "aqua:cli/cli");
    }

    #[test]
    fn test_combined_scope_has_no_flag() {
        assert_eq!(DevToolsScope::Local.require_flag().unwrap(), "--local");
        assert!(DevToolsScope::Combined.require_flag().is_err());
        assert_eq!("global".parse::<DevToolsScope>(), Ok(DevToolsScope::Global));
    }
}
