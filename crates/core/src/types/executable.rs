use super::MiseVersion;
use crate::constants::DEFAULT_EXECUTABLE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resolved location and version of the `mise` executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutableInfo {
    pub path: String,
    pub version: Option<MiseVersion>,
}

impl ExecutableInfo {
    pub fn new(path: impl Into<String>, version: Option<MiseVersion>) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }

    /// Bare `mise`, left to `PATH` at invocation time.
    pub fn fallback() -> Self {
        Self::new(DEFAULT_EXECUTABLE, None)
    }

    pub fn version_or_zero(&self) -> MiseVersion {
        self.version.unwrap_or(MiseVersion::ZERO)
    }

    /// Argument vector prefix for this executable.
    ///
    /// A path naming an existing file is used as one argument even if it has
    /// spaces. Paths with backslashes are split on whitespace only so Windows
    /// separators survive.
    pub fn parts(&self) -> Vec<String> {
        let path = self.path.trim();
        if path.is_empty() {
            return Vec::new();
        }
        if Path::new(path).is_file() {
            return vec![path.to_string()];
        }
        if path.contains('\\') {
            return path.split_whitespace().map(str::to_string).collect();
        }
        shell_words::split(path)
            .unwrap_or_else(|_| path.split_whitespace().map(str::to_string).collect())
    }

    /// Whether `command_line` starts with this executable's parts.
    pub fn matches_command_line(&self, command_line: &[String]) -> bool {
        let parts = self.parts();
        !parts.is_empty() && command_line.len() >= parts.len() && command_line[..parts.len()] == parts[..]
    }

    /// True when the path has no directory component.
    pub fn is_bare_command(&self) -> bool {
        is_bare_command(&self.path)
    }
}

/// A command name without `/` or `\`, resolved through the shell.
pub fn is_bare_command(path: &str) -> bool {
    !path.contains('/') && !path.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_split_wrapped_commands() {
        let info = ExecutableInfo::new("wsl.exe -d Ubuntu mise", None);
        assert_eq!(info.parts(), vec!["wsl.exe", "-d", "Ubuntu", "mise"]);

        let quoted = ExecutableInfo::new("\"/opt/my tools/mise\" --quiet", None);
        assert_eq!(quoted.parts(), vec!["/opt/my tools/mise", "--quiet"]);
    }

    #[test]
    fn test_parts_keep_windows_separators() {
        let info = ExecutableInfo::new(r"C:\Users\me\scoop\shims\mise.exe", None);
        assert_eq!(info.parts(), vec![r"C:\Users\me\scoop\shims\mise.exe"]);
    }

    #[test]
    fn test_matches_command_line() {
        let info = ExecutableInfo::new("/usr/local/bin/mise", None);
        let line = vec![
            "/usr/local/bin/mise".to_string(),
            "exec".to_string(),
            "--".to_string(),
        ];
        assert!(info.matches_command_line(&line));
        assert!(!info.matches_command_line(&["mise".to_string()]));
        assert!(!ExecutableInfo::new("  ", None).matches_command_line(&line));
    }

    #[test]
    fn test_fallback_has_zero_version() {
        let info = ExecutableInfo::fallback();
        assert_eq!(info.path, "mise");
        assert!(info.is_bare_command());
        assert_eq!(info.version_or_zero(), MiseVersion::ZERO);
    }
}
