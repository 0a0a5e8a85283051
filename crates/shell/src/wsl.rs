//! Windows Subsystem for Linux path handling.
//!
//! A project opened from `\\wsl.localhost\<distro>\...` (or the legacy
//! `\\wsl$\<distro>\...`) runs mise inside that distribution. These helpers
//! translate between the UNC form Windows sees and the Linux form the
//! distribution sees.

use once_cell::sync::Lazy;
use regex::Regex;

static WSL_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"wsl(?:\.exe)?\s+-d\s+(?:"([^"]+)"|'([^']+)'|(\S+))"#)
        .expect("valid WSL command pattern")
});

const UNC_HOSTS: [&str; 2] = ["wsl.localhost", "wsl$"];

/// A path inside a WSL distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WslPath {
    pub distribution: String,
    /// Absolute Linux path, always starting with `/`.
    pub linux_path: String,
}

impl WslPath {
    pub fn to_unc(&self) -> String {
        to_unc(&self.distribution, &self.linux_path)
    }
}

/// Distribution named by a `wsl.exe -d <distro>` command line.
///
/// Accepts double-quoted, single-quoted and bare names.
pub fn distribution_from_command(command: &str) -> Option<String> {
    let captures = WSL_COMMAND.captures(command)?;
    (1..=3)
        .find_map(|i| captures.get(i))
        .map(|m| m.as_str().to_string())
}

/// Parse `\\wsl.localhost\<distro>\<path>` or `\\wsl$\<distro>\<path>`.
///
/// Forward slashes and mixed separators are accepted. Returns `None` for
/// anything that is not a WSL UNC path.
pub fn parse_unc(path: &str) -> Option<WslPath> {
    let path = path.trim();
    let normalized = path.replace('/', "\\");
    let rest = normalized.strip_prefix("\\\\")?;
    let (host, rest) = rest.split_once('\\').unwrap_or((rest, ""));
    if !UNC_HOSTS.iter().any(|h| h.eq_ignore_ascii_case(host)) {
        return None;
    }
    let (distribution, linux) = rest.split_once('\\').unwrap_or((rest, ""));
    if distribution.is_empty() {
        return None;
    }
    let linux = linux.trim_end_matches('\\').replace('\\', "/");
    Some(WslPath {
        distribution: distribution.to_string(),
        linux_path: format!("/{linux}"),
    })
}

/// Whether `path` points into a WSL distribution.
pub fn is_wsl_path(path: &str) -> bool {
    parse_unc(path).is_some() || distribution_from_command(path).is_some()
}

/// Linux form of a WSL UNC path.
pub fn to_linux_path(unc: &str) -> Option<String> {
    parse_unc(unc).map(|p| p.linux_path)
}

/// Linux form of `path` if it is a WSL UNC path, otherwise `path` itself.
pub fn to_linux_path_or_self(path: &str) -> String {
    to_linux_path(path).unwrap_or_else(|| path.to_string())
}

/// UNC form (`\\wsl.localhost\<distro>\...`) of a Linux path.
pub fn to_unc(distribution: &str, linux_path: &str) -> String {
    let relative = linux_path.trim_start_matches('/').replace('/', "\\");
    format!("\\\\wsl.localhost\\{distribution}\\{relative}")
}

/// Argument prefix that runs the following argv inside `distribution`.
pub fn wsl_command_prefix(distribution: &str) -> Vec<String> {
    ["wsl.exe", "-d", distribution, "--exec"]
        .into_iter()
        .map(str::to_string)
        .collect()
}
