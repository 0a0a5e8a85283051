//! Baseline project context, computed once when a project opens.

use crate::wsl;
use misebridge_utils::normalize_path;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where mise runs for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPlatform {
    Unix,
    Windows,
    /// Project lives inside a WSL distribution; mise runs there.
    Wsl { distribution: String },
}

impl HostPlatform {
    pub fn is_windows(&self) -> bool {
        matches!(self, HostPlatform::Windows)
    }

    pub fn wsl_distribution(&self) -> Option<&str> {
        match self {
            HostPlatform::Wsl { distribution } => Some(distribution),
            _ => None,
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPlatform::Unix => write!(f, "unix"),
            HostPlatform::Windows => write!(f, "windows"),
            HostPlatform::Wsl { distribution } => write!(f, "wsl:{distribution}"),
        }
    }
}

/// Shell, home directory and WSL distribution of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub work_dir: PathBuf,
    /// Home as the host sees it. Under WSL this is a UNC path when the
    /// project sits in a Linux home directory.
    pub user_home: PathBuf,
    pub shell_path: Option<String>,
    pub platform: HostPlatform,
}

impl ProjectInfo {
    /// Detect the context of `work_dir` on the current host
    pub fn detect(work_dir: impl Into<PathBuf>) -> Self {
        Self::detect_with(
            work_dir.into(),
            cfg!(windows),
            |name| std::env::var(name).ok(),
            dirs::home_dir(),
        )
    }

    /// Detection against an explicit host description
    pub fn detect_with(
        work_dir: PathBuf,
        windows: bool,
        env: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Self {
        let host_home = home.unwrap_or_else(|| PathBuf::from("/"));
        let non_blank = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        let work_dir_text = normalize_path(&work_dir);

        let info = match wsl_distribution_of(&work_dir_text, windows) {
            Some(parsed) => {
                let user_home = linux_home(&parsed.linux_path)
                    .map(|home| PathBuf::from(wsl::to_unc(&parsed.distribution, &home)))
                    .unwrap_or(host_home);
                Self {
                    work_dir,
                    user_home,
                    shell_path: Some("/bin/bash".to_string()),
                    platform: HostPlatform::Wsl {
                        distribution: parsed.distribution,
                    },
                }
            }
            None if windows => Self {
                work_dir,
                user_home: host_home,
                shell_path: Some(
                    non_blank("SHELL")
                        .or_else(|| non_blank("ComSpec"))
                        .unwrap_or_else(|| "cmd".to_string()),
                ),
                platform: HostPlatform::Windows,
            },
            None => Self {
                work_dir,
                user_home: host_home,
                shell_path: non_blank("SHELL").or_else(login_shell_on_path),
                platform: HostPlatform::Unix,
            },
        };

        debug!(
            platform = %info.platform,
            user_home = %info.user_home.display(),
            shell = info.shell_path.as_deref().unwrap_or("null"),
            "Project info detected"
        );
        info
    }

    pub fn wsl_distribution(&self) -> Option<&str> {
        self.platform.wsl_distribution()
    }

    /// Directory mise should run in, in the form the executing side expects.
    pub fn exec_work_dir(&self) -> String {
        let text = self.work_dir.to_string_lossy();
        match self.platform {
            HostPlatform::Wsl { .. } => wsl::to_linux_path_or_self(&text),
            _ => text.into_owned(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

fn wsl_distribution_of(work_dir: &str, windows: bool) -> Option<wsl::WslPath> {
    // `\\wsl$\` paths only exist on a Windows host
    if !windows {
        return None;
    }
    wsl::parse_unc(work_dir)
}

/// `/home/<user>` (or `/root`) prefix of a Linux path.
fn linux_home(linux_path: &str) -> Option<String> {
    let mut parts = linux_path.trim_start_matches('/').split('/');
    match (parts.next(), parts.next()) {
        (Some("root"), _) => Some("/root".to_string()),
        (Some("home"), Some(user)) if !user.is_empty() => Some(format!("/home/{user}")),
        _ => None,
    }
}

fn login_shell_on_path() -> Option<String> {
    ["bash", "sh"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
        .map(|path| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_unix_uses_shell_env() {
        let info = ProjectInfo::detect_with(
            PathBuf::from("/work/app"),
            false,
            env_of(&[("SHELL", "/usr/bin/zsh")]),
            Some(PathBuf::from("/home/dev")),
        );
        assert_eq!(info.platform, HostPlatform::Unix);
        assert_eq!(info.shell_path.as_deref(), Some("/usr/bin/zsh"));
        assert_eq!(info.user_home, PathBuf::from("/home/dev"));
        assert_eq!(info.exec_work_dir(), "/work/app");
    }

    #[test]
    fn test_windows_defaults_to_cmd() {
        let info = ProjectInfo::detect_with(
            PathBuf::from(r"C:\work\app"),
            true,
            env_of(&[]),
            Some(PathBuf::from(r"C:\Users\dev")),
        );
        assert_eq!(info.platform, HostPlatform::Windows);
        assert_eq!(info.shell_path.as_deref(), Some("cmd"));
        assert!(info.wsl_distribution().is_none());

        let with_comspec = ProjectInfo::detect_with(
            PathBuf::from(r"C:\work\app"),
            true,
            env_of(&[("ComSpec", r"C:\Windows\system32\cmd.exe")]),
            None,
        );
        assert_eq!(
            with_comspec.shell_path.as_deref(),
            Some(r"C:\Windows\system32\cmd.exe")
        );
    }

    #[test]
    fn test_wsl_project_routes_through_distribution() {
        let info = ProjectInfo::detect_with(
            PathBuf::from(r"\\wsl.localhost\Ubuntu\home\dev\src\app"),
            true,
            env_of(&[]),
            Some(PathBuf::from(r"C:\Users\dev")),
        );
        assert_eq!(info.wsl_distribution(), Some("Ubuntu"));
        assert_eq!(info.shell_path.as_deref(), Some("/bin/bash"));
        assert_eq!(
            info.user_home,
            PathBuf::from(r"\\wsl.localhost\Ubuntu\home\dev")
        );
        assert_eq!(info.exec_work_dir(), "/home/dev/src/app");
    }

    #[test]
    fn test_wsl_paths_ignored_off_windows() {
        let info = ProjectInfo::detect_with(
            PathBuf::from(r"\\wsl$\Ubuntu\srv\app"),
            false,
            env_of(&[("SHELL", "/bin/sh")]),
            Some(PathBuf::from("/home/dev")),
        );
        assert_eq!(info.platform, HostPlatform::Unix);
    }

    #[test]
    fn test_linux_home() {
        assert_eq!(linux_home("/home/dev/src").as_deref(), Some("/home/dev"));
        assert_eq!(linux_home("/root/app").as_deref(), Some("/root"));
        assert_eq!(linux_home("/srv/app"), None);
        assert_eq!(linux_home("/home"), None);
    }
}
