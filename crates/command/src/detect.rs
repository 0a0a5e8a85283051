//! Locating and verifying the `mise` executable.
//!
//! A candidate is probed with `version -vv`, whose debug output names the
//! binary that actually ran (`MISE_BIN:`). That path is then probed on its
//! own, and only a second successful probe is trusted. Failing that, a short
//! list of well-known install locations is tried the same way.

use crate::executor::{ProcessExecutor, ProcessRequest};
use misebridge_core::{
    is_bare_command, ExecutableInfo, MiseVersion, ENV_CUSTOMIZATION_SKIPPED, ENV_CUSTOMIZATION_VAR,
    VERSION_PROBE_ARGS, VERSION_PROBE_TIMEOUT,
};
use misebridge_shell::{to_linux_path_or_self, wsl_command_prefix, HostPlatform, ProjectInfo};
use misebridge_utils::{expand_home, is_executable_file};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

const MISE_BIN_MARKER: &str = "MISE_BIN:";

/// What one version probe revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionProbe {
    pub resolved_path: Option<String>,
    pub version: Option<MiseVersion>,
}

/// Parse the combined output of `mise version -vv`.
pub fn parse_probe_output(output: &str, home: &Path) -> VersionProbe {
    let resolved_path = output
        .lines()
        .find(|line| line.contains(MISE_BIN_MARKER))
        .and_then(|line| line.split_once(MISE_BIN_MARKER))
        .map(|(_, rest)| rest.trim())
        .filter(|path| !path.is_empty())
        .map(|path| expand_home(path, home));

    VersionProbe {
        resolved_path,
        version: MiseVersion::find_in_output(output),
    }
}

/// Shell prefix and fallback locations for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    shell_prefix: Vec<String>,
    fallbacks: Vec<String>,
}

pub struct ExecutableDetector {
    executor: Arc<dyn ProcessExecutor>,
    info: Arc<ProjectInfo>,
    probe_timeout: Duration,
}

impl ExecutableDetector {
    pub fn new(executor: Arc<dyn ProcessExecutor>, info: Arc<ProjectInfo>) -> Self {
        Self {
            executor,
            info,
            probe_timeout: VERSION_PROBE_TIMEOUT,
        }
    }

    /// Best-effort info for `exe`. Never fails: when nothing can be verified
    /// the result is `exe` itself with no version.
    pub async fn detect_executable_info(&self, exe: &str) -> ExecutableInfo {
        match self.detect_on_host(exe).await {
            Some(info) => info,
            None => ExecutableInfo::new(exe, None),
        }
    }

    async fn detect_on_host(&self, exe: &str) -> Option<ExecutableInfo> {
        let work_dir = self.info.work_dir.to_string_lossy();
        if work_dir.trim().is_empty() {
            warn!("Cannot detect mise without a project directory");
            return None;
        }
        let route = self.route()?;
        trace!(work_dir = %work_dir, platform = %self.info.platform, "Detecting mise executable");
        self.detect_and_verify(exe, &route).await
    }

    fn route(&self) -> Option<Route> {
        let home = &self.info.user_home;
        let shell = self.info.shell_path.clone();
        match (&self.info.platform, shell) {
            (HostPlatform::Wsl { .. } | HostPlatform::Unix, Some(shell)) => Some(Route {
                shell_prefix: vec![shell, "-l".to_string(), "-c".to_string()],
                fallbacks: [expand_home("~/.local/bin/mise", home)]
                    .into_iter()
                    .filter(|path| is_executable_file(Path::new(path)))
                    .collect(),
            }),
            (HostPlatform::Windows, shell) => Some(Route {
                shell_prefix: shell
                    .map(|shell| vec![shell, "/c".to_string()])
                    .unwrap_or_default(),
                fallbacks: vec![
                    expand_home("~/AppData/Local/Microsoft/WinGet/Links/mise.exe", home),
                    expand_home("~/scoop/apps/mise/current/bin/mise.exe", home),
                ],
            }),
            (platform, None) => {
                warn!(platform = %platform, "Could not determine shell for mise detection");
                None
            }
        }
    }

    async fn detect_and_verify(&self, exe: &str, route: &Route) -> Option<ExecutableInfo> {
        if let Some(info) = self.verify_candidate(exe, route).await {
            return Some(info);
        }
        for candidate in &route.fallbacks {
            if let Some(info) = self.verify_candidate(candidate, route).await {
                info!(path = %info.path, "Detected mise at fallback path");
                return Some(info);
            }
        }
        None
    }

    /// Probe `exe`, then probe the binary it reports.
    async fn verify_candidate(&self, exe: &str, route: &Route) -> Option<ExecutableInfo> {
        let detected = self.probe(exe, &route.shell_prefix).await?;
        let detected_path = detected.resolved_path?;

        match self.probe(&detected_path, &route.shell_prefix).await {
            Some(verified) => Some(ExecutableInfo::new(
                verified.resolved_path.unwrap_or(detected_path),
                verified.version.or(detected.version),
            )),
            None => {
                warn!(path = %detected_path, "Detected mise but verification failed");
                None
            }
        }
    }

    /// Argument vector of a version probe.
    ///
    /// Bare commands go through the login shell so its PATH applies. Paths
    /// are run directly.
    pub fn probe_argv(&self, exe: &str, shell_prefix: &[String]) -> Vec<String> {
        let mut argv = Vec::new();
        if let Some(distribution) = self.info.wsl_distribution() {
            argv.extend(wsl_command_prefix(distribution));
        }
        if is_bare_command(exe) && !shell_prefix.is_empty() {
            let native = to_linux_path_or_self(exe);
            let command = std::iter::once(native.as_str())
                .chain(VERSION_PROBE_ARGS)
                .collect::<Vec<_>>()
                .join(" ");
            argv.extend(shell_prefix.iter().cloned());
            argv.push(command);
        } else {
            let exe = match self.info.wsl_distribution() {
                Some(_) => to_linux_path_or_self(exe),
                None => exe.to_string(),
            };
            argv.push(exe);
            argv.extend(VERSION_PROBE_ARGS.iter().map(|arg| arg.to_string()));
        }
        argv
    }

    async fn probe(&self, exe: &str, shell_prefix: &[String]) -> Option<VersionProbe> {
        let request = ProcessRequest::new(self.probe_argv(exe, shell_prefix), self.probe_timeout)
            .work_dir(&self.info.work_dir)
            .env(ENV_CUSTOMIZATION_VAR, ENV_CUSTOMIZATION_SKIPPED);
        let command = request.command_line();

        let output = match self.executor.run(request).await {
            Ok(output) => output,
            Err(e) => {
                debug!(exe, "Version probe could not start: {e}");
                return None;
            }
        };
        if !output.is_success() {
            debug!(
                exe,
                exit_code = ?output.exit_code,
                timed_out = output.timed_out,
                "Version probe failed"
            );
            return None;
        }

        let combined = format!("{}\n{}", output.stderr, output.stdout);
        trace!(command = %command, "{combined}");
        Some(parse_probe_output(&combined, &self.info.user_home))
    }
}
