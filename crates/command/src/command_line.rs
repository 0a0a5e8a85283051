//! Building and running one `mise` invocation.

use crate::executor::{ProcessExecutor, ProcessRequest};
use crate::session::SessionKey;
use crate::stderr::parse_stderr;
use misebridge_core::{
    CommandError, CommandResult, ExecutableInfo, MiseVersion, COMMAND_TIMEOUT,
    ENV_CUSTOMIZATION_SKIPPED, ENV_CUSTOMIZATION_VAR, SESSION_CACHE_KEY_VAR,
};
use misebridge_shell::{to_linux_path_or_self, wsl_command_prefix, ProjectInfo};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Everything an invocation needs besides its arguments, shared by a project.
#[derive(Clone)]
pub struct CommandContext {
    pub executor: Arc<dyn ProcessExecutor>,
    pub info: Arc<ProjectInfo>,
    pub session_key: SessionKey,
    pub timeout: Duration,
}

impl CommandContext {
    pub fn new(executor: Arc<dyn ProcessExecutor>, info: Arc<ProjectInfo>) -> Self {
        Self {
            executor,
            info,
            session_key: SessionKey::generate(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Project directory in cache-key form.
    pub fn work_dir_key(&self) -> String {
        misebridge_utils::normalize_path(&self.info.work_dir)
    }

    pub fn command_line(
        &self,
        executable: ExecutableInfo,
        config_environment: Option<&str>,
    ) -> MiseCommandLine {
        MiseCommandLine {
            context: self.clone(),
            executable,
            config_environment: config_environment
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        }
    }
}

/// `mise` with a resolved executable and config environment.
pub struct MiseCommandLine {
    context: CommandContext,
    executable: ExecutableInfo,
    config_environment: Option<String>,
}

impl MiseCommandLine {
    pub fn executable(&self) -> &ExecutableInfo {
        &self.executable
    }

    /// Full argument vector for `params`.
    ///
    /// `--env` is used from 2024.12.2 on and `--profile` before. `--offline`
    /// trails the params and is dropped for versions that lack it.
    pub fn argv(&self, params: &[&str], offline: bool) -> Vec<String> {
        let version = self.executable.version_or_zero();
        let mut argv = Vec::new();

        let parts = self.executable.parts();
        match self.context.info.wsl_distribution() {
            Some(distribution) => {
                argv.extend(wsl_command_prefix(distribution));
                argv.extend(parts.iter().map(|part| to_linux_path_or_self(part)));
            }
            None => argv.extend(parts),
        }

        if let Some(environment) = &self.config_environment {
            let flag = if version >= MiseVersion::ENV_FLAG {
                "--env"
            } else {
                "--profile"
            };
            argv.push(flag.to_string());
            argv.push(environment.clone());
        }

        argv.extend(params.iter().map(|param| param.to_string()));

        if offline && version >= MiseVersion::OFFLINE_FLAG {
            argv.push("--offline".to_string());
        }
        argv
    }

    fn request(&self, params: &[&str], offline: bool) -> ProcessRequest {
        let mut request = ProcessRequest::new(self.argv(params, offline), self.context.timeout)
            .work_dir(&self.context.info.work_dir)
            .env(SESSION_CACHE_KEY_VAR, self.context.session_key.as_str())
            .env(ENV_CUSTOMIZATION_VAR, ENV_CUSTOMIZATION_SKIPPED);
        if self.context.info.wsl_distribution().is_some() {
            // Forward our variables into the distribution
            request = request.env(
                "WSLENV",
                format!("{SESSION_CACHE_KEY_VAR}/u:{ENV_CUSTOMIZATION_VAR}/u"),
            );
        }
        request
    }

    /// Run and return stdout.
    pub async fn run_text(&self, params: &[&str], offline: bool) -> CommandResult<String> {
        let request = self.request(params, offline);
        let command = request.command_line();
        trace!(command = %command, "Running mise");

        let output = match self.context.executor.run(request).await {
            Ok(output) => output,
            Err(e) => {
                info!(command = %command, "Failed to execute mise: {e}");
                return Err(CommandError::not_found(command, e.to_string()));
            }
        };

        if output.timed_out {
            debug!(command = %command, "mise timed out");
            return Err(CommandError::TimedOut {
                command,
                timeout: self.context.timeout,
            });
        }

        match output.exit_code {
            Some(0) => Ok(output.stdout),
            Some(code) => {
                debug!(command = %command, exit_code = code, stderr = %output.stderr.trim_end(), "mise failed");
                Err(parse_stderr(&command, &output.stderr))
            }
            None => Err(CommandError::Cancelled { command }),
        }
    }

    /// Run and decode stdout as JSON.
    pub async fn run_json<T: DeserializeOwned>(&self, params: &[&str], offline: bool) -> CommandResult<T> {
        let stdout = self.run_text(params, offline).await?;
        serde_json::from_str(&stdout).map_err(|e| {
            CommandError::decode(shell_words::join(self.argv(params, offline)), e.to_string())
        })
    }

    /// Run and return the trimmed, non-empty stdout lines.
    pub async fn run_lines(&self, params: &[&str]) -> CommandResult<Vec<String>> {
        let stdout = self.run_text(params, false).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
