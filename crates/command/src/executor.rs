//! Subprocess seam
//!
//! Everything that spawns `mise` goes through [`ProcessExecutor`], so tests
//! can script process behaviour without a real binary.

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::trace;

/// One process to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    pub argv: Vec<String>,
    pub work_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

impl ProcessRequest {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self {
            argv,
            work_dir: None,
            env: Vec::new(),
            timeout,
        }
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Printable form used in logs and error values.
    pub fn command_line(&self) -> String {
        shell_words::join(&self.argv)
    }
}

/// Captured result of a finished (or abandoned) process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed or never exited.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    pub fn timed_out() -> Self {
        Self {
            timed_out: true,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Run the request to completion or until its timeout.
    ///
    /// `Err` means the process could not be started.
    async fn run(&self, request: ProcessRequest) -> io::Result<ProcessOutput>;
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessExecutor;

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn run(&self, request: ProcessRequest) -> io::Result<ProcessOutput> {
        let (program, args) = request
            .argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &request.work_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn()?;
        trace!(pid = ?child.id(), command = %request.command_line(), "Spawned");

        match timeout(request.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ProcessOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                timed_out: false,
            }),
            Ok(Err(e)) => Err(e),
            // Dropping the child kills it
            Err(_) => Ok(ProcessOutput::timed_out()),
        }
    }
}
