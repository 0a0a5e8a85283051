use misebridge_command::{inject_env, Injection, MiseHelper};
use misebridge_project::Project;
use std::collections::BTreeMap;
use std::process::{ExitCode, Stdio};
use tokio::process::Command;
use tracing::{debug, warn};

pub async fn execute(
    helper: &MiseHelper,
    project: &Project,
    command: Vec<String>,
) -> eyre::Result<ExitCode> {
    let Some((program, args)) = command.split_first() else {
        eyre::bail!("no command given");
    };

    let mut env: BTreeMap<String, String> = std::env::vars().collect();
    match inject_env(helper, &command, &mut env).await {
        Injection::Injected(count) => debug!(count, "Running {program} with mise environment"),
        Injection::AlreadyCustomized => debug!("Environment already customized, running as is"),
        Injection::MiseCommand => debug!("Running mise itself without injection"),
        Injection::Failed(reason) => warn!("Running {program} without mise environment: {reason}"),
    }

    let status = Command::new(program)
        .args(args)
        .env_clear()
        .envs(&env)
        .current_dir(project.work_dir())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| eyre::eyre!("failed to run {program}: {e}"))?;

    Ok(ExitCode::from(exit_status(status.code())))
}

/// Signal-terminated children report no code.
fn exit_status(code: Option<i32>) -> u8 {
    match code {
        Some(code) => u8::try_from(code).unwrap_or(1),
        None => 1,
    }
}
