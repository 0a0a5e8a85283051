use misebridge_project::Project;
use std::process::ExitCode;
use tracing::info;

pub async fn execute(project: &Project) -> eyre::Result<ExitCode> {
    if !project.is_watching() {
        eyre::bail!("file watching could not be started for {}", project.work_dir().display());
    }

    let _subscription = project.events().subscribe(|event| {
        println!("{}: {}", event.kind, event.reason);
    });
    info!("Watching {} (Ctrl-C to stop)", project.work_dir().display());

    tokio::signal::ctrl_c().await?;
    Ok(ExitCode::SUCCESS)
}
