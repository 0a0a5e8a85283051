use misebridge_command::MiseHelper;
use std::process::ExitCode;

pub async fn execute(helper: &MiseHelper) -> eyre::Result<ExitCode> {
    let executables = helper.executables();
    let settings = executables.settings();
    let info = executables.executable_info().await;

    let origin = if settings.project_executable().is_some() {
        "project setting"
    } else if settings.app_executable().is_some() {
        "application setting"
    } else {
        "auto-detected"
    };
    println!("path:    {}", info.path);
    match &info.version {
        Some(version) => println!("version: {version}"),
        None => println!("version: unknown"),
    }
    println!("source:  {origin}");
    Ok(ExitCode::SUCCESS)
}
