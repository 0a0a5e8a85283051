use misebridge_project::Project;
use std::process::ExitCode;

pub async fn execute(project: &Project, json: bool) -> eyre::Result<ExitCode> {
    let environment = project.helper().configured_environment();
    let tasks = project
        .tasks()
        .compute_tasks(environment.as_deref())
        .await
        .unwrap_or_default();

    if json {
        println!("{}", serde_json::to_string_pretty(tasks.as_slice())?);
        return Ok(ExitCode::SUCCESS);
    }

    let width = tasks.iter().map(|task| task.name.len()).max().unwrap_or(0);
    for task in tasks.iter().filter(|task| !task.hide) {
        let detail = task
            .description
            .as_deref()
            .or(task.source.as_deref())
            .unwrap_or_default();
        println!("{:<width$}  {detail}", task.name);
    }
    Ok(ExitCode::SUCCESS)
}
