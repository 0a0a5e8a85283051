use super::resolved;
use misebridge_command::MiseHelper;
use misebridge_core::{DevToolName, DevToolsScope};
use std::process::ExitCode;

pub async fn execute(helper: &MiseHelper, scope: DevToolsScope, json: bool) -> eyre::Result<ExitCode> {
    let environment = helper.configured_environment();
    let tools = resolved(helper.dev_tools(scope, environment.as_deref()).await)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(ExitCode::SUCCESS);
    }
    for (name, versions) in &tools {
        let display = DevToolName::new(name.as_str());
        for tool in versions {
            let state = if !tool.installed {
                " (missing)"
            } else if tool.active {
                ""
            } else {
                " (inactive)"
            };
            let source = tool
                .source
                .as_ref()
                .map(|source| format!("\t{}", source.absolute_path))
                .unwrap_or_default();
            println!("{display} {}{state}{source}", tool.version);
        }
    }
    Ok(ExitCode::SUCCESS)
}
