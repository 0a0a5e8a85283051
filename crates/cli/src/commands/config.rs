use super::{resolved, ConfigCommands};
use misebridge_command::MiseHelper;
use std::process::ExitCode;

pub async fn execute(helper: &MiseHelper, command: ConfigCommands) -> eyre::Result<ExitCode> {
    match command {
        ConfigCommands::Tracked => {
            for path in resolved(helper.tracked_configs().await)? {
                println!("{path}");
            }
        }
        ConfigCommands::Get { key } => {
            let environment = helper.configured_environment();
            let value = resolved(helper.config_get(&key, environment.as_deref()).await)?;
            println!("{value}");
        }
    }
    Ok(ExitCode::SUCCESS)
}
