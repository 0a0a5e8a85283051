use super::resolved;
use misebridge_command::MiseHelper;
use std::process::ExitCode;

const REDACTED: &str = "[redacted]";

pub async fn execute(helper: &MiseHelper, extended: bool, json: bool) -> eyre::Result<ExitCode> {
    let environment = helper.configured_environment();
    let environment = environment.as_deref();

    if extended {
        let mut vars = resolved(helper.env_vars_extended(environment).await)?;
        for var in vars.values_mut().filter(|var| var.redacted) {
            var.value = REDACTED.to_string();
        }
        if json {
            println!("{}", serde_json::to_string_pretty(&vars)?);
        } else {
            for (name, var) in &vars {
                match var.source.as_deref().or(var.tool.as_deref()) {
                    Some(origin) => println!("{name}={}\t# {origin}", var.value),
                    None => println!("{name}={}", var.value),
                }
            }
        }
    } else {
        let vars = resolved(helper.env_vars(environment).await)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&vars)?);
        } else {
            for (name, value) in &vars {
                println!("{name}={value}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
