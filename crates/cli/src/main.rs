use clap::Parser;
use misebridge_config::SettingsLoader;
use misebridge_project::{Project, ProjectOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;

mod commands;

use commands::Commands;

#[derive(Parser)]
#[command(name = "misebridge")]
#[command(about = "Query mise environments, tools and tasks for a project", long_about = None)]
#[command(version)]
struct Cli {
    /// Project directory
    #[arg(short = 'C', long = "directory", default_value = ".", global = true)]
    directory: PathBuf,

    /// mise config environment (MISE_ENV)
    #[arg(short = 'e', long = "env", global = true)]
    environment: Option<String>,

    /// Path to the mise executable
    #[arg(long, global = true)]
    executable: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = misebridge_utils::tracing::init(cli.log_level()) {
        eprintln!("misebridge: failed to initialise logging: {e}");
    }

    let work_dir = std::fs::canonicalize(&cli.directory).unwrap_or_else(|_| cli.directory.clone());
    let settings = SettingsLoader::new()
        .project_dir(&work_dir)
        .executable_path(cli.executable.clone())
        .config_environment(cli.environment.clone())
        .load()?;

    let options = ProjectOptions::new().watch_files(cli.command.watches_files());
    let project = Project::open(&work_dir, settings, options)?;
    let span = misebridge_utils::tracing::project_span(project.name(), &work_dir.to_string_lossy());

    let result = cli.command.execute(&project).instrument(span).await;
    project.dispose();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["misebridge", "env", "--json", "-e", "ci", "-vv"]).unwrap();
        assert_eq!(cli.environment.as_deref(), Some("ci"));
        assert_eq!(cli.log_level(), "trace");
        assert_eq!(cli.directory, PathBuf::from("."));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["misebridge"]).is_err());
    }
}
