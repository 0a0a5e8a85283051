use clap::Subcommand;
use eyre::eyre;
use misebridge_core::{Cancelled, CommandError, CommandResult, DevToolsScope};
use misebridge_project::Project;
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod env;
mod exec;
mod executable;
mod tasks;
mod tools;
mod watch;

#[derive(Subcommand)]
pub enum Commands {
    /// Print the project's mise environment variables
    Env {
        /// Include where each variable came from; redacted values are hidden
        #[arg(long)]
        extended: bool,

        /// Print JSON instead of KEY=value lines
        #[arg(long)]
        json: bool,
    },

    /// List dev tools
    Tools {
        /// Which configs to consider: local, global, current or combined
        #[arg(long, default_value = "combined")]
        scope: DevToolsScope,

        #[arg(long)]
        json: bool,
    },

    /// List tasks found in configs, task files and task directories
    Tasks {
        #[arg(long)]
        json: bool,
    },

    /// Print the path of a tool binary as mise resolves it
    Which {
        /// Binary name, e.g. node
        bin: String,
    },

    /// Show which mise executable is used and its version
    Executable,

    /// Inspect mise configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Trust a mise config file
    Trust {
        /// Config file to trust
        path: PathBuf,
    },

    /// Print project events until interrupted
    Watch,

    /// Run a command with the project's mise environment
    Exec {
        /// Command and arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Config files mise loaded for this directory
    Tracked,

    /// Value of a setting in the project config
    Get {
        /// Dotted key, e.g. tools.node
        key: String,
    },
}

impl Commands {
    /// Whether the project should watch its files while this command runs.
    pub fn watches_files(&self) -> bool {
        matches!(self, Commands::Watch)
    }

    pub async fn execute(self, project: &Project) -> eyre::Result<ExitCode> {
        let helper = project.helper();
        match self {
            Commands::Env { extended, json } => env::execute(helper, extended, json).await,
            Commands::Tools { scope, json } => tools::execute(helper, scope, json).await,
            Commands::Tasks { json } => tasks::execute(project, json).await,
            Commands::Which { bin } => {
                let environment = helper.configured_environment();
                let path = resolved(helper.which_bin(&bin, environment.as_deref()).await)?;
                println!("{path}");
                Ok(ExitCode::SUCCESS)
            }
            Commands::Executable => executable::execute(helper).await,
            Commands::Config { command } => config::execute(helper, command).await,
            Commands::Trust { path } => {
                let environment = helper.configured_environment();
                let path = std::fs::canonicalize(&path).unwrap_or(path);
                let path = path.to_string_lossy();
                completed(helper.trust_config_file(&path, environment.as_deref()).await)?;
                println!("Trusted {path}");
                Ok(ExitCode::SUCCESS)
            }
            Commands::Watch => watch::execute(project).await,
            Commands::Exec { command } => exec::execute(helper, project, command).await,
        }
    }
}

const NOT_FOUND_HINT: &str =
    "hint: install mise (https://mise.jdx.dev) or point --executable at it";

/// Unwrap a cached command result for printing.
pub(crate) fn resolved<T>(result: Result<CommandResult<T>, Cancelled>) -> eyre::Result<T> {
    match result {
        Ok(outcome) => completed(outcome),
        Err(cancelled) => Err(cancelled.into()),
    }
}

pub(crate) fn completed<T>(result: CommandResult<T>) -> eyre::Result<T> {
    result.map_err(|e| match e {
        e @ CommandError::NotFound { .. } => eyre!("{e}\n{NOT_FOUND_HINT}"),
        e => e.into(),
    })
}
