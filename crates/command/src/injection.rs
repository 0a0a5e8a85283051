//! Injecting the mise environment into processes we launch.
//!
//! The marker variable records that an environment was already customised
//! (or deliberately skipped), so several injectors along one launch path
//! apply the variables at most once.

use crate::helper::MiseHelper;
use misebridge_core::{
    EnvVars, ENV_CUSTOMIZATION_DONE, ENV_CUSTOMIZATION_SKIPPED, ENV_CUSTOMIZATION_VAR,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub fn needs_customization(env: &BTreeMap<String, String>) -> bool {
    !matches!(
        env.get(ENV_CUSTOMIZATION_VAR).map(String::as_str),
        Some(ENV_CUSTOMIZATION_DONE | ENV_CUSTOMIZATION_SKIPPED)
    )
}

pub fn mark_customized(env: &mut BTreeMap<String, String>) {
    env.insert(ENV_CUSTOMIZATION_VAR.to_string(), ENV_CUSTOMIZATION_DONE.to_string());
}

pub fn mark_skipped(env: &mut BTreeMap<String, String>) {
    env.insert(ENV_CUSTOMIZATION_VAR.to_string(), ENV_CUSTOMIZATION_SKIPPED.to_string());
}

/// Allow a later retry after a failed customisation.
pub fn clear_customization(env: &mut BTreeMap<String, String>) {
    env.remove(ENV_CUSTOMIZATION_VAR);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    /// Variables were added; carries how many.
    Injected(usize),
    /// The marker says someone already handled this environment.
    AlreadyCustomized,
    /// The command runs mise itself.
    MiseCommand,
    /// mise could not provide variables. The marker is cleared.
    Failed(String),
}

/// Add the project's mise variables to `env` for launching `command_line`.
///
/// Variables already present in `env` are overwritten, matching how the
/// project environment would look inside a mise-activated shell.
pub async fn inject_env(
    helper: &MiseHelper,
    command_line: &[String],
    env: &mut BTreeMap<String, String>,
) -> Injection {
    if !needs_customization(env) {
        return Injection::AlreadyCustomized;
    }
    if helper.executables().matches_executable_path(command_line).await {
        debug!("Not injecting mise environment into mise itself");
        return Injection::MiseCommand;
    }

    let environment = helper.configured_environment();
    let failure = match helper.env_vars(environment.as_deref()).await {
        Ok(Ok(vars)) => return apply(env, vars),
        Ok(Err(e)) => e.to_string(),
        Err(cancelled) => cancelled.to_string(),
    };
    warn!("Failed to load mise environment: {failure}");
    clear_customization(env);
    Injection::Failed(failure)
}

fn apply(env: &mut BTreeMap<String, String>, vars: EnvVars) -> Injection {
    let count = vars.len();
    env.extend(vars);
    mark_customized(env);
    debug!(count, "Injected mise environment");
    Injection::Injected(count)
}
