//! Typed `mise` queries for a project, each cached under its own key.

use crate::command_line::{CommandContext, MiseCommandLine};
use crate::executable::ExecutableManager;
use misebridge_cache::{CachedResult, CommandCache};
use misebridge_core::{
    CommandResult, ConfigValueKey, DevTools, DevToolsKey, DevToolsScope, EnvVars,
    EnvVarsExtended, EnvVarsExtendedKey, EnvVarsKey, MiseTask, TasksKey, TrackedConfigsKey,
    WhichBinKey,
};
use misebridge_shell::{to_linux_path_or_self, to_unc};
use std::sync::Arc;
use tracing::debug;

struct Inner {
    cache: CommandCache,
    executables: ExecutableManager,
    context: CommandContext,
}

#[derive(Clone)]
pub struct MiseHelper {
    inner: Arc<Inner>,
}

fn owned_env(config_environment: Option<&str>) -> Option<String> {
    config_environment
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Global tools overridden per tool by local ones.
pub fn merge_dev_tools(local: DevTools, global: DevTools) -> DevTools {
    if local.is_empty() {
        return global;
    }
    if global.is_empty() {
        return local;
    }
    let mut merged = global;
    merged.extend(local);
    merged
}

impl MiseHelper {
    pub fn new(cache: CommandCache, executables: ExecutableManager, context: CommandContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                executables,
                context,
            }),
        }
    }

    pub fn cache(&self) -> &CommandCache {
        &self.inner.cache
    }

    pub fn executables(&self) -> &ExecutableManager {
        &self.inner.executables
    }

    pub fn context(&self) -> &CommandContext {
        &self.inner.context
    }

    /// Config environment from the current settings.
    pub fn configured_environment(&self) -> Option<String> {
        self.inner
            .executables
            .settings()
            .config_environment()
            .map(str::to_string)
    }

    fn work_dir(&self) -> String {
        self.inner.context.work_dir_key()
    }

    async fn command_line(&self, config_environment: Option<&str>) -> MiseCommandLine {
        let executable = self.inner.executables.executable_info().await;
        self.inner.context.command_line(executable, config_environment)
    }

    /// `mise env --json`
    pub async fn env_vars(&self, config_environment: Option<&str>) -> CachedResult<EnvVars> {
        let key = EnvVarsKey::new(self.work_dir(), owned_env(config_environment));
        self.inner
            .cache
            .get_cached(&key, || self.fetch_env_vars(config_environment))
            .await
    }

    /// [`Self::env_vars`] for plain threads, including the dispatch thread.
    pub fn env_vars_blocking(&self, config_environment: Option<&str>) -> CachedResult<EnvVars> {
        let environment = owned_env(config_environment);
        let key = EnvVarsKey::new(self.work_dir(), environment.clone());
        let this = self.clone();
        self.inner.cache.get_cached_with_progress(&key, move || async move {
            this.fetch_env_vars(environment.as_deref()).await
        })
    }

    async fn fetch_env_vars(&self, config_environment: Option<&str>) -> CommandResult<EnvVars> {
        self.command_line(config_environment)
            .await
            .run_json(&["env", "--json"], false)
            .await
    }

    /// `mise env --json-extended`, with `redacted` set for the keys
    /// `mise env --json --redacted` reports.
    pub async fn env_vars_extended(
        &self,
        config_environment: Option<&str>,
    ) -> CachedResult<EnvVarsExtended> {
        let key = EnvVarsExtendedKey::new(self.work_dir(), owned_env(config_environment));
        self.inner
            .cache
            .get_cached(&key, || async {
                let line = self.command_line(config_environment).await;
                let mut vars: EnvVarsExtended =
                    line.run_json(&["env", "--json-extended"], false).await?;
                let redacted: EnvVars = match line.run_json(&["env", "--json", "--redacted"], false).await {
                    Ok(redacted) => redacted,
                    Err(e) => {
                        debug!("Could not list redacted variables: {e}");
                        EnvVars::new()
                    }
                };
                for (name, var) in vars.iter_mut() {
                    var.redacted = redacted.contains_key(name);
                }
                Ok(vars)
            })
            .await
    }

    /// `mise ls <scope> --json`. The combined scope merges local over global.
    pub async fn dev_tools(
        &self,
        scope: DevToolsScope,
        config_environment: Option<&str>,
    ) -> CachedResult<DevTools> {
        match scope.command_flag() {
            Some(flag) => self.scoped_dev_tools(scope, flag, config_environment).await,
            None => {
                let local = self
                    .scoped_dev_tools(DevToolsScope::Local, "--local", config_environment)
                    .await?;
                let global = self
                    .scoped_dev_tools(DevToolsScope::Global, "--global", config_environment)
                    .await?;
                Ok(local.and_then(|local| global.map(|global| merge_dev_tools(local, global))))
            }
        }
    }

    async fn scoped_dev_tools(
        &self,
        scope: DevToolsScope,
        flag: &str,
        config_environment: Option<&str>,
    ) -> CachedResult<DevTools> {
        let key = DevToolsKey::new(self.work_dir(), owned_env(config_environment), scope);
        self.inner
            .cache
            .get_cached(&key, || async {
                let offline = self.inner.executables.settings().offline();
                let line = self.command_line(config_environment).await;
                let mut tools: DevTools = line.run_json(&["ls", flag, "--json"], offline).await?;
                let executable = line.executable().path.clone();
                for tool in tools.values_mut().flatten() {
                    tool.executable_path = Some(executable.clone());
                }
                Ok(tools)
            })
            .await
    }

    /// `mise which <bin>`. Under WSL the result is returned as a UNC path.
    pub async fn which_bin(&self, bin: &str, config_environment: Option<&str>) -> CachedResult<String> {
        let key = WhichBinKey::new(bin, self.work_dir(), owned_env(config_environment));
        self.inner
            .cache
            .get_cached(&key, || async {
                let output = self
                    .command_line(config_environment)
                    .await
                    .run_text(&["which", bin], false)
                    .await?;
                let path = output.trim();
                Ok(match self.inner.context.info.wsl_distribution() {
                    Some(distribution) if path.starts_with('/') => to_unc(distribution, path),
                    _ => path.to_string(),
                })
            })
            .await
    }

    /// `mise config get <key>`
    pub async fn config_get(&self, key: &str, config_environment: Option<&str>) -> CachedResult<String> {
        let cache_key = ConfigValueKey::new(key, self.work_dir(), owned_env(config_environment));
        self.inner
            .cache
            .get_cached(&cache_key, || async {
                let output = self
                    .command_line(config_environment)
                    .await
                    .run_text(&["config", "get", key], false)
                    .await?;
                Ok(output.trim().to_string())
            })
            .await
    }

    /// `mise config --tracked-configs`
    pub async fn tracked_configs(&self) -> CachedResult<Vec<String>> {
        let key = TrackedConfigsKey::new(self.work_dir());
        self.inner
            .cache
            .get_cached(&key, || async {
                self.command_line(None)
                    .await
                    .run_lines(&["config", "--tracked-configs"])
                    .await
            })
            .await
    }

    /// `mise trust <path>`. Never cached.
    pub async fn trust_config_file(
        &self,
        config_path: &str,
        config_environment: Option<&str>,
    ) -> CommandResult<()> {
        let path = to_linux_path_or_self(config_path);
        self.command_line(config_environment)
            .await
            .run_text(&["trust", &path], false)
            .await?;
        Ok(())
    }

    /// `mise task ls --json`
    pub async fn tasks(&self, config_environment: Option<&str>) -> CachedResult<Vec<MiseTask>> {
        let key = TasksKey::new(self.work_dir(), owned_env(config_environment));
        self.inner
            .cache
            .get_cached(&key, || async {
                self.command_line(config_environment)
                    .await
                    .run_json(&["task", "ls", "--json"], false)
                    .await
            })
            .await
    }
}
