use crate::helper::MiseHelper;
use async_trait::async_trait;
use misebridge_cache::CacheWarmer;
use misebridge_core::DevToolsScope;
use std::sync::Weak;
use tracing::{debug, warn};

/// Preloads the queries views ask for first: env vars and dev tools.
///
/// Holds the helper weakly so a warmer attached to the cache does not keep
/// the cache alive.
pub struct HelperWarmer {
    helper: Weak<MiseHelper>,
}

impl HelperWarmer {
    pub fn new(helper: Weak<MiseHelper>) -> Self {
        Self { helper }
    }
}

#[async_trait]
impl CacheWarmer for HelperWarmer {
    async fn warm(&self) {
        let Some(helper) = self.helper.upgrade() else {
            debug!("Project closed, skipping warm");
            return;
        };
        let environment = helper.configured_environment();
        let environment = environment.as_deref();

        match helper.env_vars(environment).await {
            Ok(Ok(vars)) => debug!(count = vars.len(), "Warmed env vars"),
            Ok(Err(e)) if e.is_not_found() => debug!("Skipping env vars warm: {e}"),
            Ok(Err(e)) => warn!("Failed to warm env vars: {e}"),
            Err(cancelled) => warn!("Env vars warm cancelled: {cancelled}"),
        }
        match helper.dev_tools(DevToolsScope::Combined, environment).await {
            Ok(Ok(tools)) => debug!(count = tools.len(), "Warmed dev tools"),
            Ok(Err(e)) if e.is_not_found() => debug!("Skipping dev tools warm: {e}"),
            Ok(Err(e)) => warn!("Failed to warm dev tools: {e}"),
            Err(cancelled) => warn!("Dev tools warm cancelled: {cancelled}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::ScriptedExecutor;
    use crate::helper::tests::helper_with;
    use misebridge_config::EffectiveSettings;
    use misebridge_core::{DevToolsKey, EnvVarsKey, ProjectEvent, ProjectEventKind};
    use misebridge_shell::HostPlatform;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_startup_warms_env_and_tools() {
        let executor = ScriptedExecutor::new();
        executor
            .stdout("env --json", r#"{"A": "1"}"#)
            .stdout("ls --local --json", r#"{"node": [{"version": "22.0.0"}]}"#)
            .stdout("ls --global --json", "{}");
        let helper = Arc::new(helper_with(
            executor.clone(),
            HostPlatform::Unix,
            "/work",
            EffectiveSettings::default(),
            Handle::current(),
        ));
        let cache = helper.cache().clone();
        cache.attach_warmer(Arc::new(HelperWarmer::new(Arc::downgrade(&helper))));

        cache.handle_event(&ProjectEvent::new(ProjectEventKind::Startup, "opened"));

        let local = DevToolsKey::new("/work", None, DevToolsScope::Local);
        for _ in 0..100 {
            if cache.get_if_cached(&local).is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(cache.get_if_cached(&EnvVarsKey::new("/work", None)).unwrap()["A"], "1");
        assert_eq!(cache.get_if_cached(&local).unwrap()["node"][0].version, "22.0.0");
    }

    #[tokio::test]
    async fn test_dropped_helper_skips_warm() {
        let executor = ScriptedExecutor::new();
        let helper = Arc::new(helper_with(
            executor.clone(),
            HostPlatform::Unix,
            "/work",
            EffectiveSettings::default(),
            Handle::current(),
        ));
        let warmer = HelperWarmer::new(Arc::downgrade(&helper));
        drop(helper);

        warmer.warm().await;
        assert_eq!(executor.call_count(), 0);
    }
}
