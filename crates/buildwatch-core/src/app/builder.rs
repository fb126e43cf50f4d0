//! AppBuilder - 設定から DispatchEngine を組み立てる
//!
//! # Fail-fast 設計
//! - routing key の regex と transform 名は `build()` で検証する
//!   （最初の notification が届いてから壊れた設定に気付かないように）
//! - allow-list にあるのに `by_branch` に無い branch は致命的ではないが、
//!   起動時に warn で知らせる（その branch の build は毎回 abort される）

use std::sync::Arc;

use tracing::{info, warn};

use super::engine::DispatchEngine;
use super::listener::Listener;
use crate::config::{Config, ConfigError};
use crate::dispatch::{DispatchPlanner, FilterCriteria, ParameterMapper};
use crate::impls::JenkinsTrigger;
use crate::ports::{
    IdGenerator, JobTrigger, NotificationArchive, NotificationSource, Subscription, TriggerError,
};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to set up job trigger: {0}")]
    Trigger(#[source] TriggerError),
}

/// AppBuilder は Config と差し替え可能な adapter から App を構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(Config::from_file("pulse.json")?)
///     .trigger(Arc::new(DryRunTrigger))
///     .build()?;
/// ```
pub struct AppBuilder {
    config: Config,
    trigger: Option<Arc<dyn JobTrigger>>,
    archive: Option<Arc<dyn NotificationArchive>>,
    host: Option<String>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            trigger: None,
            archive: None,
            host: None,
        }
    }

    /// Job trigger to use instead of the configured Jenkins server.
    pub fn trigger(mut self, trigger: Arc<dyn JobTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Store every build notification (debug mode).
    pub fn archive(mut self, archive: Arc<dyn NotificationArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Host name appended to the application label. Defaults to `local_hostname()`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let filter = FilterCriteria::from_config(&self.config.pulse)?;
        let mapper = ParameterMapper::from_config(&self.config.testrun.jenkins_parameter_map)?;
        let planner = DispatchPlanner::from_config(&self.config.testrun.by_branch);

        let mut unconfigured: Vec<String> = self
            .config
            .pulse
            .branches
            .iter()
            .filter(|branch| !planner.is_configured(branch))
            .cloned()
            .collect();
        unconfigured.sort();
        for branch in &unconfigured {
            warn!(%branch, "branch is allow-listed but has no testrun configuration");
        }

        let trigger = match self.trigger {
            Some(trigger) => trigger,
            None => Arc::new(JenkinsTrigger::new(&self.config.jenkins).map_err(BuildError::Trigger)?),
        };

        let mut engine = DispatchEngine::new(filter, planner, mapper, Arc::clone(&trigger));
        if let Some(archive) = self.archive {
            engine = engine.with_archive(archive);
        }

        let host = self.host.unwrap_or_else(local_hostname);
        let subscription = Subscription::for_host(
            &self.config.pulse.applabel,
            &host,
            self.config.pulse.topics.clone(),
        );
        info!(%subscription, trigger = trigger.name(), "dispatcher configured");

        Ok(App {
            engine: Arc::new(engine),
            subscription,
            unconfigured_branches: unconfigured,
        })
    }
}

/// App は構築済みの dispatcher
pub struct App {
    engine: Arc<DispatchEngine>,
    subscription: Subscription,
    unconfigured_branches: Vec<String>,
}

impl App {
    pub fn engine(&self) -> &Arc<DispatchEngine> {
        &self.engine
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Allow-listed branches with no fan-out configuration, sorted.
    pub fn unconfigured_branches(&self) -> &[String] {
        &self.unconfigured_branches
    }

    pub fn listener(
        &self,
        source: Arc<dyn NotificationSource>,
        ids: Arc<dyn IdGenerator>,
    ) -> Listener {
        Listener::new(source, Arc::clone(&self.engine), ids)
    }
}

/// Name of this machine: `$HOSTNAME`, then `/etc/hostname`, then `localhost`.
pub fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::SAMPLE;
    use crate::impls::RecordingTrigger;

    fn builder(text: &str) -> AppBuilder {
        AppBuilder::new(Config::from_json(text).unwrap())
            .trigger(Arc::new(RecordingTrigger::new()))
            .host("mm-ci-1")
    }

    #[test]
    fn builds_from_sample_config() {
        let app = builder(SAMPLE).build().unwrap();
        assert_eq!(app.subscription().applabel, "qa-auto@mozilla.com|daily|mm-ci-1");
        assert_eq!(app.subscription().topics, vec!["build.*.*.finished", "heartbeat"]);
        assert_eq!(app.unconfigured_branches(), ["mozilla-aurora".to_string()]);
        assert!(app.engine().planner().is_configured("mozilla-central"));
    }

    #[test]
    fn invalid_regex_fails_fast() {
        let text = SAMPLE.replace(r#"build\\.(mozilla"#, r#"build\\.((mozilla"#);
        let err = builder(&text).build().err().unwrap();
        assert!(matches!(err, BuildError::Config(ConfigError::InvalidRegex(_))));
    }

    #[test]
    fn unknown_transform_fails_fast() {
        let text = SAMPLE.replace("get_platform_identifier", "get_platform_codename");
        let err = builder(&text).build().err().unwrap();
        assert!(matches!(
            err,
            BuildError::Config(ConfigError::UnknownTransform { ref parameter, .. }) if parameter == "PLATFORM"
        ));
    }

    #[test]
    fn defaults_to_jenkins_trigger() {
        let config = Config::from_json(SAMPLE).unwrap();
        let app = AppBuilder::new(config).host("mm-ci-1").build();
        assert!(app.is_ok());
    }

    #[test]
    fn hostname_is_never_empty() {
        assert!(!local_hostname().is_empty());
    }
}
