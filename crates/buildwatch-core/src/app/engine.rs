//! DispatchEngine - notification 1 件の処理
//!
//! # フロー
//! 1. Property Extractor で build properties を取り出す
//! 2. routing key を確認（不一致なら静かに捨てる）
//! 3. デバッグ保存が有効なら notification を保存（失敗してもログだけ）
//! 4. allow-list で filter（reject なら終了）
//! 5. Dispatch Planner で target を展開
//! 6. 全 target の parameter を先に解決（1 つでも失敗したら何も trigger しない）
//! 7. 全 target を並行に trigger。失敗した target はログに残し、他は続行する
//!
//! ack は呼び出し側（listener）が filter の前に済ませます。

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::dispatch::{DispatchPlanner, FilterCriteria, ParameterMapper, Rejection, Verdict};
use crate::domain::{
    BuildProperties, CanonicalPlatform, DispatchError, DispatchTarget, JobParameters,
    Notification, NotificationId, extract,
};
use crate::ports::{JobTrigger, NotificationArchive};

/// What happened to one notification.
#[derive(Debug)]
pub enum DispatchReport {
    Rejected(Rejection),
    /// Nothing was triggered.
    Aborted(DispatchError),
    Dispatched(FanOut),
}

impl DispatchReport {
    pub fn fan_out(&self) -> Option<&FanOut> {
        match self {
            DispatchReport::Dispatched(fan_out) => Some(fan_out),
            _ => None,
        }
    }
}

/// Per-target outcome of a dispatched notification.
#[derive(Debug, Default)]
pub struct FanOut {
    pub triggered: Vec<DispatchTarget>,
    pub failed: Vec<(DispatchTarget, String)>,
}

impl FanOut {
    pub fn is_partial(&self) -> bool {
        !self.triggered.is_empty() && !self.failed.is_empty()
    }

    pub fn planned(&self) -> usize {
        self.triggered.len() + self.failed.len()
    }
}

/// Filter + planner + mapper + trigger, wired together.
///
/// Stateless between notifications: everything it holds is read-only.
pub struct DispatchEngine {
    filter: FilterCriteria,
    planner: DispatchPlanner,
    mapper: ParameterMapper,
    trigger: Arc<dyn JobTrigger>,
    archive: Option<Arc<dyn NotificationArchive>>,
}

impl DispatchEngine {
    pub fn new(
        filter: FilterCriteria,
        planner: DispatchPlanner,
        mapper: ParameterMapper,
        trigger: Arc<dyn JobTrigger>,
    ) -> Self {
        Self {
            filter,
            planner,
            mapper,
            trigger,
            archive: None,
        }
    }

    pub fn with_archive(mut self, archive: Arc<dyn NotificationArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn filter(&self) -> &FilterCriteria {
        &self.filter
    }

    pub fn planner(&self) -> &DispatchPlanner {
        &self.planner
    }

    pub async fn process(&self, id: NotificationId, notification: &Notification) -> DispatchReport {
        let properties = extract(notification);
        let routing_key = notification.routing_key();

        let verdict = self.filter.evaluate(routing_key, &properties);
        if verdict == Verdict::Reject(Rejection::RoutingKey) {
            debug!(%id, routing_key, "routing key not matched");
            return DispatchReport::Rejected(Rejection::RoutingKey);
        }

        let product = properties.product();
        let branch = properties.branch();
        let platform = properties.platform();
        let locale = properties.locale();
        info!(
            %id,
            sent = notification.sent(),
            product = product.as_deref(),
            branch = branch.as_deref(),
            platform = platform.as_deref(),
            %locale,
            "build notification received"
        );

        if let Some(archive) = &self.archive {
            match archive.store(notification, &properties).await {
                Ok(path) => debug!(%id, path = %path.display(), "notification archived"),
                Err(e) => warn!(%id, error = %e, "failed to archive notification"),
            }
        }

        if let Verdict::Reject(rejection) = verdict {
            debug!(%id, %rejection, "build not wanted");
            return DispatchReport::Rejected(rejection);
        }

        match self.prepare(&properties) {
            Ok(jobs) if jobs.is_empty() => {
                warn!(
                    %id,
                    routing_key,
                    branch = branch.as_deref(),
                    platform = platform.as_deref(),
                    "no nodes configured for this platform"
                );
                DispatchReport::Dispatched(FanOut::default())
            }
            Ok(jobs) => {
                log_trigger_intent(id, &properties, jobs[0].0.platform);
                DispatchReport::Dispatched(self.fire(id, jobs).await)
            }
            Err(e) => {
                let message = if e.is_config_inconsistency() {
                    "configuration error, nothing dispatched"
                } else {
                    "lookup failed, nothing dispatched"
                };
                error!(
                    %id,
                    routing_key,
                    sent = notification.sent(),
                    product = product.as_deref(),
                    branch = branch.as_deref(),
                    platform = platform.as_deref(),
                    %locale,
                    error = %e,
                    "{message}"
                );
                DispatchReport::Aborted(e)
            }
        }
    }

    /// Plan and map every target before anything is triggered.
    fn prepare(
        &self,
        properties: &BuildProperties,
    ) -> Result<Vec<(DispatchTarget, JobParameters)>, DispatchError> {
        let branch = properties.branch().ok_or(DispatchError::MissingBranch)?;
        self.planner
            .plan(&branch, properties)?
            .into_iter()
            .map(|target| -> Result<_, DispatchError> {
                let parameters = self.mapper.map_parameters(&target, properties)?;
                Ok((target, parameters))
            })
            .collect()
    }

    async fn fire(&self, id: NotificationId, jobs: Vec<(DispatchTarget, JobParameters)>) -> FanOut {
        let calls = jobs.iter().map(|(target, parameters)| async move {
            let job = target.job_name();
            let result = self.trigger.trigger(&job, parameters).await;
            (target, parameters, job, result)
        });

        let mut fan_out = FanOut::default();
        for (target, parameters, job, result) in join_all(calls).await {
            match result {
                Ok(()) => {
                    info!(
                        %id,
                        %job,
                        test_type = %target.test_type,
                        platform = %target.platform,
                        node = %target.node,
                        "job triggered"
                    );
                    fan_out.triggered.push(target.clone());
                }
                Err(e) => {
                    error!(
                        %id,
                        %job,
                        branch = %target.branch,
                        test_type = %target.test_type,
                        platform = %target.platform,
                        node = %target.node,
                        %parameters,
                        error = %e,
                        "job trigger failed"
                    );
                    fan_out.failed.push((target.clone(), e.to_string()));
                }
            }
        }

        if fan_out.is_partial() {
            let fired: Vec<String> = fan_out.triggered.iter().map(ToString::to_string).collect();
            let missed: Vec<String> = fan_out.failed.iter().map(|(t, _)| t.to_string()).collect();
            warn!(%id, ?fired, ?missed, "partially triggered fan-out");
        }
        fan_out
    }
}

fn log_trigger_intent(id: NotificationId, properties: &BuildProperties, platform: CanonicalPlatform) {
    info!(
        %id,
        product = properties.product().as_deref(),
        version = properties.lookup("appVersion").as_deref(),
        %platform,
        locale = %properties.locale(),
        buildid = properties.lookup("buildid").as_deref(),
        previous_buildid = properties.lookup("previous_buildid").as_deref(),
        package = properties.installer_url().as_deref(),
        "triggering tests"
    );
}
