//! Listener - 受信ループ
//!
//! # 状態
//! - Idle: 次の notification を待つ（shutdown と競合させる）
//! - Processing: ack → DispatchEngine::process（fan-out の失敗は engine 内でログ）
//!
//! # エラー方針
//! - Transient（接続断など）: ログを残し、backoff 後に受信を再開
//! - Permanent（壊れた message など）: ログを残して次へ
//! - Infrastructure: 受信を続けられないので `run` がエラーを返す
//!
//! shutdown 要求は「次の受信を始めない」だけで、処理中の notification の
//! fan-out は最後まで実行してログに残します。

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::backoff::BackoffPolicy;
use super::engine::{DispatchEngine, DispatchReport};
use crate::domain::ErrorKind;
use crate::ports::{Delivery, IdGenerator, NotificationSource, SourceError};

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("notification source failed: {0}")]
    Source(#[from] SourceError),
}

/// Counters for one `run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerSummary {
    pub received: usize,
    pub accepted: usize,
    pub triggered: usize,
    pub failed: usize,
    pub source_errors: usize,
}

pub struct Listener {
    source: Arc<dyn NotificationSource>,
    engine: Arc<DispatchEngine>,
    ids: Arc<dyn IdGenerator>,
    backoff: BackoffPolicy,
}

impl Listener {
    pub fn new(
        source: Arc<dyn NotificationSource>,
        engine: Arc<DispatchEngine>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            source,
            engine,
            ids,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Consume until the source is exhausted, shutdown is requested (or the
    /// shutdown sender is dropped), or the source fails for good.
    pub async fn run(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ListenerSummary, ListenerError> {
        let mut summary = ListenerSummary::default();
        let mut consecutive_failures = 0u32;
        info!(source = %self.source.describe(), "waiting for notifications");

        loop {
            if *shutdown.borrow() {
                info!("shutdown requested, listener stopping");
                break;
            }

            let next = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("shutdown handle dropped, listener stopping");
                        break;
                    }
                    continue;
                }
                next = self.source.recv() => next,
            };

            match next {
                Ok(Some(delivery)) => {
                    consecutive_failures = 0;
                    self.handle(delivery, &mut summary).await;
                }
                Ok(None) => {
                    info!(source = %self.source.describe(), "notification source exhausted");
                    break;
                }
                Err(e) => {
                    summary.source_errors += 1;
                    match e.kind() {
                        ErrorKind::Permanent => {
                            warn!(error = %e, "skipping unreadable message");
                        }
                        ErrorKind::Transient => {
                            consecutive_failures += 1;
                            let delay = self.backoff.next_delay(consecutive_failures);
                            warn!(
                                error = %e,
                                attempt = consecutive_failures,
                                delay_ms = delay.as_millis() as u64,
                                "notification source error, resuming after backoff"
                            );
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => {}
                                _ = shutdown.changed() => {}
                            }
                        }
                        ErrorKind::Infrastructure => {
                            error!(error = %e, "notification source failed");
                            return Err(ListenerError::Source(e));
                        }
                    }
                }
            }
        }

        info!(?summary, "listener stopped");
        Ok(summary)
    }

    async fn handle(&self, delivery: Box<dyn Delivery>, summary: &mut ListenerSummary) {
        let id = self.ids.generate_notification_id();
        let routing_key = delivery.notification().routing_key().to_string();
        summary.received += 1;

        // ack before filtering so nothing is redelivered, whatever the outcome
        let notification = match delivery.ack().await {
            Ok(n) => n,
            Err(e) => {
                warn!(%id, %routing_key, error = %e, "acknowledge failed, leaving message to the bus");
                return;
            }
        };
        debug!(%id, %routing_key, "notification acknowledged");

        match self.engine.process(id, &notification).await {
            DispatchReport::Rejected(_) => {}
            DispatchReport::Aborted(_) => summary.accepted += 1,
            DispatchReport::Dispatched(fan_out) => {
                summary.accepted += 1;
                summary.triggered += fan_out.triggered.len();
                summary.failed += fan_out.failed.len();
            }
        }
    }
}
