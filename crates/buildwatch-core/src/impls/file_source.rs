//! FileSource - 保存済み notification の再生
//!
//! デバッグ保存（`FileArchive`）で書き出したファイルをそのまま読み込み、
//! 1 件ずつ流して終わります。ack は何もしません。

use std::collections::VecDeque;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::Notification;
use crate::ports::{Delivery, NotificationSource, SourceError};

pub struct FileSource {
    pending: Mutex<VecDeque<PathBuf>>,
    total: usize,
}

impl FileSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let pending: VecDeque<PathBuf> = paths.into_iter().collect();
        let total = pending.len();
        Self {
            pending: Mutex::new(pending),
            total,
        }
    }
}

struct ReplayedDelivery {
    notification: Notification,
}

#[async_trait]
impl Delivery for ReplayedDelivery {
    fn notification(&self) -> &Notification {
        &self.notification
    }

    async fn ack(self: Box<Self>) -> Result<Notification, SourceError> {
        Ok(self.notification)
    }
}

#[async_trait]
impl NotificationSource for FileSource {
    async fn recv(&self) -> Result<Option<Box<dyn Delivery>>, SourceError> {
        let Some(path) = self.pending.lock().await.pop_front() else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(&path).await?;
        let notification = Notification::from_slice(&bytes)
            .map_err(|e| SourceError::Malformed(format!("{}: {e}", path.display())))?;
        Ok(Some(Box::new(ReplayedDelivery { notification })))
    }

    fn describe(&self) -> String {
        format!("replay of {} file(s)", self.total)
    }
}
