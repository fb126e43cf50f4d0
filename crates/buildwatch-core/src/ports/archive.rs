//! NotificationArchive port - デバッグ用の notification 保存
//!
//! 保存の失敗は処理を止めません。呼び出し側がログに残して先へ進みます。

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BuildProperties, Notification};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize notification: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait NotificationArchive: Send + Sync {
    /// Persist the raw notification; returns where it was written.
    async fn store(
        &self,
        notification: &Notification,
        properties: &BuildProperties,
    ) -> Result<PathBuf, ArchiveError>;
}
