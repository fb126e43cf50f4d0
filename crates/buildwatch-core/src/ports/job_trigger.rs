//! JobTrigger port - job server への起動要求
//!
//! 実行の管理・結果の回収・再送はしません。1 回呼んで成否を返すだけです。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::JobParameters;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job server rejected {job}: HTTP {status}")]
    Rejected { job: String, status: u16 },

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait JobTrigger: Send + Sync {
    async fn trigger(&self, job: &str, parameters: &JobParameters) -> Result<(), TriggerError>;

    /// Human-readable name for logs (e.g. "jenkins", "dry-run").
    fn name(&self) -> &str;
}
