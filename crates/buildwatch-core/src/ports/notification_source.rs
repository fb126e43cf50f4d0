//! NotificationSource port - bus からの受信
//!
//! 接続・購読・再配送は bus 側の責務です。この trait は
//! 「次の delivery を受け取る」と「ack する」だけを表します。

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ErrorKind, Notification};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("acknowledge error: {0}")]
    Ack(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source failed: {0}")]
    Fatal(String),
}

impl SourceError {
    /// - Transient: 接続断など。backoff 後に受信を再開する
    /// - Permanent: その message だけの問題。次の message へ進む
    /// - Infrastructure: 受信を続けられない。listener を止める
    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::Connection(_) | SourceError::Ack(_) => ErrorKind::Transient,
            SourceError::Malformed(_) | SourceError::Io(_) => ErrorKind::Permanent,
            SourceError::Fatal(_) => ErrorKind::Infrastructure,
        }
    }
}

/// One received message. Must be acknowledged before it is processed.
///
/// `ack` consumes the delivery, so a notification is acknowledged at most
/// once, and hands the notification over for processing.
#[async_trait]
pub trait Delivery: Send {
    fn notification(&self) -> &Notification;

    async fn ack(self: Box<Self>) -> Result<Notification, SourceError>;
}

/// Stream of build notifications.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// Wait for the next delivery. `Ok(None)` means the source is exhausted
    /// (replayed files, closed input); live bus sources never return it.
    async fn recv(&self) -> Result<Option<Box<dyn Delivery>>, SourceError>;

    /// Human-readable name for logs.
    fn describe(&self) -> String;
}

/// Subscription parameters for a bus consumer.
///
/// The application label carries the consuming host so two machines sharing
/// a base label do not silently split one queue between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub applabel: String,
    pub topics: Vec<String>,
}

impl Subscription {
    pub fn for_host(base_label: &str, host: &str, topics: Vec<String>) -> Self {
        Self {
            applabel: format!("{base_label}|{host}"),
            topics,
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.applabel, self.topics.join(", "))
    }
}
