//! ChannelSource - 開発・テスト用の in-memory notification source
//!
//! # 実装詳細
//! - tokio の mpsc channel で notification（または注入したエラー）を流す
//! - ack の回数を数えて「処理前に 1 回だけ ack」をテストで確認できる
//! - publisher が全て drop されると `recv` は `None`（exhausted）を返す

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::domain::Notification;
use crate::ports::{Delivery, NotificationSource, SourceError};

type Item = Result<Notification, SourceError>;

/// Sending half handed to producers (tests, an external bus adapter).
#[derive(Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<Item>,
}

impl ChannelPublisher {
    pub async fn publish(&self, notification: Notification) -> Result<(), SourceError> {
        self.tx
            .send(Ok(notification))
            .await
            .map_err(|_| SourceError::Connection("channel source dropped".into()))
    }

    /// Deliver an error to the consumer instead of a message.
    pub async fn fail(&self, error: SourceError) -> Result<(), SourceError> {
        self.tx
            .send(Err(error))
            .await
            .map_err(|_| SourceError::Connection("channel source dropped".into()))
    }
}

pub struct ChannelSource {
    rx: Mutex<mpsc::Receiver<Item>>,
    acked: Arc<AtomicUsize>,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (ChannelPublisher, ChannelSource) {
        let (tx, rx) = mpsc::channel(capacity);
        let source = ChannelSource {
            rx: Mutex::new(rx),
            acked: Arc::new(AtomicUsize::new(0)),
        };
        (ChannelPublisher { tx }, source)
    }

    /// Number of deliveries acknowledged so far.
    pub fn acked(&self) -> usize {
        self.acked.load(Ordering::SeqCst)
    }
}

struct ChannelDelivery {
    notification: Notification,
    acked: Arc<AtomicUsize>,
}

#[async_trait]
impl Delivery for ChannelDelivery {
    fn notification(&self) -> &Notification {
        &self.notification
    }

    async fn ack(self: Box<Self>) -> Result<Notification, SourceError> {
        self.acked.fetch_add(1, Ordering::SeqCst);
        Ok(self.notification)
    }
}

#[async_trait]
impl NotificationSource for ChannelSource {
    async fn recv(&self) -> Result<Option<Box<dyn Delivery>>, SourceError> {
        // ロックは recv の間だけ保持する（consumer は 1 つの前提）
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(Ok(notification)) => Ok(Some(Box::new(ChannelDelivery {
                notification,
                acked: Arc::clone(&self.acked),
            }))),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        "in-memory channel".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn delivers_in_order_and_counts_acks() {
        let (tx, source) = ChannelSource::new(4);
        for key in ["a", "b"] {
            tx.publish(Notification::from_value(json!({ "_meta": { "routing_key": key } })))
                .await
                .unwrap();
        }
        drop(tx);

        let first = source.recv().await.unwrap().unwrap();
        assert_eq!(first.notification().routing_key(), "a");
        assert_eq!(source.acked(), 0);
        first.ack().await.unwrap();
        assert_eq!(source.acked(), 1);

        let second = source.recv().await.unwrap().unwrap();
        assert_eq!(second.ack().await.unwrap().routing_key(), "b");

        assert!(source.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn forwards_injected_errors() {
        let (tx, source) = ChannelSource::new(1);
        tx.fail(SourceError::Connection("reset by peer".into())).await.unwrap();

        let err = source.recv().await.err().unwrap();
        assert!(matches!(err, SourceError::Connection(_)));
    }
}
