//! LineSource - 1 行 1 JSON の notification を読む source
//!
//! 外部の bus consumer が受信した message を JSON lines で流し込む用途。
//!
//! # 実装詳細
//! - 読み込みは専用の OS thread（blocking read）で行い、tokio の mpsc channel で渡す
//! - stdin の read は tokio から cancel できないため、runtime の終了をこの thread が
//!   止めないようにしている（shutdown 後は thread ごと置き去りにする）
//! - consumer が drop されると、次の行を送ろうとした時点で thread も終わる

use std::io::BufRead;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::domain::Notification;
use crate::ports::{Delivery, NotificationSource, SourceError};

const LINE_BUFFER: usize = 64;

pub struct LineSource {
    lines: Mutex<mpsc::Receiver<std::io::Result<String>>>,
    name: String,
}

impl LineSource {
    /// Read lines from the reader `open` returns, on a dedicated thread.
    ///
    /// The reader is opened on that thread, so it need not be `Send`.
    pub fn from_blocking<R, F>(open: F, name: impl Into<String>) -> Result<Self, SourceError>
    where
        R: BufRead,
        F: FnOnce() -> R + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        let thread_name = format!("line-source ({name})");
        std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                for line in open().lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
                debug!("line reader finished");
            })?;
        Ok(Self {
            lines: Mutex::new(rx),
            name,
        })
    }

    pub fn stdin() -> Result<Self, SourceError> {
        Self::from_blocking(|| std::io::stdin().lock(), "stdin (JSON lines)")
    }
}

struct LineDelivery {
    notification: Notification,
}

#[async_trait]
impl Delivery for LineDelivery {
    fn notification(&self) -> &Notification {
        &self.notification
    }

    async fn ack(self: Box<Self>) -> Result<Notification, SourceError> {
        // 上流の consumer が ack 済み
        Ok(self.notification)
    }
}

#[async_trait]
impl NotificationSource for LineSource {
    async fn recv(&self) -> Result<Option<Box<dyn Delivery>>, SourceError> {
        let mut lines = self.lines.lock().await;
        loop {
            let Some(line) = lines.recv().await else {
                return Ok(None);
            };
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let notification = Notification::from_slice(line.as_bytes())
                .map_err(|e| SourceError::Malformed(e.to_string()))?;
            return Ok(Some(Box::new(LineDelivery { notification })));
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
