//! Correlation ids - ログの相関用 ID
//!
//! ids are never persisted or sent anywhere: they only appear in log fields,
//! so a notification (or an on-demand run) can be followed across the
//! "received", "triggering tests" and per-target lines.
//!
//! 形式は `<prefix><ULID>`（例: `ntf-01HQ3K...`）。ULID の先頭は時刻なので、
//! ログを ID で並べると受信順になります。

use std::fmt;
use std::marker::PhantomData;

use ulid::Ulid;

/// Log prefix of one id kind.
pub trait IdKind: Send + Sync + 'static {
    const PREFIX: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId<K: IdKind> {
    ulid: Ulid,
    _kind: PhantomData<K>,
}

impl<K: IdKind> CorrelationId<K> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _kind: PhantomData,
        }
    }

    /// Milliseconds since the epoch at which the id was issued.
    pub fn issued_at_ms(&self) -> u64 {
        self.ulid.timestamp_ms()
    }
}

impl<K: IdKind> fmt::Display for CorrelationId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", K::PREFIX, self.ulid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Delivered {}

impl IdKind for Delivered {
    const PREFIX: &'static str = "ntf-";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OnDemand {}

impl IdKind for OnDemand {
    const PREFIX: &'static str = "run-";
}

/// One delivered notification (one processing pass).
pub type NotificationId = CorrelationId<Delivered>;

/// One on-demand batch.
pub type RunId = CorrelationId<OnDemand>;
