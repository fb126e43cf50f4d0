//! Notification - bus から届いた生のイベント
//!
//! 受信した JSON をそのまま保持し、routing key と送信時刻だけを取り出します。
//! 構築は total（失敗しない）: `_meta` が欠けていても空文字列として扱い、
//! 後段の filter が自然に reject します。

use serde_json::Value;

/// One build notification as delivered by the bus.
///
/// Immutable once received. The raw document is kept verbatim so it can be
/// archived for debugging.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    routing_key: String,
    sent: String,
    raw: Value,
}

impl Notification {
    /// Wrap a decoded message document.
    pub fn from_value(raw: Value) -> Self {
        let meta = raw.get("_meta");
        let routing_key = meta
            .and_then(|m| m.get("routing_key"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let sent = match meta.and_then(|m| m.get("sent")) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Self {
            routing_key,
            sent,
            raw,
        }
    }

    /// Decode a message body. Only invalid JSON is an error.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(Self::from_value(serde_json::from_slice(bytes)?))
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Sender timestamp as published (`_meta.sent`), empty when absent.
    pub fn sent(&self) -> &str {
        &self.sent
    }

    pub fn payload(&self) -> Option<&Value> {
        self.raw.get("payload")
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}
