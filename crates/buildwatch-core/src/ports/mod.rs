//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! bus・job server・ファイルシステム・時刻はすべてここで trait にし、
//! dispatch のロジックからは実装の詳細が見えないようにします。

pub mod archive;
pub mod clock;
pub mod id_generator;
pub mod job_trigger;
pub mod notification_source;

// 主要な trait を再エクスポート
pub use self::archive::{ArchiveError, NotificationArchive};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::job_trigger::{JobTrigger, TriggerError};
pub use self::notification_source::{Delivery, NotificationSource, SourceError, Subscription};
