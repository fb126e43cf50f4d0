//! App - アプリケーション層
//!
//! ports と dispatch のロジックを組み合わせて、受信から job trigger までを動かします。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 設定の検証と adapter のワイヤリング
//! - **DispatchEngine**: notification 1 件の filter → plan → map → fan-out
//! - **Listener**: 受信ループ（ack、エラー分類、backoff、shutdown）
//! - **ondemand**: 手動指定 build の testrun trigger

pub mod backoff;
pub mod builder;
pub mod engine;
pub mod listener;
pub mod ondemand;

// 主要な型を再エクスポート
pub use self::backoff::BackoffPolicy;
pub use self::builder::{App, AppBuilder, BuildError, local_hostname};
pub use self::engine::{DispatchEngine, DispatchReport, FanOut};
pub use self::listener::{Listener, ListenerError, ListenerSummary};
pub use self::ondemand::{OnDemandConfig, OnDemandSummary};
