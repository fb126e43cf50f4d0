//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **ChannelSource**: in-memory の notification source（開発・テスト用）
//! - **FileSource**: 保存済み notification の再生
//! - **LineSource**: JSON lines（stdin など）からの受信
//! - **JenkinsTrigger**: HTTP の job trigger
//! - **DryRunTrigger / RecordingTrigger**: in-memory の job trigger
//! - **FileArchive**: デバッグ用の notification 保存

pub mod channel_source;
pub mod file_archive;
pub mod file_source;
pub mod jenkins;
pub mod line_source;
pub mod recording;

// 主要な型を再エクスポート
pub use self::channel_source::{ChannelPublisher, ChannelSource};
pub use self::file_archive::FileArchive;
pub use self::file_source::FileSource;
pub use self::jenkins::JenkinsTrigger;
pub use self::line_source::LineSource;
pub use self::recording::{DryRunTrigger, RecordingTrigger, TriggerCall};
