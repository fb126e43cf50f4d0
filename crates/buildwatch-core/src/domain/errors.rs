//! Errors - エラー型と分類
//!
//! listener が「聞き続ける / 止まる」を判断するための ErrorKind と、
//! 1 件の notification の処理を打ち切る DispatchError を定義します。

use thiserror::Error;

use super::platform::PlatformError;

/// ErrorKind はエラーの運用分類
///
/// - Transient: 一時的なエラー（接続断など。待って再開する）
/// - Permanent: 恒久的なエラー（再試行しても無意味）
/// - Infrastructure: 外部システムの障害（job server, ファイルシステム）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// Aborts dispatching for one notification. Never fatal for the process.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("notification has no platform property")]
    MissingPlatform,

    #[error("notification has no branch property")]
    MissingBranch,

    #[error("branch '{0}' passed the filter but has no dispatch configuration")]
    UnconfiguredBranch(String),
}

impl DispatchError {
    /// Configuration errors point at the operator, lookup errors at the build.
    pub fn is_config_inconsistency(&self) -> bool {
        matches!(self, DispatchError::UnconfiguredBranch(_))
    }
}
