//! Transform registry - rule の `transform` 名を関数に解決する
//!
//! 名前は設定読み込み時に [`Transform`] へ parse され、未登録の名前は
//! その時点でエラーになります。実行時に名前で関数を探すことはありません。

use std::fmt;
use std::str::FromStr;

use crate::domain::{CanonicalPlatform, EnvironmentPlatform, PlatformError};

/// Closed set of value post-processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// canonical platform identifier -> environment platform
    EnvironmentPlatform,
    /// raw build platform -> canonical platform identifier
    PlatformIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transform: {0}")]
pub struct UnknownTransform(pub String);

impl Transform {
    pub fn name(self) -> &'static str {
        match self {
            Transform::EnvironmentPlatform => "environment_platform",
            Transform::PlatformIdentifier => "platform_identifier",
        }
    }

    /// Apply to a resolved value. A missing value stays missing.
    pub fn apply(self, value: Option<String>) -> Result<Option<String>, PlatformError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let out = match self {
            Transform::EnvironmentPlatform => {
                EnvironmentPlatform::from_identifier(&value)?.as_str()
            }
            Transform::PlatformIdentifier => CanonicalPlatform::from_raw(&value)?.as_str(),
        };
        Ok(Some(out.to_string()))
    }
}

impl FromStr for Transform {
    type Err = UnknownTransform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // legacy names from existing configuration files
            "environment_platform" | "get_mozmill_environment_platform" => {
                Ok(Transform::EnvironmentPlatform)
            }
            "platform_identifier" | "get_platform_identifier" => Ok(Transform::PlatformIdentifier),
            other => Err(UnknownTransform(other.to_string())),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
