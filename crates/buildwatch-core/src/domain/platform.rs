//! Platform identifier tables.
//!
//! Two independent translations, never merged:
//! - raw build platform (as published on the bus) -> [`CanonicalPlatform`]
//! - [`CanonicalPlatform`] -> [`EnvironmentPlatform`] (the `ENV_PLATFORM` job parameter)
//!
//! Both are closed tables. A value outside them is a [`PlatformError`], never
//! a silent default.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("unrecognized build platform: {0}")]
    UnknownRawPlatform(String),

    #[error("unrecognized platform identifier: {0}")]
    UnknownIdentifier(String),
}

/// Platform grouping used to select the per-branch node configuration.
///
/// Debug variants of a build collapse into the same identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalPlatform {
    Linux,
    Linux64,
    Mac,
    Win32,
    Win64,
}

impl CanonicalPlatform {
    pub const ALL: [CanonicalPlatform; 5] = [
        CanonicalPlatform::Linux,
        CanonicalPlatform::Linux64,
        CanonicalPlatform::Mac,
        CanonicalPlatform::Win32,
        CanonicalPlatform::Win64,
    ];

    /// Translate a raw platform name from a build notification.
    pub fn from_raw(raw: &str) -> Result<Self, PlatformError> {
        let platform = match raw {
            "linux" | "linux-debug" => CanonicalPlatform::Linux,
            "linux64" | "linux64-debug" => CanonicalPlatform::Linux64,
            "macosx" | "macosx-debug" | "macosx64" | "macosx64-debug" => CanonicalPlatform::Mac,
            "win32" | "win32-debug" => CanonicalPlatform::Win32,
            "win64" | "win64-debug" => CanonicalPlatform::Win64,
            other => return Err(PlatformError::UnknownRawPlatform(other.to_string())),
        };
        Ok(platform)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalPlatform::Linux => "linux",
            CanonicalPlatform::Linux64 => "linux64",
            CanonicalPlatform::Mac => "mac",
            CanonicalPlatform::Win32 => "win32",
            CanonicalPlatform::Win64 => "win64",
        }
    }

    pub fn environment(self) -> EnvironmentPlatform {
        match self {
            CanonicalPlatform::Linux | CanonicalPlatform::Linux64 => EnvironmentPlatform::Linux,
            CanonicalPlatform::Mac => EnvironmentPlatform::Mac,
            CanonicalPlatform::Win32 | CanonicalPlatform::Win64 => EnvironmentPlatform::Windows,
        }
    }
}

impl FromStr for CanonicalPlatform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalPlatform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PlatformError::UnknownIdentifier(s.to_string()))
    }
}

impl fmt::Display for CanonicalPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse OS family injected as `ENV_PLATFORM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentPlatform {
    Linux,
    Mac,
    Windows,
}

impl EnvironmentPlatform {
    /// Translate a canonical identifier given as text (e.g. a resolved parameter value).
    pub fn from_identifier(identifier: &str) -> Result<Self, PlatformError> {
        Ok(identifier.parse::<CanonicalPlatform>()?.environment())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnvironmentPlatform::Linux => "linux",
            EnvironmentPlatform::Mac => "mac",
            EnvironmentPlatform::Windows => "windows",
        }
    }
}

impl fmt::Display for EnvironmentPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
