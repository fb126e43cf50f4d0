//! Configuration file model.
//!
//! The file is JSON and keeps the section names operators already use:
//! `jenkins` (job server), `pulse` (bus subscription + filter criteria) and
//! `testrun` (per-branch fan-out + parameter rule tables).
//!
//! Loading only checks the shape. Semantic validation (regex, transform
//! names) happens when the engine is built, see `app::builder`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::CanonicalPlatform;

/// Name of the rule table every test type starts from.
pub const DEFAULT_RULE_TABLE: &str = "default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid routing_key_regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("unknown transform '{name}' for parameter {parameter} in rule table '{table}'")]
    UnknownTransform {
        table: String,
        parameter: String,
        name: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub jenkins: JenkinsConfig,
    pub pulse: PulseConfig,
    pub testrun: TestrunConfig,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Job server endpoint and credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct JenkinsConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    /// Whole-request limit for one trigger, in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl JenkinsConfig {
    /// Anonymous access with the default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// Bus subscription and filter criteria.
#[derive(Debug, Clone, Deserialize)]
pub struct PulseConfig {
    /// Base application label. The consuming host is appended at runtime.
    pub applabel: String,

    #[serde(default = "default_topics")]
    pub topics: Vec<String>,

    /// Case-insensitive, anchored at the start of the routing key.
    pub routing_key_regex: String,

    // Empty list = no restriction.
    #[serde(default)]
    pub branches: Vec<String>,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub locales: Vec<String>,
}

fn default_topics() -> Vec<String> {
    vec!["build.*.*.finished".to_string(), "heartbeat".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestrunConfig {
    #[serde(default)]
    pub by_branch: HashMap<String, BranchConfig>,

    #[serde(default)]
    pub jenkins_parameter_map: ParameterMapConfig,
}

/// Fan-out configuration of one branch.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchConfig {
    /// Test types, in trigger order.
    pub testruns: Vec<String>,

    /// Canonical platform -> node labels, in trigger order.
    #[serde(default)]
    pub platforms: HashMap<CanonicalPlatform, Vec<String>>,
}

/// Rule tables keyed by test type, plus the `default` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ParameterMapConfig(pub BTreeMap<String, BTreeMap<String, RuleSpec>>);

impl ParameterMapConfig {
    pub fn default_table(&self) -> Option<&BTreeMap<String, RuleSpec>> {
        self.0.get(DEFAULT_RULE_TABLE)
    }

    /// Test-type override tables (everything but `default`).
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, RuleSpec>)> {
        self.0
            .iter()
            .filter(|(name, _)| name.as_str() != DEFAULT_RULE_TABLE)
            .map(|(name, table)| (name.as_str(), table))
    }
}

/// One parameter rule as written in the file.
///
/// `key` and `value` may both be present; `key` wins.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RuleSpec {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub transform: Option<String>,
}
