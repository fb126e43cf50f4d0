//! On-demand testruns - 指定した release / candidate build を手動で流す
//!
//! 設定は node group ごとに「platform」と「version[#build] → locale 一覧」を持ち、
//! (node group, build, locale) ごとに `ondemand_<script>` job を 1 つ trigger します。
//!
//! # パラメータ
//! - BUILD_TYPE: `#build` があれば candidate、無ければ release
//! - BUILD_NUMBER: build 番号（無ければ "1"）
//! - ENV_PLATFORM / PLATFORM: node group の platform から
//! - NODES: node label を " && " で連結
//! - LOCALE / REPORT_URL
//!
//! version として解釈できない key は skip します（warn のみ）。

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{ConfigError, JenkinsConfig};
use crate::domain::{CanonicalPlatform, ENV_PLATFORM_PARAM, JobParameters, NODES_PARAM, RunId};
use crate::ports::{IdGenerator, JobTrigger};

pub const DEFAULT_REPORT_URL: &str = "http://mozmill-ondemand.blargon7.com/db/";
const DEFAULT_JENKINS_URL: &str = "http://localhost:8080";

// '5.0', '5.0#3', '5.0b1', '5.0b2#1'
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<version>[\d\.]+(?:\w\d+)?)(?:#(?P<build>\d+))?").expect("version pattern compiles")
});

#[derive(Debug, Clone, Deserialize)]
pub struct OnDemandConfig {
    #[serde(default = "default_jenkins")]
    pub jenkins: JenkinsConfig,
    pub testrun: OnDemandTestrun,
    #[serde(default)]
    pub nodes: Vec<NodeGroup>,
}

fn default_jenkins() -> JenkinsConfig {
    JenkinsConfig::new(DEFAULT_JENKINS_URL)
}

impl OnDemandConfig {
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

#[derive(Debug, Clone, Deserialize)]
pub struct OnDemandTestrun {
    /// Job suffix: the job triggered is `ondemand_<script>`.
    pub script: String,
    #[serde(default = "default_report_url")]
    pub report: String,
}

fn default_report_url() -> String {
    DEFAULT_REPORT_URL.to_string()
}

/// Machines sharing a platform and the builds to test on them.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeGroup {
    pub labels: Vec<String>,
    pub platform: CanonicalPlatform,
    #[serde(default)]
    pub builds: Vec<BuildEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildEntry {
    /// `version` or `version#build`.
    pub version: String,
    pub locales: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub version: String,
    pub build: Option<String>,
}

impl BuildSpec {
    pub fn parse(text: &str) -> Option<Self> {
        let captures = VERSION_PATTERN.captures(text)?;
        Some(Self {
            version: captures.name("version")?.as_str().to_string(),
            build: captures.name("build").map(|m| m.as_str().to_string()),
        })
    }

    pub fn build_type(&self) -> &'static str {
        if self.build.is_some() { "candidate" } else { "release" }
    }

    pub fn build_number(&self) -> &str {
        self.build.as_deref().unwrap_or("1")
    }
}

/// One job to trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnDemandJob {
    pub job: String,
    pub build: BuildSpec,
    pub parameters: JobParameters,
}

pub fn plan(config: &OnDemandConfig) -> Vec<OnDemandJob> {
    let job = format!("ondemand_{}", config.testrun.script);
    let mut jobs = Vec::new();

    for group in &config.nodes {
        let nodes = group.labels.join(" && ");
        for entry in &group.builds {
            let Some(build) = BuildSpec::parse(&entry.version) else {
                warn!(version = %entry.version, %nodes, "not a version, entry skipped");
                continue;
            };
            for locale in &entry.locales {
                let mut parameters = JobParameters::new();
                parameters.insert("BUILD_TYPE", Some(build.build_type().to_string()));
                parameters.insert("BUILD_NUMBER", Some(build.build_number().to_string()));
                parameters.insert(
                    ENV_PLATFORM_PARAM,
                    Some(group.platform.environment().to_string()),
                );
                parameters.insert("LOCALE", Some(locale.clone()));
                parameters.insert(NODES_PARAM, Some(nodes.clone()));
                parameters.insert("PLATFORM", Some(group.platform.to_string()));
                parameters.insert("REPORT_URL", Some(config.testrun.report.clone()));
                jobs.push(OnDemandJob {
                    job: job.clone(),
                    build: build.clone(),
                    parameters,
                });
            }
        }
    }
    jobs
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnDemandSummary {
    pub run_id: RunId,
    pub triggered: usize,
    pub failed: usize,
}

/// Trigger every planned job in order. A failed trigger is logged and the
/// run continues.
pub async fn run(
    config: &OnDemandConfig,
    trigger: &dyn JobTrigger,
    ids: &dyn IdGenerator,
) -> OnDemandSummary {
    let run_id = ids.generate_run_id();
    let jobs = plan(config);
    info!(%run_id, jobs = jobs.len(), trigger = trigger.name(), "on-demand testrun started");

    let mut summary = OnDemandSummary {
        run_id,
        triggered: 0,
        failed: 0,
    };
    for planned in &jobs {
        match trigger.trigger(&planned.job, &planned.parameters).await {
            Ok(()) => {
                summary.triggered += 1;
                info!(
                    %run_id,
                    job = %planned.job,
                    version = %planned.build.version,
                    parameters = %planned.parameters,
                    "job triggered"
                );
            }
            Err(e) => {
                summary.failed += 1;
                warn!(
                    %run_id,
                    job = %planned.job,
                    version = %planned.build.version,
                    parameters = %planned.parameters,
                    error = %e,
                    "job trigger failed"
                );
            }
        }
    }

    info!(%run_id, triggered = summary.triggered, failed = summary.failed, "on-demand testrun finished");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::RecordingTrigger;
    use crate::ports::{SystemClock, UlidGenerator};
    use rstest::rstest;

    const SAMPLE: &str = r#"{
      "testrun": { "script": "update" },
      "nodes": [
        {
          "labels": ["mm-osx-106", "release"],
          "platform": "mac",
          "builds": [
            { "version": "5.0#3", "locales": ["en-US", "de"] },
            { "version": "nightly", "locales": ["fr"] }
          ]
        },
        {
          "labels": ["mm-win-7-64"],
          "platform": "win64",
          "builds": [ { "version": "5.0b2", "locales": ["en-US"] } ]
        }
      ]
    }"#;

    #[rstest]
    #[case::release("5.0", "5.0", None)]
    #[case::candidate("5.0#3", "5.0", Some("3"))]
    #[case::beta("5.0b1", "5.0b1", None)]
    #[case::beta_candidate("5.0b2#1", "5.0b2", Some("1"))]
    fn parses_versions(#[case] text: &str, #[case] version: &str, #[case] build: Option<&str>) {
        let parsed = BuildSpec::parse(text).unwrap();
        assert_eq!(parsed.version, version);
        assert_eq!(parsed.build.as_deref(), build);
    }

    #[test]
    fn version_pattern_compiles_with_both_groups() {
        let names: Vec<&str> = VERSION_PATTERN.capture_names().flatten().collect();
        assert_eq!(names, ["version", "build"]);
    }

    #[rstest]
    #[case::word("nightly")]
    #[case::empty("")]
    #[case::hash_only("#3")]
    fn rejects_non_versions(#[case] text: &str) {
        assert!(BuildSpec::parse(text).is_none());
    }

    #[test]
    fn defaults_apply() {
        let config = OnDemandConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.jenkins.url, "http://localhost:8080");
        assert_eq!(config.testrun.report, DEFAULT_REPORT_URL);
    }

    #[test]
    fn plans_one_job_per_group_build_and_locale() {
        let config = OnDemandConfig::from_json(SAMPLE).unwrap();
        let jobs = plan(&config);
        assert_eq!(jobs.len(), 3);
        assert!(jobs.iter().all(|j| j.job == "ondemand_update"));

        let de = &jobs[1].parameters;
        assert_eq!(de.get("BUILD_TYPE"), Some("candidate"));
        assert_eq!(de.get("BUILD_NUMBER"), Some("3"));
        assert_eq!(de.get("ENV_PLATFORM"), Some("mac"));
        assert_eq!(de.get("LOCALE"), Some("de"));
        assert_eq!(de.get("NODES"), Some("mm-osx-106 && release"));
        assert_eq!(de.get("PLATFORM"), Some("mac"));
        assert_eq!(de.get("REPORT_URL"), Some(DEFAULT_REPORT_URL));

        let win = &jobs[2].parameters;
        assert_eq!(win.get("BUILD_TYPE"), Some("release"));
        assert_eq!(win.get("BUILD_NUMBER"), Some("1"));
        assert_eq!(win.get("ENV_PLATFORM"), Some("windows"));
        assert_eq!(win.get("PLATFORM"), Some("win64"));
    }

    #[tokio::test]
    async fn failed_trigger_does_not_stop_the_run() {
        let config = OnDemandConfig::from_json(SAMPLE).unwrap();
        let trigger = RecordingTrigger::new().failing_on("mm-osx-106 && release");
        let ids = UlidGenerator::new(SystemClock);

        let summary = run(&config, &trigger, &ids).await;
        assert_eq!(summary.triggered, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(trigger.calls().len(), 3);
        assert!(summary.run_id.to_string().starts_with("run-"));
    }
}
