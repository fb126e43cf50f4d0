//! Dispatch targets and the job parameters produced for them.

use std::collections::BTreeMap;
use std::fmt;

use super::platform::CanonicalPlatform;

/// Always injected: the node label the job is pinned to.
pub const NODES_PARAM: &str = "NODES";

/// Always injected: the environment platform of the target.
pub const ENV_PLATFORM_PARAM: &str = "ENV_PLATFORM";

/// One concrete job invocation: (branch, test type, platform, node).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchTarget {
    pub branch: String,
    pub test_type: String,
    pub platform: CanonicalPlatform,
    pub node: String,
}

impl DispatchTarget {
    pub fn new(
        branch: impl Into<String>,
        test_type: impl Into<String>,
        platform: CanonicalPlatform,
        node: impl Into<String>,
    ) -> Self {
        Self {
            branch: branch.into(),
            test_type: test_type.into(),
            platform,
            node: node.into(),
        }
    }

    /// Scheduled jobs are named `<branch>_<testType>`.
    pub fn job_name(&self) -> String {
        format!("{}_{}", self.branch, self.test_type)
    }
}

impl fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}@{}",
            self.branch, self.test_type, self.platform, self.node
        )
    }
}

/// Parameter name -> value for one job invocation.
///
/// A `None` value means the rule resolved to nothing (missing property and
/// no default). Ordered so logs and requests are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobParameters(BTreeMap<String, Option<String>>);

impl JobParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.0.insert(name.into(), value);
    }

    /// Resolved value of a parameter; `None` when absent or unresolved.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Pairs to submit to the job server. Unresolved parameters are left out
    /// so the job falls back to its own defaults.
    pub fn to_form(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
            .collect()
    }
}

impl fmt::Display for JobParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{name}={}", value.unwrap_or("<none>"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_name_joins_branch_and_test_type() {
        let t = DispatchTarget::new("mozilla-central", "functional", CanonicalPlatform::Mac, "mm-osx-1");
        assert_eq!(t.job_name(), "mozilla-central_functional");
        assert_eq!(t.to_string(), "mozilla-central/functional/mac@mm-osx-1");
    }

    #[test]
    fn form_skips_unresolved_values() {
        let mut p = JobParameters::new();
        p.insert("LOCALE", Some("de".into()));
        p.insert("PREV_BUILDID", None);

        assert_eq!(p.len(), 2);
        assert_eq!(p.to_form(), vec![("LOCALE".to_string(), "de".to_string())]);
        assert_eq!(p.to_string(), "LOCALE=de, PREV_BUILDID=<none>");
    }
}
