//! Dispatch planner: expands branch configuration into concrete targets.

use std::collections::HashMap;

use crate::config::BranchConfig;
use crate::domain::{BuildProperties, CanonicalPlatform, DispatchError, DispatchTarget};

#[derive(Debug, Clone, Default)]
struct BranchPlan {
    test_types: Vec<String>,
    nodes: HashMap<CanonicalPlatform, Vec<String>>,
}

/// Branch -> test types x platform nodes.
#[derive(Debug, Clone, Default)]
pub struct DispatchPlanner {
    branches: HashMap<String, BranchPlan>,
}

impl DispatchPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(by_branch: &HashMap<String, BranchConfig>) -> Self {
        let mut planner = Self::new();
        for (branch, config) in by_branch {
            planner = planner.with_branch(
                branch.clone(),
                config.testruns.clone(),
                config.platforms.clone(),
            );
        }
        planner
    }

    pub fn with_branch(
        mut self,
        branch: impl Into<String>,
        test_types: Vec<String>,
        nodes: HashMap<CanonicalPlatform, Vec<String>>,
    ) -> Self {
        self.branches
            .insert(branch.into(), BranchPlan { test_types, nodes });
        self
    }

    pub fn is_configured(&self, branch: &str) -> bool {
        self.branches.contains_key(branch)
    }

    /// Targets for a build of `branch` described by `properties`.
    ///
    /// The branch must be configured before the platform is even looked at.
    /// The platform property is then translated to its canonical identifier.
    /// Test types keep configuration order, and so do nodes within each test
    /// type. A platform without nodes under the branch yields no targets.
    pub fn plan(
        &self,
        branch: &str,
        properties: &BuildProperties,
    ) -> Result<Vec<DispatchTarget>, DispatchError> {
        let plan = self.branch_plan(branch)?;
        let raw = properties.platform().ok_or(DispatchError::MissingPlatform)?;
        let platform = CanonicalPlatform::from_raw(&raw)?;
        Ok(plan.targets(branch, platform))
    }

    pub fn plan_for(
        &self,
        branch: &str,
        platform: CanonicalPlatform,
    ) -> Result<Vec<DispatchTarget>, DispatchError> {
        Ok(self.branch_plan(branch)?.targets(branch, platform))
    }

    fn branch_plan(&self, branch: &str) -> Result<&BranchPlan, DispatchError> {
        self.branches
            .get(branch)
            .ok_or_else(|| DispatchError::UnconfiguredBranch(branch.to_string()))
    }
}

impl BranchPlan {
    fn targets(&self, branch: &str, platform: CanonicalPlatform) -> Vec<DispatchTarget> {
        let Some(nodes) = self.nodes.get(&platform) else {
            return Vec::new();
        };
        self.test_types
            .iter()
            .flat_map(|test_type| {
                nodes
                    .iter()
                    .map(move |node| DispatchTarget::new(branch, test_type.clone(), platform, node.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> DispatchPlanner {
        DispatchPlanner::new().with_branch(
            "mozilla-central",
            vec!["smoke".into(), "full".into()],
            HashMap::from([
                (
                    CanonicalPlatform::Mac,
                    vec!["node-mac-1".to_string(), "node-mac-2".to_string()],
                ),
                (CanonicalPlatform::Win32, vec!["node-xp".to_string()]),
            ]),
        )
    }

    fn props(platform: &str) -> BuildProperties {
        let mut p = BuildProperties::new();
        p.insert("platform", platform);
        p
    }

    #[test]
    fn expands_test_types_by_nodes_in_order() {
        let targets = planner().plan("mozilla-central", &props("macosx64")).unwrap();
        let got: Vec<(&str, CanonicalPlatform, &str)> = targets
            .iter()
            .map(|t| (t.test_type.as_str(), t.platform, t.node.as_str()))
            .collect();

        assert_eq!(
            got,
            vec![
                ("smoke", CanonicalPlatform::Mac, "node-mac-1"),
                ("smoke", CanonicalPlatform::Mac, "node-mac-2"),
                ("full", CanonicalPlatform::Mac, "node-mac-1"),
                ("full", CanonicalPlatform::Mac, "node-mac-2"),
            ]
        );
        assert!(targets.iter().all(|t| t.branch == "mozilla-central"));
    }

    #[test]
    fn debug_builds_use_the_same_nodes() {
        let targets = planner().plan("mozilla-central", &props("win32-debug")).unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| t.node == "node-xp"));
    }

    #[test]
    fn platform_without_nodes_plans_nothing() {
        let targets = planner().plan("mozilla-central", &props("linux64")).unwrap();
        assert!(targets.is_empty());
    }

    #[test]
    fn unconfigured_branch_is_an_inconsistency() {
        let err = planner().plan("mozilla-beta", &props("linux")).unwrap_err();
        assert!(err.is_config_inconsistency());
    }

    #[test]
    fn unconfigured_branch_wins_over_unknown_platform() {
        let err = planner().plan("mozilla-beta", &props("android")).unwrap_err();
        assert!(matches!(err, DispatchError::UnconfiguredBranch(ref b) if b == "mozilla-beta"));
    }

    #[test]
    fn unknown_platform_is_a_lookup_failure() {
        let err = planner().plan("mozilla-central", &props("android")).unwrap_err();
        assert!(matches!(err, DispatchError::Platform(_)));
    }

    #[test]
    fn missing_platform_is_reported() {
        let err = planner().plan("mozilla-central", &BuildProperties::new()).unwrap_err();
        assert!(matches!(err, DispatchError::MissingPlatform));
    }
}
