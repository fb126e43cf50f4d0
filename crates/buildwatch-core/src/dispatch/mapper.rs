//! Parameter mapper: build properties -> job parameters.
//!
//! Rule tables are compiled once when the mapper is built:
//! - every test type with an override table gets `default` overlaid with its
//!   entries (per parameter name, the override replaces the whole rule)
//! - test types without overrides share the `default` table
//!
//! Mapping a target is then a read-only walk over one table.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::transform::Transform;
use crate::config::{ConfigError, DEFAULT_RULE_TABLE, ParameterMapConfig, RuleSpec};
use crate::domain::properties::value_to_text;
use crate::domain::{
    BuildProperties, DispatchTarget, ENV_PLATFORM_PARAM, JobParameters, NODES_PARAM,
    PlatformError,
};

/// Where a parameter's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// Look up a build property, falling back to `default`.
    Property { key: String, default: Option<Value> },
    /// Hard-coded value.
    Literal(Value),
    /// Neither `key` nor `value` given; resolves to nothing.
    Unset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRule {
    pub source: ValueSource,
    pub transform: Option<Transform>,
}

impl ParameterRule {
    pub fn property(key: impl Into<String>) -> Self {
        Self {
            source: ValueSource::Property {
                key: key.into(),
                default: None,
            },
            transform: None,
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self {
            source: ValueSource::Literal(value.into()),
            transform: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        if let ValueSource::Property { default, .. } = &mut self.source {
            *default = Some(value.into());
        }
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    fn compile(table: &str, parameter: &str, spec: &RuleSpec) -> Result<Self, ConfigError> {
        // `key` takes priority over `value` when both are given.
        let source = match (&spec.key, &spec.value) {
            (Some(key), _) => ValueSource::Property {
                key: key.clone(),
                default: spec.default.clone(),
            },
            (None, Some(value)) => ValueSource::Literal(value.clone()),
            (None, None) => ValueSource::Unset,
        };
        let transform = spec
            .transform
            .as_deref()
            .map(|name| {
                name.parse::<Transform>()
                    .map_err(|_| ConfigError::UnknownTransform {
                        table: table.to_string(),
                        parameter: parameter.to_string(),
                        name: name.to_string(),
                    })
            })
            .transpose()?;
        Ok(Self { source, transform })
    }

    pub fn resolve(&self, properties: &BuildProperties) -> Result<Option<String>, PlatformError> {
        let value = match &self.source {
            ValueSource::Property { key, default } => properties
                .lookup(key)
                .or_else(|| default.as_ref().and_then(value_to_text)),
            ValueSource::Literal(value) => value_to_text(value),
            ValueSource::Unset => None,
        };
        match self.transform {
            Some(transform) => transform.apply(value),
            None => Ok(value),
        }
    }
}

/// Parameter name -> rule, for one test type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable(BTreeMap<String, ParameterRule>);

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parameter: impl Into<String>, rule: ParameterRule) {
        self.0.insert(parameter.into(), rule);
    }

    pub fn get(&self, parameter: &str) -> Option<&ParameterRule> {
        self.0.get(parameter)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of `self` with `overrides` replacing same-named rules.
    pub fn overlay(&self, overrides: &RuleTable) -> RuleTable {
        let mut merged = self.clone();
        for (name, rule) in &overrides.0 {
            merged.0.insert(name.clone(), rule.clone());
        }
        merged
    }

    fn compile(table: &str, specs: &BTreeMap<String, RuleSpec>) -> Result<Self, ConfigError> {
        specs
            .iter()
            .map(|(parameter, spec)| {
                Ok((parameter.clone(), ParameterRule::compile(table, parameter, spec)?))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()
            .map(RuleTable)
    }
}

/// Precomputed rule tables for every test type.
#[derive(Debug, Clone, Default)]
pub struct ParameterMapper {
    default: RuleTable,
    by_test_type: HashMap<String, RuleTable>,
}

impl ParameterMapper {
    pub fn new(default: RuleTable) -> Self {
        Self {
            default,
            by_test_type: HashMap::new(),
        }
    }

    /// Register overrides for a test type. Stored already merged with `default`.
    pub fn with_overrides(mut self, test_type: impl Into<String>, overrides: &RuleTable) -> Self {
        let merged = self.default.overlay(overrides);
        self.by_test_type.insert(test_type.into(), merged);
        self
    }

    /// Compile and validate the configured tables. Unknown transform names fail here.
    pub fn from_config(map: &ParameterMapConfig) -> Result<Self, ConfigError> {
        let default = match map.default_table() {
            Some(specs) => RuleTable::compile(DEFAULT_RULE_TABLE, specs)?,
            None => RuleTable::new(),
        };
        let mut mapper = Self::new(default);
        for (test_type, specs) in map.overrides() {
            let overrides = RuleTable::compile(test_type, specs)?;
            mapper = mapper.with_overrides(test_type, &overrides);
        }
        Ok(mapper)
    }

    /// Effective rule table for a test type.
    pub fn table_for(&self, test_type: &str) -> &RuleTable {
        self.by_test_type.get(test_type).unwrap_or(&self.default)
    }

    /// Resolve every rule of the target's test type, then inject `NODES` and
    /// `ENV_PLATFORM` over whatever the rules produced.
    pub fn map_parameters(
        &self,
        target: &DispatchTarget,
        properties: &BuildProperties,
    ) -> Result<JobParameters, PlatformError> {
        let mut parameters = JobParameters::new();
        for (name, rule) in &self.table_for(&target.test_type).0 {
            parameters.insert(name.clone(), rule.resolve(properties)?);
        }

        parameters.insert(NODES_PARAM, Some(target.node.clone()));
        parameters.insert(
            ENV_PLATFORM_PARAM,
            Some(target.platform.environment().to_string()),
        );
        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CanonicalPlatform;
    use serde_json::json;

    fn target(test_type: &str) -> DispatchTarget {
        DispatchTarget::new("mozilla-central", test_type, CanonicalPlatform::Win64, "mm-win-7-64")
    }

    fn props() -> BuildProperties {
        let mut p = BuildProperties::new();
        p.insert("buildid", "20130115030940");
        p.insert("platform", "win64");
        p.insert("appVersion", "21.0a1");
        p
    }

    fn default_table() -> RuleTable {
        let mut t = RuleTable::new();
        t.insert("BUILD_ID", ParameterRule::property("buildid"));
        t.insert("LOCALE", ParameterRule::property("locale").with_default("en-US"));
        t.insert("REPORT_URL", ParameterRule::literal("http://daily/db/"));
        t
    }

    #[test]
    fn key_falls_back_to_rule_default() {
        let mut t = RuleTable::new();
        t.insert("LOCALE", ParameterRule::property("locale").with_default("en-US"));
        let mapper = ParameterMapper::new(t);

        let params = mapper.map_parameters(&target("functional"), &BuildProperties::new()).unwrap();
        assert_eq!(params.get("LOCALE"), Some("en-US"));
    }

    #[test]
    fn missing_key_without_default_is_unresolved() {
        let mut t = RuleTable::new();
        t.insert("PREV_BUILDID", ParameterRule::property("previous_buildid"));
        let params = ParameterMapper::new(t)
            .map_parameters(&target("functional"), &props())
            .unwrap();
        assert!(params.contains("PREV_BUILDID"));
        assert_eq!(params.get("PREV_BUILDID"), None);
    }

    #[test]
    fn override_replaces_rule_wholesale() {
        let mut overrides = RuleTable::new();
        overrides.insert("REPORT_URL", ParameterRule::literal("http://endurance/db/"));
        overrides.insert("BUILD_ID", ParameterRule::literal("fixed"));
        let mapper = ParameterMapper::new(default_table()).with_overrides("endurance", &overrides);

        let endurance = mapper.map_parameters(&target("endurance"), &props()).unwrap();
        assert_eq!(endurance.get("REPORT_URL"), Some("http://endurance/db/"));
        assert_eq!(endurance.get("BUILD_ID"), Some("fixed"));
        // untouched entries come from default
        assert_eq!(endurance.get("LOCALE"), Some("en-US"));

        let functional = mapper.map_parameters(&target("functional"), &props()).unwrap();
        assert_eq!(functional.get("REPORT_URL"), Some("http://daily/db/"));
        assert_eq!(functional.get("BUILD_ID"), Some("20130115030940"));
    }

    #[test]
    fn injected_parameters_win_over_rules() {
        let mut t = default_table();
        t.insert(NODES_PARAM, ParameterRule::literal("somewhere-else"));
        t.insert(ENV_PLATFORM_PARAM, ParameterRule::literal("beos"));

        let params = ParameterMapper::new(t)
            .map_parameters(&target("functional"), &props())
            .unwrap();
        assert_eq!(params.get(NODES_PARAM), Some("mm-win-7-64"));
        assert_eq!(params.get(ENV_PLATFORM_PARAM), Some("windows"));
    }

    #[test]
    fn transform_runs_on_resolved_value() {
        let mut t = RuleTable::new();
        t.insert(
            "PLATFORM",
            ParameterRule::property("platform").with_transform(Transform::PlatformIdentifier),
        );
        let params = ParameterMapper::new(t)
            .map_parameters(&target("functional"), &props())
            .unwrap();
        assert_eq!(params.get("PLATFORM"), Some("win64"));
    }

    #[test]
    fn transform_failure_aborts_mapping() {
        let mut t = RuleTable::new();
        t.insert(
            "ENV",
            ParameterRule::literal("solaris").with_transform(Transform::EnvironmentPlatform),
        );
        let err = ParameterMapper::new(t)
            .map_parameters(&target("functional"), &props())
            .unwrap_err();
        assert_eq!(err, PlatformError::UnknownIdentifier("solaris".into()));
    }

    #[test]
    fn mapping_is_deterministic() {
        let mapper = ParameterMapper::new(default_table());
        let a = mapper.map_parameters(&target("functional"), &props()).unwrap();
        let b = mapper.map_parameters(&target("functional"), &props()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn key_takes_priority_over_value() {
        let spec = RuleSpec {
            key: Some("appVersion".into()),
            value: Some(json!("literal")),
            ..RuleSpec::default()
        };
        let rule = ParameterRule::compile("default", "VERSION", &spec).unwrap();
        assert_eq!(rule.resolve(&props()).unwrap().as_deref(), Some("21.0a1"));
    }

    #[test]
    fn non_string_literals_are_rendered() {
        let rule = ParameterRule::literal(json!(10));
        assert_eq!(rule.resolve(&props()).unwrap().as_deref(), Some("10"));
    }

    #[test]
    fn unknown_transform_fails_at_load() {
        let map: ParameterMapConfig = serde_json::from_value(json!({
            "default": { "LOCALE": { "key": "locale" } },
            "update": { "CHANNEL": { "value": "nightly", "transform": "shout" } }
        }))
        .unwrap();

        let err = ParameterMapper::from_config(&map).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownTransform { ref table, ref name, .. } if table == "update" && name == "shout"
        ));
    }

    #[test]
    fn from_config_precomputes_overlays() {
        let map: ParameterMapConfig = serde_json::from_value(json!({
            "default": {
                "LOCALE": { "key": "locale", "default": "en-US" },
                "REPORT_URL": { "value": "http://daily/db/" }
            },
            "endurance": { "REPORT_URL": { "value": "http://endurance/db/" } }
        }))
        .unwrap();

        let mapper = ParameterMapper::from_config(&map).unwrap();
        assert_eq!(mapper.table_for("endurance").len(), 2);
        assert_eq!(
            mapper.table_for("endurance").get("REPORT_URL"),
            Some(&ParameterRule::literal("http://endurance/db/"))
        );
        assert_eq!(mapper.table_for("functional"), mapper.table_for("anything"));
    }
}
