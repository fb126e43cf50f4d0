//! Filter engine: decides whether a notification is worth testing.

use std::collections::HashSet;
use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::config::{ConfigError, PulseConfig};
use crate::domain::BuildProperties;

/// Allow-lists plus the routing-key pattern.
///
/// An empty allow-list accepts any value, including a missing one.
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    routing_key: Regex,
    products: HashSet<String>,
    branches: HashSet<String>,
    platforms: HashSet<String>,
    locales: HashSet<String>,
}

/// First criterion a notification failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    RoutingKey,
    Product(Option<String>),
    Branch(Option<String>),
    Platform(Option<String>),
    Locale(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::RoutingKey => f.write_str("routing key does not match"),
            Rejection::Product(v) => write!(f, "product {v:?} not allowed"),
            Rejection::Branch(v) => write!(f, "branch {v:?} not allowed"),
            Rejection::Platform(v) => write!(f, "platform {v:?} not allowed"),
            Rejection::Locale(v) => write!(f, "locale {v:?} not allowed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Rejection),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

impl FilterCriteria {
    /// Criteria with only a routing-key pattern and no allow-list restriction.
    ///
    /// Like Python's `re.match`, the pattern is anchored at the start of the
    /// routing key only.
    pub fn new(routing_key_regex: &str) -> Result<Self, regex::Error> {
        let routing_key = RegexBuilder::new(&format!("^(?:{routing_key_regex})"))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            routing_key,
            products: HashSet::new(),
            branches: HashSet::new(),
            platforms: HashSet::new(),
            locales: HashSet::new(),
        })
    }

    pub fn from_config(pulse: &PulseConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(&pulse.routing_key_regex)?
            .with_products(pulse.products.iter().cloned())
            .with_branches(pulse.branches.iter().cloned())
            .with_platforms(pulse.platforms.iter().cloned())
            .with_locales(pulse.locales.iter().cloned()))
    }

    pub fn with_products(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.products = values.into_iter().collect();
        self
    }

    pub fn with_branches(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.branches = values.into_iter().collect();
        self
    }

    pub fn with_platforms(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.platforms = values.into_iter().collect();
        self
    }

    pub fn with_locales(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.locales = values.into_iter().collect();
        self
    }

    pub fn branches(&self) -> &HashSet<String> {
        &self.branches
    }

    pub fn accepts(&self, routing_key: &str, properties: &BuildProperties) -> bool {
        self.evaluate(routing_key, properties).is_accept()
    }

    /// Check routing key, product, branch, platform and locale in that order,
    /// stopping at the first failure.
    pub fn evaluate(&self, routing_key: &str, properties: &BuildProperties) -> Verdict {
        if !self.routing_key.is_match(routing_key) {
            return Verdict::Reject(Rejection::RoutingKey);
        }

        let product = properties.product();
        if !allowed(&self.products, product.as_deref()) {
            return Verdict::Reject(Rejection::Product(product));
        }

        let branch = properties.branch();
        if !allowed(&self.branches, branch.as_deref()) {
            return Verdict::Reject(Rejection::Branch(branch));
        }

        let platform = properties.platform();
        if !allowed(&self.platforms, platform.as_deref()) {
            return Verdict::Reject(Rejection::Platform(platform));
        }

        let locale = properties.locale();
        if !allowed(&self.locales, Some(&locale)) {
            return Verdict::Reject(Rejection::Locale(locale));
        }

        Verdict::Accept
    }
}

fn allowed(list: &HashSet<String>, value: Option<&str>) -> bool {
    list.is_empty() || value.is_some_and(|v| list.contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const KEY: &str = "build.mozilla-central.linux64.finished";

    fn props() -> BuildProperties {
        let mut p = BuildProperties::new();
        p.insert("product", "firefox");
        p.insert("branch", "mozilla-central");
        p.insert("platform", "linux64");
        p.insert("locale", "en-US");
        p
    }

    fn criteria(platforms: &[&str]) -> FilterCriteria {
        FilterCriteria::new(r"build\..*\.finished")
            .unwrap()
            .with_products(["firefox".to_string()])
            .with_branches(["mozilla-central".to_string()])
            .with_platforms(platforms.iter().map(|s| s.to_string()))
    }

    #[test]
    fn accepts_matching_build() {
        assert!(criteria(&["linux64"]).accepts(KEY, &props()));
    }

    #[test]
    fn rejects_platform_outside_allow_list() {
        let c = criteria(&["win32"]);
        assert!(!c.accepts(KEY, &props()));
        assert_eq!(
            c.evaluate(KEY, &props()),
            Verdict::Reject(Rejection::Platform(Some("linux64".into())))
        );
    }

    #[rstest]
    #[case::thunderbird("thunderbird")]
    #[case::fennec("fennec")]
    #[case::firefox("firefox")]
    fn empty_list_ignores_value(#[case] product: &str) {
        let c = FilterCriteria::new("build").unwrap();
        let mut p = props();
        p.insert("product", product);
        assert!(c.accepts(KEY, &p));
    }

    #[test]
    fn empty_list_accepts_missing_value() {
        let c = FilterCriteria::new("build").unwrap();
        assert!(c.accepts(KEY, &BuildProperties::new()));
    }

    #[test]
    fn non_empty_list_rejects_missing_value() {
        let c = criteria(&[]);
        assert_eq!(
            c.evaluate(KEY, &BuildProperties::new()),
            Verdict::Reject(Rejection::Product(None))
        );
    }

    #[rstest]
    #[case::upper("BUILD.mozilla-central.linux64.FINISHED", true)]
    #[case::heartbeat("heartbeat", false)]
    #[case::not_at_start("x.build.mozilla-central.linux64.finished", false)]
    fn routing_key_is_case_insensitive_and_anchored(#[case] key: &str, #[case] expected: bool) {
        assert_eq!(criteria(&[]).accepts(key, &props()), expected);
    }

    #[test]
    fn routing_key_checked_before_properties() {
        let c = criteria(&["win32"]);
        assert_eq!(c.evaluate("heartbeat", &props()), Verdict::Reject(Rejection::RoutingKey));
    }

    #[test]
    fn locale_allow_list_uses_default_locale() {
        let c = FilterCriteria::new("build")
            .unwrap()
            .with_locales(["en-US".to_string()]);
        assert!(c.accepts(KEY, &BuildProperties::new()));

        let mut p = BuildProperties::new();
        p.insert("locale", "de");
        assert_eq!(c.evaluate(KEY, &p), Verdict::Reject(Rejection::Locale("de".into())));
    }

    #[test]
    fn invalid_regex_is_an_error() {
        assert!(FilterCriteria::new("build.(").is_err());
    }
}
