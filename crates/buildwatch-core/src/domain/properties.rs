//! Build properties extracted from a notification payload.

use std::collections::HashMap;

use serde_json::Value;

use super::notification::Notification;

pub const DEFAULT_LOCALE: &str = "en-US";

/// Derived key resolving to the installer download URL (see [`BuildProperties::installer_url`]).
pub const INSTALLER_URL_KEY: &str = "installerUrl";

/// Flat name -> value view of `payload.build.properties`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildProperties(HashMap<String, Value>);

/// Flatten the `(name, value, source)` triples of a notification.
///
/// Never fails: a missing payload, build section or property list yields an
/// empty mapping. The source tag is dropped and a repeated name keeps the
/// last value.
pub fn extract(notification: &Notification) -> BuildProperties {
    let Some(entries) = notification
        .payload()
        .and_then(|p| p.get("build"))
        .and_then(|b| b.get("properties"))
        .and_then(Value::as_array)
    else {
        return BuildProperties::default();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let triple = entry.as_array()?;
            let name = triple.first()?.as_str()?;
            let value = triple.get(1)?;
            Some((name.to_string(), value.clone()))
        })
        .collect()
}

impl FromIterator<(String, Value)> for BuildProperties {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl BuildProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text form of a property, `None` when absent or null.
    ///
    /// Also resolves the derived [`INSTALLER_URL_KEY`].
    pub fn lookup(&self, name: &str) -> Option<String> {
        match self.get(name) {
            Some(value) => value_to_text(value),
            None if name == INSTALLER_URL_KEY => self.installer_url(),
            None => None,
        }
    }

    pub fn product(&self) -> Option<String> {
        self.lookup("product")
    }

    pub fn branch(&self) -> Option<String> {
        self.lookup("branch")
    }

    pub fn platform(&self) -> Option<String> {
        self.lookup("platform")
    }

    pub fn locale(&self) -> String {
        self.lookup("locale")
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
    }

    /// URL of the package to test.
    ///
    /// `packageUrl` points at the archive; when an `installerFilename` is
    /// published next to it (Windows builds), the installer in the same
    /// directory is used instead.
    pub fn installer_url(&self) -> Option<String> {
        let package_url = self.lookup("packageUrl")?;
        match self.lookup("installerFilename") {
            Some(installer) => {
                let dir = package_url
                    .rsplit_once('/')
                    .map(|(dir, _)| dir)
                    .unwrap_or_default();
                Some(format!("{dir}/{installer}"))
            }
            None => Some(package_url),
        }
    }
}

/// Render a JSON value as a job parameter string. Null is "no value".
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn notification(payload: Value) -> Notification {
        Notification::from_value(json!({
            "_meta": { "routing_key": "build.x.y.finished", "sent": "t" },
            "payload": payload,
        }))
    }

    #[rstest]
    #[case::null_payload(Value::Null)]
    #[case::no_build(json!({}))]
    #[case::no_properties(json!({ "build": {} }))]
    #[case::empty_list(json!({ "build": { "properties": [] } }))]
    #[case::properties_not_a_list(json!({ "build": { "properties": "oops" } }))]
    fn absent_properties_yield_empty_mapping(#[case] payload: Value) {
        assert!(extract(&notification(payload)).is_empty());
    }

    #[test]
    fn flattens_triples_dropping_source() {
        let props = extract(&notification(json!({ "build": { "properties": [
            ["product", "firefox", "BuildSlave"],
            ["branch", "mozilla-central", "Build"],
            ["buildid", 20130115030940u64, "Build"],
        ]}})));

        assert_eq!(props.len(), 3);
        assert_eq!(props.product().as_deref(), Some("firefox"));
        assert_eq!(props.branch().as_deref(), Some("mozilla-central"));
        assert_eq!(props.lookup("buildid").as_deref(), Some("20130115030940"));
    }

    #[test]
    fn last_occurrence_wins() {
        let props = extract(&notification(json!({ "build": { "properties": [
            ["platform", "linux", "a"],
            ["platform", "linux64", "b"],
        ]}})));
        assert_eq!(props.platform().as_deref(), Some("linux64"));
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let props = extract(&notification(json!({ "build": { "properties": [
            ["product"],
            "garbage",
            [42, "x", "y"],
            ["locale", "de", "z"],
        ]}})));
        assert_eq!(props.len(), 1);
        assert_eq!(props.locale(), "de");
    }

    #[test]
    fn locale_defaults_to_en_us() {
        assert_eq!(BuildProperties::new().locale(), DEFAULT_LOCALE);
    }

    #[test]
    fn installer_url_replaces_archive_name() {
        let mut props = BuildProperties::new();
        props.insert("packageUrl", "http://ftp/nightly/firefox-21.0a1.en-US.win32.zip");
        assert_eq!(
            props.lookup(INSTALLER_URL_KEY).as_deref(),
            Some("http://ftp/nightly/firefox-21.0a1.en-US.win32.zip")
        );

        props.insert("installerFilename", "firefox-21.0a1.en-US.win32.installer.exe");
        assert_eq!(
            props.installer_url().as_deref(),
            Some("http://ftp/nightly/firefox-21.0a1.en-US.win32.installer.exe")
        );
    }

    #[test]
    fn explicit_property_shadows_derived_key() {
        let mut props = BuildProperties::new();
        props.insert("packageUrl", "http://a/b.zip");
        props.insert(INSTALLER_URL_KEY, "http://override");
        assert_eq!(props.lookup(INSTALLER_URL_KEY).as_deref(), Some("http://override"));
    }
}
