//! FileArchive - notification をそのままファイルに保存する
//!
//! パス: `<root>/<branch>/<PRODUCT>_<PLATFORM>_<LOCALE>_<TIMESTAMP>.log`
//! 保存したファイルは `FileSource` でそのまま再生できます。

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::{BuildProperties, Notification};
use crate::ports::{ArchiveError, NotificationArchive};

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone)]
pub struct FileArchive {
    root: PathBuf,
}

impl FileArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, notification: &Notification, properties: &BuildProperties) -> PathBuf {
        let branch = properties.branch().unwrap_or_else(|| UNKNOWN.to_string());
        let basename = format!(
            "{}_{}_{}_{}.log",
            properties.product().as_deref().unwrap_or(UNKNOWN),
            properties.platform().as_deref().unwrap_or(UNKNOWN),
            properties.locale(),
            notification.sent(),
        );
        self.root.join(sanitize(&branch)).join(sanitize(&basename))
    }
}

/// Keep names inside their directory.
fn sanitize(segment: &str) -> String {
    segment.replace(['/', '\\'], "_")
}

#[async_trait]
impl NotificationArchive for FileArchive {
    async fn store(
        &self,
        notification: &Notification,
        properties: &BuildProperties,
    ) -> Result<PathBuf, ArchiveError> {
        let path = self.path_for(notification, properties);
        let io_err = |source| ArchiveError::Io {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
        }
        let bytes = serde_json::to_vec(notification.raw())?;
        tokio::fs::write(&path, bytes).await.map_err(io_err)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> (Notification, BuildProperties) {
        let n = Notification::from_value(json!({
            "_meta": { "routing_key": "build.mozilla-central.macosx64.finished", "sent": "2013-01-15T08:40:47Z" },
            "payload": { "build": { "properties": [
                ["product", "firefox", "x"],
                ["branch", "mozilla-central", "x"],
                ["platform", "macosx64", "x"]
            ]}}
        }));
        let p = crate::domain::extract(&n);
        (n, p)
    }

    #[test]
    fn path_uses_branch_directory_and_template() {
        let (n, p) = sample();
        let archive = FileArchive::new("/var/log/buildwatch");
        assert_eq!(
            archive.path_for(&n, &p),
            PathBuf::from("/var/log/buildwatch/mozilla-central/firefox_macosx64_en-US_2013-01-15T08:40:47Z.log")
        );
    }

    #[test]
    fn missing_properties_use_placeholders() {
        let n = Notification::from_value(json!({ "_meta": { "sent": "1" } }));
        let archive = FileArchive::new("log");
        assert_eq!(
            archive.path_for(&n, &BuildProperties::new()),
            PathBuf::from("log/unknown/unknown_unknown_en-US_1.log")
        );
    }

    #[tokio::test]
    async fn stores_raw_notification() {
        let dir = tempfile::tempdir().unwrap();
        let (n, p) = sample();
        let archive = FileArchive::new(dir.path());

        let path = archive.store(&n, &p).await.unwrap();
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(&written, n.raw());
    }

    #[tokio::test]
    async fn unwritable_root_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // a regular file cannot hold the branch directory
        let archive = FileArchive::new(file.path());
        let (n, p) = sample();
        assert!(matches!(archive.store(&n, &p).await, Err(ArchiveError::Io { .. })));
    }
}
