//! JenkinsTrigger - job server への HTTP トリガー
//!
//! `POST {url}/job/{job}/buildWithParameters` に form でパラメータを送ります。
//! 値が解決できなかったパラメータは送らず、job 側のデフォルトに任せます。
//! 応答しない server で fan-out が止まらないよう、request / connect の timeout を必ず設定します。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use crate::config::JenkinsConfig;
use crate::domain::JobParameters;
use crate::ports::{JobTrigger, TriggerError};

#[derive(Debug)]
pub struct JenkinsTrigger {
    base: Url,
    username: Option<String>,
    password: Option<String>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl JenkinsTrigger {
    pub fn new(config: &JenkinsConfig) -> Result<Self, TriggerError> {
        let base = Url::parse(&config.url)
            .map_err(|e| TriggerError::Other(format!("invalid job server url {}: {e}", config.url)))?;
        if base.cannot_be_a_base() {
            return Err(TriggerError::Other(format!(
                "job server url cannot be a base: {}",
                config.url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self {
            base,
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    /// Endpoint that queues a parameterized build of `job`.
    pub fn build_url(&self, job: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["job", job, "buildWithParameters"]);
        }
        url
    }
}

#[async_trait]
impl JobTrigger for JenkinsTrigger {
    async fn trigger(&self, job: &str, parameters: &JobParameters) -> Result<(), TriggerError> {
        let url = self.build_url(job);
        debug!(%url, job, "posting build request");

        let mut request = self.client.post(url).form(&parameters.to_form());
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TriggerError::Rejected {
                job: job.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "jenkins"
    }
}
