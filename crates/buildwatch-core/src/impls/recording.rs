//! In-memory job triggers: dry-run logging and call recording.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::domain::{JobParameters, NODES_PARAM};
use crate::ports::{JobTrigger, TriggerError};

/// Logs what would be triggered and always succeeds.
#[derive(Debug, Default)]
pub struct DryRunTrigger;

#[async_trait]
impl JobTrigger for DryRunTrigger {
    async fn trigger(&self, job: &str, parameters: &JobParameters) -> Result<(), TriggerError> {
        info!(job, %parameters, "dry run: job not triggered");
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

/// One recorded `trigger` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCall {
    pub job: String,
    pub parameters: JobParameters,
}

/// Records every call. Calls whose `NODES` parameter is in the failing set
/// are recorded and then fail.
#[derive(Debug, Default)]
pub struct RecordingTrigger {
    calls: Mutex<Vec<TriggerCall>>,
    failing_nodes: HashSet<String>,
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, node: impl Into<String>) -> Self {
        self.failing_nodes.insert(node.into());
        self
    }

    pub fn calls(&self) -> Vec<TriggerCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobTrigger for RecordingTrigger {
    async fn trigger(&self, job: &str, parameters: &JobParameters) -> Result<(), TriggerError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(TriggerCall {
                job: job.to_string(),
                parameters: parameters.clone(),
            });
        }
        match parameters.get(NODES_PARAM) {
            Some(node) if self.failing_nodes.contains(node) => {
                Err(TriggerError::Other(format!("node {node} is offline")))
            }
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}
