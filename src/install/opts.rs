// ABOUTME: Inputs and outputs of one install run.
// ABOUTME: Built once from CLI flags and host probes, then passed through unchanged.

use crate::cluster::VolumeMount;
use crate::helm::{ChartSource, ReleaseInfo, ReleaseSpec};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// One chart to install as one release.
#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub release: String,
    pub chart: ChartSource,
    pub version: Option<String>,
    pub values: serde_yaml::Mapping,
    /// Apply the stuck-operation retry policy. Otherwise a single attempt is made.
    pub retry: bool,
}

impl ChartRequest {
    pub fn new(release: impl Into<String>, chart: ChartSource) -> Self {
        Self {
            release: release.into(),
            chart,
            version: None,
            values: serde_yaml::Mapping::new(),
            retry: true,
        }
    }

    /// Make a single install attempt, even on lock contention.
    pub fn without_retry(mut self) -> Self {
        self.retry = false;
        self
    }

    pub(crate) fn spec(&self, namespace: &str, wait_timeout: Duration) -> ReleaseSpec {
        ReleaseSpec {
            release: self.release.clone(),
            namespace: namespace.to_string(),
            chart: self.chart.clone(),
            version: self.version.clone(),
            values: self.values.clone(),
            wait_timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstallOpts {
    pub namespace: String,
    /// Host port for ingress.
    pub port: u16,
    pub mounts: Vec<VolumeMount>,
    pub app: ChartRequest,
    pub ingress: Option<ChartRequest>,
    pub wait_timeout: Duration,
}

/// Outcome of a successful install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallSummary {
    pub cluster_created: bool,
    /// Host port ingress is actually published on.
    pub port: u16,
    pub releases: Vec<ReleaseInfo>,
    pub completed_at: DateTime<Utc>,
}
