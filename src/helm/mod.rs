// ABOUTME: Helm collaborator interface: chart repositories, chart metadata and releases.
// ABOUTME: The install orchestrator only sees this trait; HelmCli drives the helm binary.

mod cli;

pub use cli::HelmCli;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Errors from the Helm collaborator.
#[derive(Debug, thiserror::Error)]
pub enum HelmError {
    #[error("helm is not installed")]
    NotInstalled,

    #[error("helm {operation} failed: {message}")]
    Failed { operation: String, message: String },

    #[error("helm {operation} returned unparsable output: {message}")]
    Parse { operation: String, message: String },

    #[error("helm {operation} was cancelled")]
    Cancelled { operation: String },
}

impl HelmError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HelmError::Cancelled { .. })
    }
}

/// A named chart repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRepo {
    pub name: String,
    pub url: String,
}

/// Where a chart comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartSource {
    /// Unpacked chart directory or packaged archive on disk.
    Local(PathBuf),
    /// Chart `name` inside a repository.
    Repository { repo: ChartRepo, name: String },
}

impl ChartSource {
    /// Parse a CLI chart argument: `repo-url#chart` selects a repository chart,
    /// anything else is a local path.
    pub fn parse(input: &str, repo_name: &str) -> Self {
        match input.split_once('#') {
            Some((url, name)) if url.contains("://") && !name.is_empty() => {
                ChartSource::Repository {
                    repo: ChartRepo {
                        name: repo_name.to_string(),
                        url: url.to_string(),
                    },
                    name: name.to_string(),
                }
            }
            _ => ChartSource::Local(PathBuf::from(input)),
        }
    }

    /// Reference as helm expects it on the command line.
    pub fn reference(&self) -> String {
        match self {
            ChartSource::Local(path) => path.to_string_lossy().into_owned(),
            ChartSource::Repository { repo, name } => format!("{}/{}", repo.name, name),
        }
    }

    pub fn repo(&self) -> Option<&ChartRepo> {
        match self {
            ChartSource::Local(_) => None,
            ChartSource::Repository { repo, .. } => Some(repo),
        }
    }
}

impl fmt::Display for ChartSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference())
    }
}

/// Chart metadata as reported by `Chart.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub app_version: Option<String>,
}

/// A deployed release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseInfo {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub status: String,
    pub chart_version: Option<String>,
}

/// Everything needed to install or upgrade one release.
#[derive(Debug, Clone)]
pub struct ReleaseSpec {
    pub release: String,
    pub namespace: String,
    pub chart: ChartSource,
    pub version: Option<String>,
    pub values: serde_yaml::Mapping,
    pub wait_timeout: Duration,
}

/// Helm operations used by the installer.
#[async_trait]
pub trait HelmClient: Send + Sync {
    async fn add_or_update_chart_repo(
        &self,
        repo: &ChartRepo,
        cancel: &CancellationToken,
    ) -> Result<(), HelmError>;

    async fn get_chart(
        &self,
        chart: &ChartSource,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ChartInfo, HelmError>;

    /// `None` when the release does not exist.
    async fn get_release(
        &self,
        release: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ReleaseInfo>, HelmError>;

    async fn install_or_upgrade_chart(
        &self,
        spec: &ReleaseSpec,
        cancel: &CancellationToken,
    ) -> Result<ReleaseInfo, HelmError>;

    async fn uninstall_release_by_name(
        &self,
        release: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<(), HelmError>;
}
