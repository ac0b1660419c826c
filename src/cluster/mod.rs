// ABOUTME: Cluster collaborator interface for the single-node local cluster.
// ABOUTME: KindCluster implements it with the kind CLI on the detected runtime.

mod kind;

pub use kind::{KindCluster, kind_config};

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Errors from the cluster collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("{tool} is not installed")]
    NotInstalled { tool: &'static str },

    #[error("cluster {operation} failed: {message}")]
    Failed { operation: String, message: String },

    #[error("cluster {operation} was cancelled")]
    Cancelled { operation: String },

    #[error("failed to render cluster config: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("cannot prepare mount source {}: {source}", .path.display())]
    Mount {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClusterError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClusterError::Cancelled { .. })
    }
}

/// Host directory made visible inside the cluster node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub host_path: PathBuf,
    pub container_path: String,
}

/// Lifecycle of the local cluster.
#[async_trait]
pub trait Cluster: Send + Sync {
    fn name(&self) -> &str;

    /// Kubernetes context name for this cluster.
    fn context(&self) -> String;

    async fn exists(&self, cancel: &CancellationToken) -> Result<bool, ClusterError>;

    /// Create the cluster with ingress on host `port`.
    async fn create(
        &self,
        port: u16,
        mounts: &[VolumeMount],
        cancel: &CancellationToken,
    ) -> Result<(), ClusterError>;

    /// Host port the existing cluster's ingress is published on, if any.
    async fn bound_port(&self, cancel: &CancellationToken) -> Result<Option<u16>, ClusterError>;

    async fn delete(&self, cancel: &CancellationToken) -> Result<(), ClusterError>;
}
