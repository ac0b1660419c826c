// ABOUTME: Namespace-scoped pod listing and log retrieval for post-failure diagnostics.
// ABOUTME: Kubectl drives the kubectl binary against the cluster's context.

mod kubectl;

pub use kubectl::Kubectl;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum PodError {
    #[error("kubectl is not installed")]
    NotInstalled,

    #[error("kubectl {operation} failed: {message}")]
    Failed { operation: String, message: String },

    #[error("kubectl {operation} was cancelled")]
    Cancelled { operation: String },
}

/// Pod lifecycle phase as reported by the API server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodSummary {
    pub name: String,
    pub phase: PodPhase,
    /// Short machine-readable reason, e.g. `Evicted`.
    pub reason: Option<String>,
}

impl PodSummary {
    pub fn is_failed(&self) -> bool {
        self.phase == PodPhase::Failed
    }
}

#[async_trait]
pub trait PodClient: Send + Sync {
    async fn list_pods(
        &self,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<PodSummary>, PodError>;

    /// Last `tail` lines of the pod's logs.
    async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        tail: u32,
        cancel: &CancellationToken,
    ) -> Result<String, PodError>;
}
