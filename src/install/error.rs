// ABOUTME: Install error taxonomy: preconditions, cluster, chart resolution, stuck and hard failures.
// ABOUTME: Each variant keeps its original cause and may carry a remediation hint.

use crate::cluster::ClusterError;
use crate::helm::HelmError;
use crate::runtime::RuntimeError;

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("container runtime is not ready: {0}")]
    RuntimeNotReady(#[source] RuntimeError),

    #[error("port {port} is not available: {source}")]
    PortUnavailable {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("cluster {cluster} cannot be used: {reason}")]
    ClusterInvalid { cluster: String, reason: String },

    #[error(transparent)]
    Cluster(ClusterError),

    #[error("failed to resolve chart {chart}: {source}")]
    ChartResolve {
        chart: String,
        #[source]
        source: HelmError,
    },

    #[error("release {release} is stuck: another Helm operation was still in progress after {attempts} attempt(s)")]
    Stuck {
        release: String,
        attempts: u32,
        #[source]
        source: HelmError,
    },

    #[error("failed to install {release}: {source}")]
    Chart {
        release: String,
        #[source]
        source: HelmError,
    },

    #[error("install cancelled")]
    Cancelled,
}

impl From<ClusterError> for InstallError {
    fn from(source: ClusterError) -> Self {
        if source.is_cancelled() {
            InstallError::Cancelled
        } else {
            InstallError::Cluster(source)
        }
    }
}

impl InstallError {
    /// Release lock contention that outlived every retry.
    pub fn is_stuck(&self) -> bool {
        matches!(self, InstallError::Stuck { .. })
    }

    /// The underlying Helm error for chart failures.
    pub fn helm_cause(&self) -> Option<&HelmError> {
        match self {
            InstallError::ChartResolve { source, .. }
            | InstallError::Stuck { source, .. }
            | InstallError::Chart { source, .. } => Some(source),
            _ => None,
        }
    }

    /// A suggested next step for the user, where one exists.
    pub fn hint(&self) -> Option<String> {
        match self {
            InstallError::RuntimeNotReady(e) => Some(e.start_hint()),
            InstallError::PortUnavailable { port, .. } => Some(format!(
                "free port {} or choose another one with --port",
                port
            )),
            InstallError::ClusterInvalid { .. } => {
                Some("run `kindle uninstall` to remove the cluster, then install again".to_string())
            }
            InstallError::Stuck { .. } => {
                Some("run `kindle uninstall --keep-cluster`, then install again".to_string())
            }
            InstallError::Chart { .. } | InstallError::ChartResolve { .. } => {
                match self.helm_cause() {
                    Some(HelmError::NotInstalled) => {
                        Some("install helm and make sure it is on PATH".to_string())
                    }
                    _ => Some("re-run with --verbose for more detail".to_string()),
                }
            }
            InstallError::Cluster(_) | InstallError::Cancelled => None,
        }
    }
}
