// ABOUTME: Runtime auto-detection across the Docker and Podman socket detectors.
// ABOUTME: Probes candidates for reachability and returns the winning runtime with live sockets.

use super::executor::{DockerCommand, PodmanCommand};
use super::sockets::{DockerSockets, PodmanSockets, SocketDetector};
use super::types::{Os, RuntimeKind};
use crate::config::HostEnv;
use crate::types::{Endpoint, Scheme};
use async_trait::async_trait;
use nonempty::NonEmpty;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Docker and Podman sockets)")]
    NoRuntimeFound,

    #[error("no reachable {runtime} socket found")]
    NotReachable { runtime: RuntimeKind },

    #[error("no candidate sockets for {runtime}")]
    NoCandidates { runtime: RuntimeKind },

    #[error("unsupported operating system: {0}")]
    UnsupportedOs(String),

    #[error("runtime detection cancelled")]
    Cancelled,
}

/// Result of auto-detection: a resolved runtime and its reachable sockets, in preference order.
#[derive(Debug, Clone)]
pub struct Detection {
    pub kind: RuntimeKind,
    pub sockets: NonEmpty<Endpoint>,
}

/// Cheap reachability check for an endpoint, performed before any API client exists.
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn is_reachable(&self, endpoint: &Endpoint) -> bool;
}

/// Connects to the socket (or opens the pipe) and immediately closes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketProbe;

#[async_trait]
impl Reachability for SocketProbe {
    async fn is_reachable(&self, endpoint: &Endpoint) -> bool {
        let attempt = async {
            match endpoint.scheme() {
                Scheme::Tcp => tokio::net::TcpStream::connect(endpoint.address())
                    .await
                    .is_ok(),
                #[cfg(unix)]
                Scheme::Unix => tokio::net::UnixStream::connect(endpoint.address())
                    .await
                    .is_ok(),
                #[cfg(windows)]
                Scheme::Npipe => {
                    let pipe = endpoint.address().replace('/', "\\");
                    tokio::net::windows::named_pipe::ClientOptions::new()
                        .open(&pipe)
                        .is_ok()
                }
                #[allow(unreachable_patterns)]
                _ => false,
            }
        };
        tokio::time::timeout(PROBE_TIMEOUT, attempt)
            .await
            .unwrap_or(false)
    }
}

/// Runs both socket detectors and picks the first runtime with a live socket.
///
/// Docker is tried first: Podman's candidate list ends with Docker's socket path,
/// so checking Docker first keeps a real Docker daemon from being labelled Podman.
pub struct AutoDetector<R = SocketProbe> {
    detectors: Vec<Box<dyn SocketDetector>>,
    probe: R,
    os: Os,
}

impl AutoDetector<SocketProbe> {
    /// Detectors for the current host, each consulting its runtime's CLI first.
    pub fn new(host: &HostEnv, prefer_rootless: bool, os: Os) -> Self {
        Self::with_parts(
            vec![
                Box::new(
                    DockerSockets::new(host.clone(), prefer_rootless)
                        .with_cli(Box::new(DockerCommand)),
                ),
                Box::new(
                    PodmanSockets::new(host.clone(), prefer_rootless)
                        .with_cli(Box::new(PodmanCommand)),
                ),
            ],
            SocketProbe,
            os,
        )
    }
}

impl<R: Reachability> AutoDetector<R> {
    pub fn with_parts(detectors: Vec<Box<dyn SocketDetector>>, probe: R, os: Os) -> Self {
        Self {
            detectors,
            probe,
            os,
        }
    }

    /// Detect a runtime. The returned kind is never `Auto` and every returned socket answered.
    pub async fn detect_runtime(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Detection, DetectionError> {
        for detector in &self.detectors {
            let runtime = detector.runtime();
            if !runtime.is_resolved() {
                continue;
            }
            if let Some(sockets) = self.reachable(detector.as_ref(), cancel).await? {
                tracing::debug!("detected {} with {} live socket(s)", runtime, sockets.len());
                return Ok(Detection {
                    kind: runtime,
                    sockets,
                });
            }
        }
        Err(DetectionError::NoRuntimeFound)
    }

    /// Reachable candidates of one detector, in candidate order.
    pub async fn reachable(
        &self,
        detector: &dyn SocketDetector,
        cancel: &CancellationToken,
    ) -> Result<Option<NonEmpty<Endpoint>>, DetectionError> {
        let candidates = detector.detect_sockets(self.os, cancel).await?;
        let mut live = Vec::new();
        for endpoint in candidates {
            if cancel.is_cancelled() {
                return Err(DetectionError::Cancelled);
            }
            if self.probe.is_reachable(&endpoint).await {
                live.push(endpoint);
            } else {
                tracing::debug!("{} candidate not reachable", detector.runtime());
            }
        }
        Ok(NonEmpty::from_vec(live))
    }
}
