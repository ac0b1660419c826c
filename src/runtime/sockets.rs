// ABOUTME: Per-runtime socket detectors producing ordered candidate endpoints.
// ABOUTME: CLI-reported endpoint first, then OS defaults, then Docker-compat fallbacks for Podman.

use super::detection::DetectionError;
use super::executor::CommandExecutor;
use super::types::{Os, RuntimeKind};
use crate::config::HostEnv;
use crate::types::Endpoint;
use async_trait::async_trait;
use nonempty::NonEmpty;
use tokio_util::sync::CancellationToken;

const DOCKER_SOCKET: &str = "/var/run/docker.sock";
const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_PIPE: &str = "docker_engine";
const PODMAN_MACHINE_PIPE: &str = "podman-machine-default";
const PODMAN_PIPE: &str = "podman_engine";

/// Enumerates plausible endpoints for one runtime without checking reachability.
#[async_trait]
pub trait SocketDetector: Send + Sync {
    fn runtime(&self) -> RuntimeKind;

    /// Ordered candidates for `os`. Never fails just because no socket exists.
    async fn detect_sockets(
        &self,
        os: Os,
        cancel: &CancellationToken,
    ) -> Result<NonEmpty<Endpoint>, DetectionError>;
}

/// Ordered, de-duplicated endpoint list.
#[derive(Debug, Default)]
struct Candidates(Vec<Endpoint>);

impl Candidates {
    fn push(&mut self, endpoint: Endpoint) {
        if !self.0.contains(&endpoint) {
            self.0.push(endpoint);
        }
    }

    fn extend(&mut self, endpoints: impl IntoIterator<Item = Endpoint>) {
        for endpoint in endpoints {
            self.push(endpoint);
        }
    }

    fn finish(self, runtime: RuntimeKind) -> Result<NonEmpty<Endpoint>, DetectionError> {
        NonEmpty::from_vec(self.0).ok_or(DetectionError::NoCandidates { runtime })
    }
}

/// Shared inputs for both detectors.
struct DetectorContext {
    host: HostEnv,
    prefer_rootless: bool,
    cli: Option<Box<dyn CommandExecutor>>,
}

impl DetectorContext {
    /// Rootless sockets go first for a non-root user who has not asked for rootful.
    fn rootless_first(&self) -> bool {
        self.prefer_rootless && !self.host.is_root()
    }

    /// Per-user socket under the runtime dir. Root has none.
    fn user_socket(&self, relative: &str) -> Option<Endpoint> {
        if self.host.is_root() {
            return None;
        }
        self.host
            .runtime_dir()
            .map(|dir| Endpoint::unix(dir.join(relative).to_string_lossy()))
    }

    fn home_socket(&self, relative: &str) -> Option<Endpoint> {
        self.host
            .home
            .as_deref()
            .map(|home| Endpoint::unix(home.join(relative).to_string_lossy()))
    }

    async fn cli_endpoints(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Endpoint>, DetectionError> {
        let Some(cli) = &self.cli else {
            return Ok(Vec::new());
        };
        match cli.context_inspect(cancel).await {
            Ok(endpoints) => Ok(endpoints),
            Err(e) if e.is_cancelled() => Err(DetectionError::Cancelled),
            Err(e) => {
                tracing::debug!("{} CLI did not report an endpoint: {}", cli.runtime_name(), e);
                Ok(Vec::new())
            }
        }
    }

    /// Push `rootless` and `rootful` in the order the rootless rule dictates.
    fn push_pair(&self, list: &mut Candidates, rootless: Option<Endpoint>, rootful: Endpoint) {
        if self.rootless_first() {
            list.extend(rootless);
            list.push(rootful);
        } else {
            list.push(rootful);
            list.extend(rootless);
        }
    }
}

// =============================================================================
// Docker
// =============================================================================

/// Socket detector for Docker Engine and Docker Desktop.
pub struct DockerSockets {
    ctx: DetectorContext,
}

impl DockerSockets {
    pub fn new(host: HostEnv, prefer_rootless: bool) -> Self {
        Self {
            ctx: DetectorContext {
                host,
                prefer_rootless,
                cli: None,
            },
        }
    }

    /// Ask this CLI for its active context before falling back to defaults.
    pub fn with_cli(mut self, cli: Box<dyn CommandExecutor>) -> Self {
        self.ctx.cli = Some(cli);
        self
    }

    fn defaults(&self, os: Os, list: &mut Candidates) {
        match os {
            Os::Linux => {
                let rootless = self.ctx.user_socket("docker.sock");
                self.ctx.push_pair(list, rootless, Endpoint::unix(DOCKER_SOCKET));
            }
            Os::MacOs => {
                list.extend(self.ctx.home_socket(".docker/run/docker.sock"));
                list.extend(self.ctx.home_socket(".docker/desktop/docker.sock"));
                list.push(Endpoint::unix(DOCKER_SOCKET));
            }
            Os::Windows => list.push(Endpoint::npipe(DOCKER_PIPE)),
        }
    }
}

#[async_trait]
impl SocketDetector for DockerSockets {
    fn runtime(&self) -> RuntimeKind {
        RuntimeKind::Docker
    }

    async fn detect_sockets(
        &self,
        os: Os,
        cancel: &CancellationToken,
    ) -> Result<NonEmpty<Endpoint>, DetectionError> {
        let mut list = Candidates::default();
        list.extend(self.ctx.cli_endpoints(cancel).await?);
        self.defaults(os, &mut list);
        list.finish(RuntimeKind::Docker)
    }
}

// =============================================================================
// Podman
// =============================================================================

/// Socket detector for Podman (native service, machine VM, or Docker-compat shim).
pub struct PodmanSockets {
    ctx: DetectorContext,
}

impl PodmanSockets {
    pub fn new(host: HostEnv, prefer_rootless: bool) -> Self {
        Self {
            ctx: DetectorContext {
                host,
                prefer_rootless,
                cli: None,
            },
        }
    }

    /// Ask this CLI for its connection list before falling back to defaults.
    pub fn with_cli(mut self, cli: Box<dyn CommandExecutor>) -> Self {
        self.ctx.cli = Some(cli);
        self
    }

    fn defaults(&self, os: Os, list: &mut Candidates) {
        match os {
            Os::Linux => {
                let rootless = self.ctx.user_socket("podman/podman.sock");
                self.ctx.push_pair(list, rootless, Endpoint::unix(ROOTFUL_PODMAN));
            }
            Os::MacOs => {
                list.extend(
                    self.ctx
                        .home_socket(".local/share/containers/podman/machine/podman.sock"),
                );
                list.extend(self.ctx.home_socket(
                    ".local/share/containers/podman/machine/podman-machine-default/podman.sock",
                ));
            }
            Os::Windows => {
                list.push(Endpoint::npipe(PODMAN_MACHINE_PIPE));
                list.push(Endpoint::npipe(PODMAN_PIPE));
            }
        }
    }

    /// Many Podman installs proxy Docker's socket path, so it is always a fallback.
    fn docker_compat(os: Os) -> Endpoint {
        match os {
            Os::Windows => Endpoint::npipe(DOCKER_PIPE),
            Os::Linux | Os::MacOs => Endpoint::unix(DOCKER_SOCKET),
        }
    }
}

#[async_trait]
impl SocketDetector for PodmanSockets {
    fn runtime(&self) -> RuntimeKind {
        RuntimeKind::Podman
    }

    async fn detect_sockets(
        &self,
        os: Os,
        cancel: &CancellationToken,
    ) -> Result<NonEmpty<Endpoint>, DetectionError> {
        let mut list = Candidates::default();
        list.extend(self.ctx.cli_endpoints(cancel).await?);
        self.defaults(os, &mut list);
        list.push(Self::docker_compat(os));
        list.finish(RuntimeKind::Podman)
    }
}

