// ABOUTME: RuntimeProvider, the composition root owning the validated client and CLI executor.
// ABOUTME: Exposes capability queries derived from fresh runtime info on every call.

use super::client::{ClientFactory, Connector, Ping, ValidatedClient};
use super::detection::{AutoDetector, DetectionError};
use super::error::RuntimeError;
use super::executor::{
    CommandExecutor, DockerCommand, PodmanCommand, default_executors, detect_executor_from,
    executor_for,
};
use super::info::{Capabilities, RuntimeInfo};
use super::sockets::{DockerSockets, PodmanSockets, SocketDetector};
use super::types::{Os, RuntimeConfig, RuntimeKind};
use crate::config::HostEnv;
use crate::types::Endpoint;
use async_trait::async_trait;
use bollard::Docker;
use nonempty::NonEmpty;
use tokio_util::sync::CancellationToken;

/// Readiness precondition checked before any cluster work.
#[async_trait]
pub trait RuntimeCheck: Send + Sync {
    async fn ensure_ready(&self, cancel: &CancellationToken) -> Result<(), RuntimeError>;
}

/// A connected container runtime.
///
/// The client and executor are chosen independently and may disagree on
/// runtime: the client serves API calls, the executor CLI introspection.
pub struct RuntimeProvider<C = Docker> {
    kind: RuntimeKind,
    client: ValidatedClient<C>,
    executor: Box<dyn CommandExecutor>,
}

impl std::fmt::Debug for RuntimeProvider<Docker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeProvider")
            .field("kind", &self.kind)
            .field("executor", &self.executor.runtime_name())
            .finish_non_exhaustive()
    }
}

impl RuntimeProvider<Docker> {
    /// Detect, connect and validate a runtime on this host.
    pub async fn connect(
        config: &RuntimeConfig,
        host: &HostEnv,
        cancel: &CancellationToken,
    ) -> Result<Self, RuntimeError> {
        let os = Os::current()?;
        let (kind, candidates) = resolve_candidates(config, host, os, cancel).await?;

        let factory = ClientFactory::new().with_override(config.explicit_socket().cloned());
        Self::assemble(kind, &candidates, &factory, default_executors(), cancel).await
    }
}

impl<C: Ping> RuntimeProvider<C> {
    /// Pick the CLI executor from `executors`, then validate an API client for `kind`.
    ///
    /// No endpoint is dialed until an executor has been settled. When no CLI
    /// answers, the executor for `kind` is used as-is.
    pub async fn assemble<K: Connector<Client = C>>(
        kind: RuntimeKind,
        candidates: &NonEmpty<Endpoint>,
        factory: &ClientFactory<K>,
        executors: Vec<Box<dyn CommandExecutor>>,
        cancel: &CancellationToken,
    ) -> Result<Self, RuntimeError> {
        let executor = match detect_executor_from(executors, cancel).await {
            Ok(executor) => executor,
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => {
                tracing::debug!("{}; falling back to the {} CLI", e, kind.binary());
                executor_for(kind)
            }
        };

        let client = factory.create_client(kind, candidates, cancel).await?;
        Ok(Self::from_parts(client, executor))
    }

    /// Assemble a provider from an already validated client.
    pub fn from_parts(client: ValidatedClient<C>, executor: Box<dyn CommandExecutor>) -> Self {
        let kind = match client.runtime() {
            RuntimeKind::Auto => executor.runtime(),
            kind => kind,
        };
        Self {
            kind,
            client,
            executor,
        }
    }

    /// Resolved runtime. Never `Auto`.
    pub fn kind(&self) -> RuntimeKind {
        self.kind
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.client.endpoint()
    }

    pub fn client(&self) -> &C {
        self.client.client()
    }

    pub fn executor(&self) -> &dyn CommandExecutor {
        self.executor.as_ref()
    }

    /// Fresh system facts from the runtime CLI.
    pub async fn info(&self, cancel: &CancellationToken) -> Result<RuntimeInfo, RuntimeError> {
        Ok(self.executor.info(cancel).await?)
    }

    /// Capability flags, recomputed from a new info fetch.
    pub async fn capabilities(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Capabilities, RuntimeError> {
        let info = self.info(cancel).await?;
        Ok(Capabilities::from_info(&info))
    }

    /// `None` when the runtime could not be introspected.
    pub async fn is_rootless(&self, cancel: &CancellationToken) -> Option<bool> {
        self.degraded(cancel).await.map(|caps| caps.rootless)
    }

    /// `None` when the runtime could not be introspected or did not report a version.
    pub async fn cgroup_version(&self, cancel: &CancellationToken) -> Option<String> {
        self.degraded(cancel)
            .await
            .map(|caps| caps.cgroup_version)
            .filter(|version| !version.is_empty())
    }

    pub async fn is_compatible_with(
        &self,
        required: &Capabilities,
        cancel: &CancellationToken,
    ) -> Result<bool, RuntimeError> {
        Ok(self.capabilities(cancel).await?.is_compatible_with(required))
    }

    async fn degraded(&self, cancel: &CancellationToken) -> Option<Capabilities> {
        match self.capabilities(cancel).await {
            Ok(caps) => Some(caps),
            Err(e) => {
                tracing::debug!("capability introspection unavailable: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl<C: Ping> RuntimeCheck for RuntimeProvider<C> {
    async fn ensure_ready(&self, cancel: &CancellationToken) -> Result<(), RuntimeError> {
        tokio::select! {
            result = self.client().ping() => result.map_err(|message| RuntimeError::Unavailable {
                runtime: self.kind,
                message,
            }),
            _ = cancel.cancelled() => Err(RuntimeError::Connection {
                source: super::client::ConnectError::Cancelled { runtime: self.kind },
            }),
        }
    }
}

/// Pick the runtime and its candidate endpoints from configuration.
async fn resolve_candidates(
    config: &RuntimeConfig,
    host: &HostEnv,
    os: Os,
    cancel: &CancellationToken,
) -> Result<(RuntimeKind, NonEmpty<Endpoint>), RuntimeError> {
    if let Some(socket) = config.explicit_socket() {
        let kind = match config.preferred() {
            RuntimeKind::Auto => guess_kind(socket),
            kind => kind,
        };
        tracing::debug!("using explicit {} socket", kind);
        return Ok((kind, NonEmpty::new(socket.clone())));
    }

    let auto = AutoDetector::new(host, config.prefer_rootless(), os);
    match config.preferred() {
        RuntimeKind::Auto => {
            let detection = auto.detect_runtime(cancel).await?;
            Ok((detection.kind, detection.sockets))
        }
        kind => {
            let detector: Box<dyn SocketDetector> = match kind {
                RuntimeKind::Podman => Box::new(
                    PodmanSockets::new(host.clone(), config.prefer_rootless())
                        .with_cli(Box::new(PodmanCommand)),
                ),
                _ => Box::new(
                    DockerSockets::new(host.clone(), config.prefer_rootless())
                        .with_cli(Box::new(DockerCommand)),
                ),
            };
            let sockets = auto
                .reachable(detector.as_ref(), cancel)
                .await?
                .ok_or(DetectionError::NotReachable { runtime: kind })?;
            Ok((kind, sockets))
        }
    }
}

/// Runtime implied by an explicit socket path when none was requested.
pub fn guess_kind(endpoint: &Endpoint) -> RuntimeKind {
    if endpoint.as_str().to_ascii_lowercase().contains("podman") {
        RuntimeKind::Podman
    } else {
        RuntimeKind::Docker
    }
}
