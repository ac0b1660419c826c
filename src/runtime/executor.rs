// ABOUTME: CommandExecutor abstraction over the docker and podman binaries.
// ABOUTME: Covers what the typed API does not expose: context listing and host security info.

use super::info::RuntimeInfo;
use super::types::RuntimeKind;
use crate::process::{ProcessCommand, ProcessError};
use crate::types::Endpoint;
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Errors from invoking a runtime's CLI. Tagged with runtime and operation.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("{runtime} is not installed")]
    NotInstalled { runtime: RuntimeKind },

    #[error("{runtime} {operation} failed: {message}")]
    Failed {
        runtime: RuntimeKind,
        operation: String,
        message: String,
    },

    #[error("{runtime} {operation} returned unparsable output: {source}")]
    Parse {
        runtime: RuntimeKind,
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{runtime} {operation} was cancelled")]
    Cancelled {
        runtime: RuntimeKind,
        operation: String,
    },

    #[error("no container runtime found (tried podman and docker)")]
    NoRuntimeFound,
}

impl ExecutorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutorError::Cancelled { .. })
    }
}

/// Raw CLI access to a container runtime.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Which runtime this executor drives.
    fn runtime(&self) -> RuntimeKind;

    /// Binary name, e.g. `docker`.
    fn runtime_name(&self) -> &'static str {
        self.runtime().binary()
    }

    /// Run the binary with `args` and return stdout. Non-zero exit is an error.
    async fn execute(
        &self,
        args: &[&str],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ExecutorError>;

    /// Endpoints the CLI itself is configured to use, preferred first.
    async fn context_inspect(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Endpoint>, ExecutorError>;

    /// System facts (cgroups, architecture, security options).
    async fn info(&self, cancel: &CancellationToken) -> Result<RuntimeInfo, ExecutorError>;
}

async fn run_cli(
    runtime: RuntimeKind,
    args: &[&str],
    cancel: &CancellationToken,
) -> Result<Vec<u8>, ExecutorError> {
    let operation = args.join(" ");
    let output = ProcessCommand::new(runtime.binary())
        .args(args.iter().copied())
        .run(cancel)
        .await
        .map_err(|e| match e {
            ProcessError::NotFound { .. } => ExecutorError::NotInstalled { runtime },
            ProcessError::Cancelled { .. } => ExecutorError::Cancelled {
                runtime,
                operation: operation.clone(),
            },
            ProcessError::Io { source, .. } => ExecutorError::Failed {
                runtime,
                operation: operation.clone(),
                message: source.to_string(),
            },
        })?;

    if !output.success() {
        return Err(ExecutorError::Failed {
            runtime,
            operation,
            message: output.failure_message(),
        });
    }

    Ok(output.stdout)
}

fn parse_json<T: for<'de> Deserialize<'de>>(
    runtime: RuntimeKind,
    operation: &str,
    bytes: &[u8],
) -> Result<T, ExecutorError> {
    serde_json::from_slice(bytes).map_err(|source| ExecutorError::Parse {
        runtime,
        operation: operation.to_string(),
        source,
    })
}

// =============================================================================
// Docker
// =============================================================================

/// Executor for the `docker` CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerCommand;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DockerContextWire {
    #[serde(default)]
    endpoints: DockerContextEndpoints,
}

#[derive(Debug, Default, Deserialize)]
struct DockerContextEndpoints {
    #[serde(default)]
    docker: Option<DockerContextHost>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DockerContextHost {
    #[serde(default)]
    host: String,
}

#[async_trait]
impl CommandExecutor for DockerCommand {
    fn runtime(&self) -> RuntimeKind {
        RuntimeKind::Docker
    }

    async fn execute(
        &self,
        args: &[&str],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ExecutorError> {
        run_cli(RuntimeKind::Docker, args, cancel).await
    }

    async fn context_inspect(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Endpoint>, ExecutorError> {
        let stdout = self.execute(&["context", "inspect"], cancel).await?;
        let contexts: Vec<DockerContextWire> =
            parse_json(RuntimeKind::Docker, "context inspect", &stdout)?;
        Ok(contexts
            .into_iter()
            .filter_map(|c| c.endpoints.docker)
            .filter_map(|d| Endpoint::parse(&d.host).ok())
            .collect())
    }

    async fn info(&self, cancel: &CancellationToken) -> Result<RuntimeInfo, ExecutorError> {
        let stdout = self
            .execute(&["info", "--format", "{{json .}}"], cancel)
            .await?;
        RuntimeInfo::from_json(&stdout).map_err(|source| ExecutorError::Parse {
            runtime: RuntimeKind::Docker,
            operation: "info".to_string(),
            source,
        })
    }
}

// =============================================================================
// Podman
// =============================================================================

/// Executor for the `podman` CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct PodmanCommand;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PodmanConnectionWire {
    #[serde(default, rename = "URI")]
    uri: String,
    #[serde(default)]
    default: bool,
}

#[async_trait]
impl CommandExecutor for PodmanCommand {
    fn runtime(&self) -> RuntimeKind {
        RuntimeKind::Podman
    }

    async fn execute(
        &self,
        args: &[&str],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ExecutorError> {
        run_cli(RuntimeKind::Podman, args, cancel).await
    }

    async fn context_inspect(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Endpoint>, ExecutorError> {
        let stdout = self
            .execute(&["system", "connection", "list", "--format", "json"], cancel)
            .await?;
        let mut connections: Vec<PodmanConnectionWire> =
            parse_json(RuntimeKind::Podman, "system connection list", &stdout)?;
        // Stable sort keeps the CLI's order among non-default connections.
        connections.sort_by_key(|c| !c.default);
        Ok(connections
            .into_iter()
            .filter_map(|c| match Endpoint::parse(&c.uri) {
                Ok(endpoint) => Some(endpoint),
                Err(e) => {
                    tracing::debug!("skipping podman connection: {}", e);
                    None
                }
            })
            .collect())
    }

    async fn info(&self, cancel: &CancellationToken) -> Result<RuntimeInfo, ExecutorError> {
        let stdout = self.execute(&["info", "--format", "json"], cancel).await?;
        RuntimeInfo::from_json(&stdout).map_err(|source| ExecutorError::Parse {
            runtime: RuntimeKind::Podman,
            operation: "info".to_string(),
            source,
        })
    }
}

/// Executor for a resolved runtime kind. `Auto` maps to Docker.
pub fn executor_for(kind: RuntimeKind) -> Box<dyn CommandExecutor> {
    match kind {
        RuntimeKind::Podman => Box::new(PodmanCommand),
        RuntimeKind::Docker | RuntimeKind::Auto => Box::new(DockerCommand),
    }
}

/// Pick the first executor whose `version` command succeeds: Podman, then Docker.
pub async fn detect_executor(
    cancel: &CancellationToken,
) -> Result<Box<dyn CommandExecutor>, ExecutorError> {
    detect_executor_from(default_executors(), cancel).await
}

/// The real CLIs in detection order: Podman, then Docker.
pub fn default_executors() -> Vec<Box<dyn CommandExecutor>> {
    vec![Box::new(PodmanCommand), Box::new(DockerCommand)]
}

/// Same as [`detect_executor`] over an explicit, ordered candidate list.
pub async fn detect_executor_from(
    candidates: Vec<Box<dyn CommandExecutor>>,
    cancel: &CancellationToken,
) -> Result<Box<dyn CommandExecutor>, ExecutorError> {
    for candidate in candidates {
        match candidate.execute(&["version"], cancel).await {
            Ok(_) => {
                tracing::debug!("using {} CLI", candidate.runtime_name());
                return Ok(candidate);
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => tracing::debug!("{} CLI unavailable: {}", candidate.runtime_name(), e),
        }
    }
    Err(ExecutorError::NoRuntimeFound)
}
