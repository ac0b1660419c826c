// ABOUTME: PodClient backed by the kubectl binary.
// ABOUTME: Parses `get pods -o json` and fetches bounded log tails.

use super::{PodClient, PodError, PodPhase, PodSummary};
use crate::process::{ProcessCommand, ProcessError, ProcessOutput};
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct Kubectl {
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PodListWire {
    #[serde(default)]
    items: Vec<PodWire>,
}

#[derive(Debug, Deserialize)]
struct PodWire {
    metadata: PodMetadataWire,
    #[serde(default)]
    status: Option<PodStatusWire>,
}

#[derive(Debug, Deserialize)]
struct PodMetadataWire {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PodStatusWire {
    phase: Option<PodPhase>,
    reason: Option<String>,
}

impl From<PodWire> for PodSummary {
    fn from(wire: PodWire) -> Self {
        let (phase, reason) = match wire.status {
            Some(status) => (status.phase.unwrap_or(PodPhase::Unknown), status.reason),
            None => (PodPhase::Unknown, None),
        };
        PodSummary {
            name: wire.metadata.name,
            phase,
            reason,
        }
    }
}

fn parse_pods(stdout: &[u8]) -> Result<Vec<PodSummary>, PodError> {
    let list: PodListWire = serde_json::from_slice(stdout).map_err(|e| PodError::Failed {
        operation: "get pods".to_string(),
        message: e.to_string(),
    })?;
    Ok(list.items.into_iter().map(PodSummary::from).collect())
}

impl Kubectl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    async fn run(
        &self,
        operation: &str,
        args: &[&str],
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, PodError> {
        let mut command = ProcessCommand::new("kubectl");
        if let Some(context) = &self.context {
            command = command.args(["--context", context.as_str()]);
        }
        let output = command
            .args(args.iter().copied())
            .run(cancel)
            .await
            .map_err(|e| match e {
                ProcessError::NotFound { .. } => PodError::NotInstalled,
                ProcessError::Cancelled { .. } => PodError::Cancelled {
                    operation: operation.to_string(),
                },
                ProcessError::Io { source, .. } => PodError::Failed {
                    operation: operation.to_string(),
                    message: source.to_string(),
                },
            })?;
        if !output.success() {
            return Err(PodError::Failed {
                operation: operation.to_string(),
                message: output.failure_message(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl PodClient for Kubectl {
    async fn list_pods(
        &self,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<PodSummary>, PodError> {
        let output = self
            .run(
                "get pods",
                &["get", "pods", "--namespace", namespace, "-o", "json"],
                cancel,
            )
            .await?;
        parse_pods(&output.stdout)
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        tail: u32,
        cancel: &CancellationToken,
    ) -> Result<String, PodError> {
        let tail = tail.to_string();
        let output = self
            .run(
                "logs",
                &[
                    "logs",
                    pod,
                    "--namespace",
                    namespace,
                    "--all-containers",
                    "--tail",
                    tail.as_str(),
                ],
                cancel,
            )
            .await?;
        Ok(output.stdout_lossy())
    }
}
