// ABOUTME: kind-backed cluster: create, inspect, and delete a single-node cluster.
// ABOUTME: The cluster config is rendered from typed structs and piped to kind on stdin.

use super::{Cluster, ClusterError, VolumeMount};
use crate::config::KIND_PROVIDER_ENV;
use crate::process::{ProcessCommand, ProcessError, ProcessOutput};
use crate::runtime::{CommandExecutor, ExecutorError, RuntimeKind, executor_for};
use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

const KIND: &str = "kind";
const INGRESS_CONTAINER_PORT: u16 = 80;
const INGRESS_READY_PATCH: &str = "kind: InitConfiguration
nodeRegistration:
  kubeletExtraArgs:
    node-labels: \"ingress-ready=true\"
";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KindConfig<'a> {
    kind: &'static str,
    api_version: &'static str,
    nodes: Vec<KindNode<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KindNode<'a> {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    kubeadm_config_patches: Vec<&'static str>,
    extra_port_mappings: Vec<PortMapping>,
    #[serde(skip_serializing_if = "no_mounts")]
    extra_mounts: &'a [VolumeMount],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PortMapping {
    container_port: u16,
    host_port: u16,
    protocol: &'static str,
}

fn no_mounts(mounts: &&[VolumeMount]) -> bool {
    mounts.is_empty()
}

/// Render the kind cluster config for a control-plane node publishing ingress on `port`.
pub fn kind_config(
    port: u16,
    mounts: &[VolumeMount],
    node_image: Option<&str>,
) -> Result<String, serde_yaml::Error> {
    let config = KindConfig {
        kind: "Cluster",
        api_version: "kind.x-k8s.io/v1alpha4",
        nodes: vec![KindNode {
            role: "control-plane",
            image: node_image,
            kubeadm_config_patches: vec![INGRESS_READY_PATCH],
            extra_port_mappings: vec![PortMapping {
                container_port: INGRESS_CONTAINER_PORT,
                host_port: port,
                protocol: "TCP",
            }],
            extra_mounts: mounts,
        }],
    };
    serde_yaml::to_string(&config)
}

/// A kind cluster running on Docker or Podman.
pub struct KindCluster {
    name: String,
    runtime: RuntimeKind,
    node_image: Option<String>,
    executor: Box<dyn CommandExecutor>,
}

impl KindCluster {
    pub fn new(name: impl Into<String>, runtime: RuntimeKind) -> Self {
        Self {
            name: name.into(),
            runtime,
            node_image: None,
            executor: executor_for(runtime),
        }
    }

    pub fn with_node_image(mut self, image: Option<String>) -> Self {
        self.node_image = image;
        self
    }

    fn control_plane(&self) -> String {
        format!("{}-control-plane", self.name)
    }

    fn command(&self) -> ProcessCommand {
        let command = ProcessCommand::new(KIND);
        match self.runtime {
            RuntimeKind::Podman => command.env(KIND_PROVIDER_ENV, "podman"),
            RuntimeKind::Docker | RuntimeKind::Auto => command,
        }
    }

    async fn run(
        &self,
        operation: &str,
        command: ProcessCommand,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ClusterError> {
        let output = command.run(cancel).await.map_err(|e| match e {
            ProcessError::NotFound { .. } => ClusterError::NotInstalled { tool: KIND },
            ProcessError::Cancelled { .. } => ClusterError::Cancelled {
                operation: operation.to_string(),
            },
            ProcessError::Io { source, .. } => ClusterError::Failed {
                operation: operation.to_string(),
                message: source.to_string(),
            },
        })?;
        if !output.success() {
            return Err(ClusterError::Failed {
                operation: operation.to_string(),
                message: output.failure_message(),
            });
        }
        Ok(output)
    }
}

/// Host port bound to the node's ingress port in `inspect` output.
fn ingress_host_port(inspect: &[u8]) -> Option<u16> {
    let value: serde_json::Value = serde_json::from_slice(inspect).ok()?;
    let pointer = format!(
        "/0/HostConfig/PortBindings/{}~1tcp/0/HostPort",
        INGRESS_CONTAINER_PORT
    );
    value.pointer(&pointer)?.as_str()?.parse().ok()
}

#[async_trait]
impl Cluster for KindCluster {
    fn name(&self) -> &str {
        &self.name
    }

    fn context(&self) -> String {
        format!("kind-{}", self.name)
    }

    async fn exists(&self, cancel: &CancellationToken) -> Result<bool, ClusterError> {
        let output = self
            .run("list", self.command().args(["get", "clusters"]), cancel)
            .await?;
        Ok(output
            .stdout_lossy()
            .lines()
            .any(|line| line.trim() == self.name))
    }

    async fn create(
        &self,
        port: u16,
        mounts: &[VolumeMount],
        cancel: &CancellationToken,
    ) -> Result<(), ClusterError> {
        let config = kind_config(port, mounts, self.node_image.as_deref())?;
        tracing::debug!("kind config:\n{}", config);
        ensure_mount_sources(mounts)?;
        let command = self
            .command()
            .args(["create", "cluster", "--name", self.name.as_str(), "--config", "-"])
            .stdin(config);
        self.run("create", command, cancel).await?;
        Ok(())
    }

    async fn bound_port(&self, cancel: &CancellationToken) -> Result<Option<u16>, ClusterError> {
        let node = self.control_plane();
        match self.executor.execute(&["inspect", node.as_str()], cancel).await {
            Ok(stdout) => Ok(ingress_host_port(&stdout)),
            Err(ExecutorError::Cancelled { .. }) => Err(ClusterError::Cancelled {
                operation: "inspect".to_string(),
            }),
            Err(e) => Err(ClusterError::Failed {
                operation: "inspect".to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn delete(&self, cancel: &CancellationToken) -> Result<(), ClusterError> {
        let command = self
            .command()
            .args(["delete", "cluster", "--name", self.name.as_str()]);
        self.run("delete", command, cancel).await?;
        Ok(())
    }
}

/// Host paths must exist before the node container bind-mounts them.
fn ensure_mount_sources(mounts: &[VolumeMount]) -> Result<(), ClusterError> {
    for mount in mounts {
        std::fs::create_dir_all(&mount.host_path).map_err(|source| ClusterError::Mount {
            path: mount.host_path.clone(),
            source,
        })?;
    }
    Ok(())
}
