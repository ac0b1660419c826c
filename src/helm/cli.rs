// ABOUTME: HelmClient implementation that shells out to the helm binary.
// ABOUTME: Values are streamed on stdin; release state is read back as JSON.

use super::{ChartInfo, ChartRepo, ChartSource, HelmClient, HelmError, ReleaseInfo, ReleaseSpec};
use crate::process::{ProcessCommand, ProcessError, ProcessOutput};
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const HELM: &str = "helm";

/// Drives `helm` against one kube context.
#[derive(Debug, Clone, Default)]
pub struct HelmCli {
    kube_context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseWire {
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    version: u32,
    #[serde(default)]
    info: ReleaseStatusWire,
    #[serde(default)]
    chart: Option<ReleaseChartWire>,
}

#[derive(Debug, Default, Deserialize)]
struct ReleaseStatusWire {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseChartWire {
    metadata: ChartInfo,
}

impl From<ReleaseWire> for ReleaseInfo {
    fn from(wire: ReleaseWire) -> Self {
        ReleaseInfo {
            name: wire.name,
            namespace: wire.namespace,
            revision: wire.version,
            status: wire.info.status,
            chart_version: wire.chart.map(|c| c.metadata.version),
        }
    }
}

impl HelmCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kube_context(mut self, context: impl Into<String>) -> Self {
        self.kube_context = Some(context.into());
        self
    }

    fn command(&self) -> ProcessCommand {
        let command = ProcessCommand::new(HELM);
        match &self.kube_context {
            Some(context) => command.args(["--kube-context", context.as_str()]),
            None => command,
        }
    }

    async fn run(
        &self,
        operation: &str,
        command: ProcessCommand,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, HelmError> {
        let output = command.run(cancel).await.map_err(|e| match e {
            ProcessError::NotFound { .. } => HelmError::NotInstalled,
            ProcessError::Cancelled { .. } => HelmError::Cancelled {
                operation: operation.to_string(),
            },
            ProcessError::Io { source, .. } => HelmError::Failed {
                operation: operation.to_string(),
                message: source.to_string(),
            },
        })?;
        if !output.success() {
            return Err(HelmError::Failed {
                operation: operation.to_string(),
                message: output.failure_message(),
            });
        }
        Ok(output)
    }
}

fn parse_release(operation: &str, output: &ProcessOutput) -> Result<ReleaseInfo, HelmError> {
    serde_json::from_slice::<ReleaseWire>(&output.stdout)
        .map(ReleaseInfo::from)
        .map_err(|e| HelmError::Parse {
            operation: operation.to_string(),
            message: e.to_string(),
        })
}

fn is_release_not_found(message: &str) -> bool {
    message.to_ascii_lowercase().contains("release: not found")
}

#[async_trait]
impl HelmClient for HelmCli {
    async fn add_or_update_chart_repo(
        &self,
        repo: &ChartRepo,
        cancel: &CancellationToken,
    ) -> Result<(), HelmError> {
        let add = self.command().args([
            "repo",
            "add",
            "--force-update",
            repo.name.as_str(),
            repo.url.as_str(),
        ]);
        self.run("repo add", add, cancel).await?;

        let update = self.command().args(["repo", "update", repo.name.as_str()]);
        self.run("repo update", update, cancel).await?;
        Ok(())
    }

    async fn get_chart(
        &self,
        chart: &ChartSource,
        version: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ChartInfo, HelmError> {
        let mut command = self.command().args(["show", "chart"]).arg(chart.reference());
        if let Some(version) = version {
            command = command.args(["--version", version]);
        }
        let output = self.run("show chart", command, cancel).await?;
        serde_yaml::from_slice(&output.stdout).map_err(|e| HelmError::Parse {
            operation: "show chart".to_string(),
            message: e.to_string(),
        })
    }

    async fn get_release(
        &self,
        release: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ReleaseInfo>, HelmError> {
        let command =
            self.command()
                .args(["status", release, "--namespace", namespace, "-o", "json"]);
        match self.run("status", command, cancel).await {
            Ok(output) => parse_release("status", &output).map(Some),
            Err(HelmError::Failed { message, .. }) if is_release_not_found(&message) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn install_or_upgrade_chart(
        &self,
        spec: &ReleaseSpec,
        cancel: &CancellationToken,
    ) -> Result<ReleaseInfo, HelmError> {
        let values = serde_yaml::to_string(&spec.values).map_err(|e| HelmError::Parse {
            operation: "upgrade".to_string(),
            message: e.to_string(),
        })?;

        let timeout = format!("{}s", spec.wait_timeout.as_secs());
        let mut command = self
            .command()
            .args(["upgrade", "--install", spec.release.as_str()])
            .arg(spec.chart.reference())
            .args([
                "--namespace",
                spec.namespace.as_str(),
                "--create-namespace",
                "--wait",
                "--timeout",
                timeout.as_str(),
                "--values",
                "-",
                "-o",
                "json",
            ]);
        if let Some(version) = &spec.version {
            command = command.args(["--version", version.as_str()]);
        }

        let output = self.run("upgrade", command.stdin(values), cancel).await?;
        parse_release("upgrade", &output)
    }

    async fn uninstall_release_by_name(
        &self,
        release: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<(), HelmError> {
        let command = self
            .command()
            .args(["uninstall", release, "--namespace", namespace, "--wait"]);
        match self.run("uninstall", command, cancel).await {
            Ok(_) => Ok(()),
            Err(HelmError::Failed { message, .. }) if is_release_not_found(&message) => {
                tracing::debug!("release {} already absent", release);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
