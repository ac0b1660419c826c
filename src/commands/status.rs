// ABOUTME: Status command implementation.
// ABOUTME: Reports runtime, capabilities, cluster presence and release state.

use super::INGRESS_RELEASE;
use super::runtime_connection::connect_to_runtime;
use crate::cli::TargetArgs;
use kindle::cluster::{Cluster, KindCluster};
use kindle::error::Result;
use kindle::helm::{HelmCli, HelmClient, ReleaseInfo};
use kindle::output::Output;
use kindle::runtime::{Capabilities, RuntimeKind};
use serde::Serialize;
use std::fmt::Write;
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
struct StatusReport {
    runtime: RuntimeKind,
    endpoint: String,
    capabilities: Option<Capabilities>,
    cluster: String,
    cluster_exists: bool,
    ingress_port: Option<u16>,
    releases: Vec<ReleaseInfo>,
}

pub async fn status(target: TargetArgs, output: Output, cancel: CancellationToken) -> Result<()> {
    let (provider, _) = connect_to_runtime(&output, &cancel).await?;
    let capabilities = provider.capabilities(&cancel).await.ok();

    let cluster = KindCluster::new(&target.cluster_name, provider.kind());
    let cluster_exists = cluster.exists(&cancel).await?;

    let mut ingress_port = None;
    let mut releases = Vec::new();
    if cluster_exists {
        ingress_port = cluster.bound_port(&cancel).await?;
        let helm = HelmCli::new().with_kube_context(cluster.context());
        for release in [target.release.as_str(), INGRESS_RELEASE] {
            if let Some(info) = helm.get_release(release, &target.namespace, &cancel).await? {
                releases.push(info);
            }
        }
    }

    let report = StatusReport {
        runtime: provider.kind(),
        endpoint: provider.endpoint().to_string(),
        capabilities,
        cluster: target.cluster_name,
        cluster_exists,
        ingress_port,
        releases,
    };
    output.data(&report, &render(&report));
    Ok(())
}

fn render(report: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Runtime:  {} ({})", report.runtime, report.endpoint);
    if let Some(caps) = &report.capabilities {
        let _ = writeln!(
            out,
            "Rootless: {}  cgroup: {}",
            caps.rootless,
            if caps.cgroup_version.is_empty() {
                "unknown"
            } else {
                caps.cgroup_version.as_str()
            }
        );
    }
    if !report.cluster_exists {
        let _ = writeln!(out, "Cluster:  {} (not created)", report.cluster);
        return out;
    }
    match report.ingress_port {
        Some(port) => {
            let _ = writeln!(out, "Cluster:  {} (ingress on port {})", report.cluster, port);
        }
        None => {
            let _ = writeln!(out, "Cluster:  {}", report.cluster);
        }
    }
    if report.releases.is_empty() {
        let _ = writeln!(out, "Releases: none");
    }
    for release in &report.releases {
        let _ = writeln!(
            out,
            "Release:  {} revision {} {}",
            release.name, release.revision, release.status
        );
    }
    out
}
