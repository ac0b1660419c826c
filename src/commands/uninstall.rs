// ABOUTME: Uninstall command implementation.
// ABOUTME: Removes both releases, then deletes the cluster unless asked to keep it.

use super::INGRESS_RELEASE;
use super::runtime_connection::connect_to_runtime;
use crate::cli::TargetArgs;
use kindle::cluster::{Cluster, KindCluster};
use kindle::error::Result;
use kindle::helm::{HelmCli, HelmClient};
use kindle::output::Output;
use tokio_util::sync::CancellationToken;

pub async fn uninstall(
    target: TargetArgs,
    keep_cluster: bool,
    mut output: Output,
    cancel: CancellationToken,
) -> Result<()> {
    output.start_timer();
    let (provider, _) = connect_to_runtime(&output, &cancel).await?;
    let cluster = KindCluster::new(&target.cluster_name, provider.kind());

    if !cluster.exists(&cancel).await? {
        output.success(&format!("Cluster {} does not exist", target.cluster_name));
        return Ok(());
    }

    let helm = HelmCli::new().with_kube_context(cluster.context());
    for release in [INGRESS_RELEASE, target.release.as_str()] {
        output.progress(&format!("→ Removing release {}...", release));
        helm.uninstall_release_by_name(release, &target.namespace, &cancel)
            .await?;
    }

    if keep_cluster {
        output.success("Releases removed; cluster kept");
        return Ok(());
    }

    output.progress(&format!("→ Deleting cluster {}...", cluster.name()));
    cluster.delete(&cancel).await?;
    output.success("Uninstall complete");
    Ok(())
}
