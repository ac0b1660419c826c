// ABOUTME: Logs command implementation.
// ABOUTME: Prints the tail of every pod in the target namespace.

use super::runtime_connection::connect_to_runtime;
use crate::cli::TargetArgs;
use kindle::cluster::{Cluster, KindCluster};
use kindle::error::{Error, Result};
use kindle::output::Output;
use kindle::pods::{Kubectl, PodClient};
use tokio_util::sync::CancellationToken;

pub async fn logs(
    target: TargetArgs,
    tail: u32,
    output: Output,
    cancel: CancellationToken,
) -> Result<()> {
    let (provider, _) = connect_to_runtime(&output, &cancel).await?;
    let cluster = KindCluster::new(&target.cluster_name, provider.kind());
    if !cluster.exists(&cancel).await? {
        return Err(Error::InvalidConfig(format!(
            "cluster {} does not exist; run `kindle install` first",
            target.cluster_name
        )));
    }

    let kubectl = Kubectl::new().with_context(cluster.context());
    let pods = kubectl.list_pods(&target.namespace, &cancel).await?;
    if pods.is_empty() {
        output.progress(&format!("No pods in namespace {}", target.namespace));
        return Ok(());
    }

    for pod in pods {
        match kubectl
            .pod_logs(&target.namespace, &pod.name, tail, &cancel)
            .await
        {
            Ok(text) => {
                println!("==> {} ({}) <==", pod.name, pod.phase);
                print!("{}", text);
            }
            Err(e) => output.warning(&format!("no logs for {}: {}", pod.name, e)),
        }
    }
    Ok(())
}
