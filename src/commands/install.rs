// ABOUTME: Install command implementation.
// ABOUTME: Builds install options from flags and host probes, then runs the orchestrator.

use super::INGRESS_RELEASE;
use super::runtime_connection::connect_to_runtime;
use crate::cli::InstallArgs;
use kindle::cluster::{Cluster, KindCluster, VolumeMount};
use kindle::config::{HostEnv, load_values, merge_values, set_path};
use kindle::diagnostics::Diagnostics;
use kindle::error::{Error, Result};
use kindle::helm::{ChartSource, HelmCli};
use kindle::install::{
    ChartRequest, InstallError, InstallOpts, Installer, RetryPolicy, legacy_values,
};
use kindle::output::{Output, OutputMode};
use kindle::pods::Kubectl;
use serde_yaml::{Mapping, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const APP_REPO_NAME: &str = "kindle";
const INGRESS_REPO_NAME: &str = "kindle-ingress";
/// Where the host data directory appears inside the cluster node.
const NODE_DATA_PATH: &str = "/var/lib/kindle";

pub async fn install(
    args: InstallArgs,
    mut output: Output,
    cancel: CancellationToken,
) -> Result<()> {
    output.start_timer();
    let (provider, host) = connect_to_runtime(&output, &cancel).await?;
    let opts = build_opts(&args, &host)?;

    let cluster = KindCluster::new(&args.target.cluster_name, provider.kind())
        .with_node_image(args.node_image.clone());
    let helm = HelmCli::new().with_kube_context(cluster.context());
    let pods = Kubectl::new().with_context(cluster.context());
    let policy = RetryPolicy::default().with_delay(Duration::from_secs(args.retry_delay_secs));

    let mut diag = Diagnostics::default();
    let result = Installer::new(&provider, &cluster, &helm, &pods, &output)
        .with_policy(policy)
        .install(&opts, &mut diag, &cancel)
        .await;

    if !diag.pods().is_empty() {
        output.warning(&format!("failed pods:\n{}", diag.render_pods().trim_end()));
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(InstallError::Cancelled) => return Err(Error::Cancelled),
        Err(e) => return Err(e.into()),
    };

    if summary.cluster_created {
        output.progress(&format!("→ Created cluster {}", cluster.name()));
    }
    if output.mode() == OutputMode::Json {
        output.data(&summary, "");
    } else {
        output.success(&format!(
            "Installed {} release(s); ingress on http://localhost:{}",
            summary.releases.len(),
            summary.port
        ));
    }
    Ok(())
}

fn build_opts(args: &InstallArgs, host: &HostEnv) -> Result<InstallOpts> {
    // Created by the cluster just before kind runs
    let data_dir = host.data_dir();

    let mut values = legacy_values(&data_dir).unwrap_or_default();
    for path in &args.values {
        merge_values(&mut values, load_values(path)?);
    }

    let mut app = ChartRequest::new(
        &args.target.release,
        ChartSource::parse(&args.chart, APP_REPO_NAME),
    );
    app.version = args.chart_version.clone();
    app.values = values;

    let ingress = (!args.no_ingress).then(|| {
        let mut ingress = ChartRequest::new(
            INGRESS_RELEASE,
            ChartSource::parse(&args.ingress_chart, INGRESS_REPO_NAME),
        )
        .without_retry();
        ingress.values = ingress_values();
        ingress
    });

    Ok(InstallOpts {
        namespace: args.target.namespace.clone(),
        port: args.port,
        mounts: vec![VolumeMount {
            host_path: data_dir,
            container_path: NODE_DATA_PATH.to_string(),
        }],
        app,
        ingress,
        wait_timeout: Duration::from_secs(args.wait_timeout_secs),
    })
}

/// Run the controller on the node's published host ports.
fn ingress_values() -> Mapping {
    let mut values = Mapping::new();
    set_path(&mut values, "controller.hostPort.enabled", Value::Bool(true));
    set_path(
        &mut values,
        "controller.service.type",
        Value::String("NodePort".to_string()),
    );
    set_path(
        &mut values,
        "controller.nodeSelector.ingress-ready",
        Value::String("true".to_string()),
    );
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn install_args(argv: &[&str]) -> InstallArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Install(args) => args,
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn options_do_not_touch_the_host() {
        let home = tempfile::tempdir().unwrap();
        let host = HostEnv {
            home: Some(home.path().to_path_buf()),
            ..Default::default()
        };
        let args = install_args(&["kindle", "install", "--chart", "./charts/app"]);

        let opts = build_opts(&args, &host).unwrap();

        assert_eq!(opts.mounts[0].host_path, host.data_dir());
        assert_eq!(opts.mounts[0].container_path, NODE_DATA_PATH);
        assert!(!host.data_dir().exists());
    }
}
