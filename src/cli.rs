// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kindle")]
#[command(about = "Local Kubernetes installer for Docker and Podman")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which cluster and namespace a command acts on.
#[derive(Args, Clone)]
pub struct TargetArgs {
    /// Name of the kind cluster
    #[arg(long, default_value = "kindle")]
    pub cluster_name: String,

    /// Namespace the releases live in
    #[arg(short, long, default_value = "kindle")]
    pub namespace: String,

    /// Release name of the application chart
    #[arg(long, default_value = "kindle")]
    pub release: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the local cluster (if needed) and install the application
    Install(InstallArgs),

    /// Show runtime, cluster and release status
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show recent logs from every pod in the namespace
    Logs {
        #[command(flatten)]
        target: TargetArgs,

        /// Number of lines per pod
        #[arg(long, default_value_t = 100)]
        tail: u32,
    },

    /// Remove the releases and the local cluster
    Uninstall {
        #[command(flatten)]
        target: TargetArgs,

        /// Keep the cluster, only remove the releases
        #[arg(long)]
        keep_cluster: bool,
    },

    /// Show the detected container runtime and its capabilities
    Runtime,
}

#[derive(Args)]
pub struct InstallArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Application chart: a local path, or `<repo-url>#<chart>`
    #[arg(long)]
    pub chart: String,

    /// Chart version to install (defaults to latest)
    #[arg(long)]
    pub chart_version: Option<String>,

    /// Extra values files, applied in order
    #[arg(short = 'f', long = "values")]
    pub values: Vec<PathBuf>,

    /// Host port for HTTP ingress
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Ingress controller chart: a local path, or `<repo-url>#<chart>`
    #[arg(
        long,
        default_value = "https://kubernetes.github.io/ingress-nginx#ingress-nginx"
    )]
    pub ingress_chart: String,

    /// Skip the ingress controller
    #[arg(long)]
    pub no_ingress: bool,

    /// Seconds to wait between retries when Helm reports a pending operation
    #[arg(long, default_value_t = 0)]
    pub retry_delay_secs: u64,

    /// Seconds Helm waits for resources to become ready
    #[arg(long, default_value_t = 600)]
    pub wait_timeout_secs: u64,

    /// Node image for the kind cluster
    #[arg(long)]
    pub node_image: Option<String>,
}
