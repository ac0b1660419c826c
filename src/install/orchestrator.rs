// ABOUTME: Install sequence: check prerequisites, ensure the cluster, resolve and install charts.
// ABOUTME: Retries Helm lock contention within a bound and gathers failed-pod diagnostics otherwise.

use super::error::InstallError;
use super::opts::{ChartRequest, InstallOpts, InstallSummary};
use super::port::ensure_port_free;
use super::retry::{RetryError, RetryPolicy, retry_stuck};
use crate::cluster::Cluster;
use crate::diagnostics::{Diagnostics, PodReport, Warning};
use crate::helm::{HelmClient, HelmError, ReleaseInfo};
use crate::output::Progress;
use crate::pods::PodClient;
use crate::runtime::{RuntimeCheck, RuntimeErrorKind};
use tokio_util::sync::CancellationToken;

/// Lines of log kept per failed pod.
pub const DEFAULT_LOG_TAIL: u32 = 50;

/// Drives one install run against injected collaborators.
pub struct Installer<'a> {
    runtime: &'a dyn RuntimeCheck,
    cluster: &'a dyn Cluster,
    helm: &'a dyn HelmClient,
    pods: &'a dyn PodClient,
    progress: &'a dyn Progress,
    policy: RetryPolicy,
    log_tail: u32,
}

impl<'a> Installer<'a> {
    pub fn new(
        runtime: &'a dyn RuntimeCheck,
        cluster: &'a dyn Cluster,
        helm: &'a dyn HelmClient,
        pods: &'a dyn PodClient,
        progress: &'a dyn Progress,
    ) -> Self {
        Self {
            runtime,
            cluster,
            helm,
            pods,
            progress,
            policy: RetryPolicy::default(),
            log_tail: DEFAULT_LOG_TAIL,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_log_tail(mut self, lines: u32) -> Self {
        self.log_tail = lines;
        self
    }

    /// Run the whole sequence. Charts are installed app first, then ingress.
    pub async fn install(
        &self,
        opts: &InstallOpts,
        diag: &mut Diagnostics,
        cancel: &CancellationToken,
    ) -> Result<InstallSummary, InstallError> {
        self.check_prereqs(cancel).await?;
        let (cluster_created, port) = self.ensure_cluster(opts, diag, cancel).await?;

        let mut releases = Vec::new();
        for request in std::iter::once(&opts.app).chain(opts.ingress.as_ref()) {
            self.resolve_chart(request, cancel).await?;
            let release = self.install_chart(request, opts, diag, cancel).await?;
            releases.push(release);
        }

        Ok(InstallSummary {
            cluster_created,
            port,
            releases,
            completed_at: chrono::Utc::now(),
        })
    }

    async fn check_prereqs(&self, cancel: &CancellationToken) -> Result<(), InstallError> {
        self.progress.update("Checking container runtime...");
        self.runtime.ensure_ready(cancel).await.map_err(|e| {
            if e.kind() == RuntimeErrorKind::Cancelled {
                InstallError::Cancelled
            } else {
                InstallError::RuntimeNotReady(e)
            }
        })
    }

    /// Existing clusters are reused as-is; new ones are created only after the port probe.
    async fn ensure_cluster(
        &self,
        opts: &InstallOpts,
        diag: &mut Diagnostics,
        cancel: &CancellationToken,
    ) -> Result<(bool, u16), InstallError> {
        self.progress.update("Checking cluster...");
        if self.cluster.exists(cancel).await? {
            let port = self.validate_existing(opts, diag, cancel).await?;
            return Ok((false, port));
        }

        ensure_port_free(opts.port)
            .await
            .map_err(|source| InstallError::PortUnavailable {
                port: opts.port,
                source,
            })?;

        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        self.progress.update("Creating cluster...");
        self.cluster.create(opts.port, &opts.mounts, cancel).await?;
        tracing::info!("created cluster {}", self.cluster.name());
        Ok((true, opts.port))
    }

    async fn validate_existing(
        &self,
        opts: &InstallOpts,
        diag: &mut Diagnostics,
        cancel: &CancellationToken,
    ) -> Result<u16, InstallError> {
        let bound = self.cluster.bound_port(cancel).await?;
        match bound {
            Some(port) if port == opts.port => Ok(port),
            Some(port) => {
                let message = format!(
                    "cluster {} already publishes ingress on port {}; using it instead of {}",
                    self.cluster.name(),
                    port,
                    opts.port
                );
                self.progress.warn(&message);
                diag.warn(Warning::port_mismatch(message));
                Ok(port)
            }
            None if opts.ingress.is_some() => Err(InstallError::ClusterInvalid {
                cluster: self.cluster.name().to_string(),
                reason: "its node publishes no ingress port".to_string(),
            }),
            None => Ok(opts.port),
        }
    }

    async fn resolve_chart(
        &self,
        request: &ChartRequest,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        let resolve_err = |source: HelmError| InstallError::ChartResolve {
            chart: request.chart.reference(),
            source,
        };

        if let Some(repo) = request.chart.repo() {
            self.helm
                .add_or_update_chart_repo(repo, cancel)
                .await
                .map_err(resolve_err)?;
        }
        let chart = self
            .helm
            .get_chart(&request.chart, request.version.as_deref(), cancel)
            .await
            .map_err(resolve_err)?;
        tracing::info!("resolved {} {} for {}", chart.name, chart.version, request.release);
        Ok(())
    }

    async fn install_chart(
        &self,
        request: &ChartRequest,
        opts: &InstallOpts,
        diag: &mut Diagnostics,
        cancel: &CancellationToken,
    ) -> Result<ReleaseInfo, InstallError> {
        self.log_previous_release(request, &opts.namespace, cancel).await;

        self.progress
            .update(&format!("Installing {} (pulling images)...", request.release));
        let policy = if request.retry {
            self.policy
        } else {
            RetryPolicy::once()
        };
        let spec = request.spec(&opts.namespace, opts.wait_timeout);

        let result = retry_stuck(&policy, cancel, |attempt| {
            tracing::debug!("installing {}, attempt {}", spec.release, attempt);
            let spec = &spec;
            async move { self.helm.install_or_upgrade_chart(spec, cancel).await }
        })
        .await;

        match result {
            Ok(release) => {
                tracing::info!(
                    "{} revision {} is {}",
                    release.name,
                    release.revision,
                    release.status
                );
                Ok(release)
            }
            Err(RetryError::Stuck { attempts, last }) => Err(InstallError::Stuck {
                release: request.release.clone(),
                attempts,
                source: last,
            }),
            Err(RetryError::Cancelled { .. }) => Err(InstallError::Cancelled),
            Err(RetryError::Failed(source)) => {
                self.collect_diagnostics(&opts.namespace, diag, cancel).await;
                Err(InstallError::Chart {
                    release: request.release.clone(),
                    source,
                })
            }
        }
    }

    async fn log_previous_release(
        &self,
        request: &ChartRequest,
        namespace: &str,
        cancel: &CancellationToken,
    ) {
        match self.helm.get_release(&request.release, namespace, cancel).await {
            Ok(Some(previous)) => tracing::info!(
                "upgrading {} from revision {} ({})",
                previous.name,
                previous.revision,
                previous.status
            ),
            Ok(None) => tracing::debug!("{} is not installed yet", request.release),
            Err(e) => tracing::debug!("could not read release {}: {}", request.release, e),
        }
    }

    /// Best effort: failures here become warnings, never errors.
    async fn collect_diagnostics(
        &self,
        namespace: &str,
        diag: &mut Diagnostics,
        cancel: &CancellationToken,
    ) {
        let pods = match self.pods.list_pods(namespace, cancel).await {
            Ok(pods) => pods,
            Err(e) => {
                diag.warn(Warning::diagnostics_unavailable(format!(
                    "could not list pods in {}: {}",
                    namespace, e
                )));
                return;
            }
        };

        for pod in pods.into_iter().filter(|p| p.is_failed()) {
            let log_tail = match self
                .pods
                .pod_logs(namespace, &pod.name, self.log_tail, cancel)
                .await
            {
                Ok(logs) => Some(logs),
                Err(e) => {
                    diag.warn(Warning::diagnostics_unavailable(format!(
                        "could not fetch logs for {}: {}",
                        pod.name, e
                    )));
                    None
                }
            };
            diag.record_pod(PodReport {
                name: pod.name,
                phase: pod.phase,
                reason: pod.reason,
                log_tail,
            });
        }
    }
}
