// ABOUTME: Test support utilities.
// ABOUTME: In-memory fakes for the runtime, cluster, Helm, kubectl and progress collaborators.

// Each test binary only uses some of these fakes, so allow dead_code.
#![allow(dead_code)]

use async_trait::async_trait;
use kindle::cluster::{Cluster, ClusterError, VolumeMount};
use kindle::helm::{
    ChartInfo, ChartRepo, ChartSource, HelmClient, HelmError, ReleaseInfo, ReleaseSpec,
};
use kindle::install::{ChartRequest, InstallOpts};
use kindle::output::Progress;
use kindle::pods::{PodClient, PodError, PodPhase, PodSummary};
use kindle::runtime::{
    CommandExecutor, Connector, ExecutorError, Ping, Reachability, RuntimeCheck, RuntimeError,
    RuntimeInfo, RuntimeKind,
};
use kindle::types::Endpoint;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("kindle=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A TCP port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    listener.local_addr().unwrap().port()
}

pub fn install_opts(port: u16, with_ingress: bool) -> InstallOpts {
    let ingress = with_ingress.then(|| {
        ChartRequest::new(
            "ingress-nginx",
            ChartSource::parse("https://kubernetes.github.io/ingress-nginx#ingress-nginx", "ingress"),
        )
        .without_retry()
    });
    InstallOpts {
        namespace: "kindle".to_string(),
        port,
        mounts: vec![VolumeMount {
            host_path: PathBuf::from("/tmp/kindle-data"),
            container_path: "/var/lib/kindle".to_string(),
        }],
        app: ChartRequest::new("app", ChartSource::parse("./charts/app", "kindle")),
        ingress,
        wait_timeout: Duration::from_secs(30),
    }
}

// =============================================================================
// Runtime
// =============================================================================

pub struct FakeRuntime {
    ready: bool,
}

impl FakeRuntime {
    pub fn ready() -> Self {
        Self { ready: true }
    }

    pub fn down() -> Self {
        Self { ready: false }
    }
}

#[async_trait]
impl RuntimeCheck for FakeRuntime {
    async fn ensure_ready(&self, _cancel: &CancellationToken) -> Result<(), RuntimeError> {
        if self.ready {
            Ok(())
        } else {
            Err(RuntimeError::Unavailable {
                runtime: RuntimeKind::Docker,
                message: "daemon stopped".to_string(),
            })
        }
    }
}

/// Answers `context_inspect` with fixed endpoints and `info` with fixed facts.
pub struct FakeExecutor {
    pub runtime: RuntimeKind,
    /// `None` makes `context_inspect` fail.
    pub context: Option<Vec<Endpoint>>,
    /// `None` makes `info` fail.
    pub info: Option<RuntimeInfo>,
    /// When false, `execute(["version"])` fails as if the binary were broken.
    pub answers_version: bool,
    /// When true, `execute(["version"])` reports cancellation.
    pub cancels_version: bool,
}

impl FakeExecutor {
    pub fn new(runtime: RuntimeKind) -> Self {
        Self {
            runtime,
            context: Some(Vec::new()),
            info: Some(RuntimeInfo::default()),
            answers_version: true,
            cancels_version: false,
        }
    }

    pub fn with_context(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.context = Some(endpoints);
        self
    }

    pub fn broken_context(mut self) -> Self {
        self.context = None;
        self
    }

    pub fn with_info(mut self, info: RuntimeInfo) -> Self {
        self.info = Some(info);
        self
    }

    pub fn broken_info(mut self) -> Self {
        self.info = None;
        self
    }

    pub fn without_version(mut self) -> Self {
        self.answers_version = false;
        self
    }

    pub fn cancelled_version(mut self) -> Self {
        self.cancels_version = true;
        self
    }

    fn failure(&self, operation: &str) -> ExecutorError {
        ExecutorError::Failed {
            runtime: self.runtime,
            operation: operation.to_string(),
            message: "exit status 125".to_string(),
        }
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    fn runtime(&self) -> RuntimeKind {
        self.runtime
    }

    async fn execute(
        &self,
        args: &[&str],
        _cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ExecutorError> {
        if args.first() == Some(&"version") {
            if self.cancels_version {
                return Err(ExecutorError::Cancelled {
                    runtime: self.runtime,
                    operation: "version".to_string(),
                });
            }
            if !self.answers_version {
                return Err(self.failure("version"));
            }
        }
        Ok(Vec::new())
    }

    async fn context_inspect(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<Vec<Endpoint>, ExecutorError> {
        self.context
            .clone()
            .ok_or_else(|| self.failure("context inspect"))
    }

    async fn info(&self, _cancel: &CancellationToken) -> Result<RuntimeInfo, ExecutorError> {
        self.info.clone().ok_or_else(|| self.failure("info"))
    }
}

/// Reachability by membership in a fixed set.
pub struct FakeProbe {
    live: Vec<Endpoint>,
}

impl FakeProbe {
    pub fn new(live: Vec<Endpoint>) -> Self {
        Self { live }
    }
}

#[async_trait]
impl Reachability for FakeProbe {
    async fn is_reachable(&self, endpoint: &Endpoint) -> bool {
        self.live.contains(endpoint)
    }
}

/// Client handed out by [`FakeConnector`]; pings succeed only when `alive`.
#[derive(Debug)]
pub struct FakeClient {
    pub endpoint: Endpoint,
    alive: bool,
}

#[async_trait]
impl Ping for FakeClient {
    async fn ping(&self) -> Result<(), String> {
        if self.alive {
            Ok(())
        } else {
            Err("connection refused".to_string())
        }
    }
}

/// Connects everywhere; only endpoints in `alive` answer the ping.
pub struct FakeConnector {
    alive: Vec<Endpoint>,
    /// Shared so a test can still read it after the factory takes the connector.
    pub attempts: Arc<Mutex<Vec<Endpoint>>>,
}

impl FakeConnector {
    pub fn new(alive: Vec<Endpoint>) -> Self {
        Self {
            alive,
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Client = FakeClient;

    async fn connect(&self, endpoint: &Endpoint) -> Result<FakeClient, String> {
        self.attempts.lock().push(endpoint.clone());
        Ok(FakeClient {
            endpoint: endpoint.clone(),
            alive: self.alive.contains(endpoint),
        })
    }
}

// =============================================================================
// Cluster
// =============================================================================

pub struct FakeCluster {
    exists: bool,
    bound_port: Option<u16>,
    pub created: Mutex<Vec<u16>>,
}

impl FakeCluster {
    pub fn missing() -> Self {
        Self {
            exists: false,
            bound_port: None,
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn existing(bound_port: Option<u16>) -> Self {
        Self {
            exists: true,
            bound_port,
            created: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Cluster for FakeCluster {
    fn name(&self) -> &str {
        "kindle"
    }

    fn context(&self) -> String {
        "kind-kindle".to_string()
    }

    async fn exists(&self, _cancel: &CancellationToken) -> Result<bool, ClusterError> {
        Ok(self.exists)
    }

    async fn create(
        &self,
        port: u16,
        _mounts: &[VolumeMount],
        _cancel: &CancellationToken,
    ) -> Result<(), ClusterError> {
        self.created.lock().push(port);
        Ok(())
    }

    async fn bound_port(&self, _cancel: &CancellationToken) -> Result<Option<u16>, ClusterError> {
        Ok(self.bound_port)
    }

    async fn delete(&self, _cancel: &CancellationToken) -> Result<(), ClusterError> {
        Ok(())
    }
}

// =============================================================================
// Helm
// =============================================================================

/// Scripted result of one `install_or_upgrade_chart` call.
#[derive(Debug, Clone)]
pub enum Outcome {
    Deployed,
    Stuck,
    Fail(String),
}

/// Helm fake: installs follow a per-release script, then succeed.
#[derive(Default)]
pub struct FakeHelm {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    /// Cancelled right after the first install call returns.
    cancel_after_first: Option<CancellationToken>,
    pub installs: Mutex<Vec<String>>,
    pub repos: Mutex<Vec<ChartRepo>>,
}

impl FakeHelm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, release: &str, outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        self.scripts
            .lock()
            .insert(release.to_string(), outcomes.into_iter().collect());
        self
    }

    pub fn cancel_after_first(mut self, token: CancellationToken) -> Self {
        self.cancel_after_first = Some(token);
        self
    }

    pub fn install_count(&self, release: &str) -> usize {
        self.installs.lock().iter().filter(|r| *r == release).count()
    }
}

#[async_trait]
impl HelmClient for FakeHelm {
    async fn add_or_update_chart_repo(
        &self,
        repo: &ChartRepo,
        _cancel: &CancellationToken,
    ) -> Result<(), HelmError> {
        self.repos.lock().push(repo.clone());
        Ok(())
    }

    async fn get_chart(
        &self,
        chart: &ChartSource,
        version: Option<&str>,
        _cancel: &CancellationToken,
    ) -> Result<ChartInfo, HelmError> {
        Ok(ChartInfo {
            name: chart.reference(),
            version: version.unwrap_or("1.0.0").to_string(),
            app_version: None,
        })
    }

    async fn get_release(
        &self,
        _release: &str,
        _namespace: &str,
        _cancel: &CancellationToken,
    ) -> Result<Option<ReleaseInfo>, HelmError> {
        Ok(None)
    }

    async fn install_or_upgrade_chart(
        &self,
        spec: &ReleaseSpec,
        _cancel: &CancellationToken,
    ) -> Result<ReleaseInfo, HelmError> {
        self.installs.lock().push(spec.release.clone());
        if let Some(token) = &self.cancel_after_first {
            token.cancel();
        }
        let outcome = self
            .scripts
            .lock()
            .get_mut(&spec.release)
            .and_then(|script| script.pop_front())
            .unwrap_or(Outcome::Deployed);

        match outcome {
            Outcome::Deployed => Ok(ReleaseInfo {
                name: spec.release.clone(),
                namespace: spec.namespace.clone(),
                revision: 1,
                status: "deployed".to_string(),
                chart_version: spec.version.clone(),
            }),
            Outcome::Stuck => Err(HelmError::Failed {
                operation: "upgrade".to_string(),
                message: "Error: UPGRADE FAILED: another operation (install/upgrade/rollback) is in progress".to_string(),
            }),
            Outcome::Fail(message) => Err(HelmError::Failed {
                operation: "upgrade".to_string(),
                message,
            }),
        }
    }

    async fn uninstall_release_by_name(
        &self,
        _release: &str,
        _namespace: &str,
        _cancel: &CancellationToken,
    ) -> Result<(), HelmError> {
        Ok(())
    }
}

// =============================================================================
// Pods
// =============================================================================

pub struct FakePods {
    pods: Vec<PodSummary>,
    list_fails: bool,
    logs_fail: bool,
    pub log_requests: Mutex<Vec<String>>,
}

impl FakePods {
    pub fn new(pods: Vec<PodSummary>) -> Self {
        Self {
            pods,
            list_fails: false,
            logs_fail: false,
            log_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            list_fails: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn without_logs(mut self) -> Self {
        self.logs_fail = true;
        self
    }
}

pub fn pod(name: &str, phase: PodPhase) -> PodSummary {
    PodSummary {
        name: name.to_string(),
        phase,
        reason: (phase == PodPhase::Failed).then(|| "Error".to_string()),
    }
}

#[async_trait]
impl PodClient for FakePods {
    async fn list_pods(
        &self,
        _namespace: &str,
        _cancel: &CancellationToken,
    ) -> Result<Vec<PodSummary>, PodError> {
        if self.list_fails {
            return Err(PodError::Failed {
                operation: "get pods".to_string(),
                message: "the server could not be reached".to_string(),
            });
        }
        Ok(self.pods.clone())
    }

    async fn pod_logs(
        &self,
        _namespace: &str,
        pod: &str,
        tail: u32,
        _cancel: &CancellationToken,
    ) -> Result<String, PodError> {
        self.log_requests.lock().push(pod.to_string());
        if self.logs_fail {
            return Err(PodError::Failed {
                operation: "logs".to_string(),
                message: "container not started".to_string(),
            });
        }
        Ok(format!("{} last {} lines\npanic: bad config", pod, tail))
    }
}

// =============================================================================
// Progress
// =============================================================================

#[derive(Default)]
pub struct RecordingProgress {
    pub updates: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
}

impl Progress for RecordingProgress {
    fn update(&self, message: &str) {
        self.updates.lock().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warnings.lock().push(message.to_string());
    }
}
