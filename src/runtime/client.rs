// ABOUTME: ClientFactory turning candidate endpoints into one ping-validated API client.
// ABOUTME: Bollard-backed connector with scheme dispatch; fakes plug in through the Connector trait.

use super::types::RuntimeKind;
use crate::types::{Endpoint, Scheme};
use async_trait::async_trait;
use bollard::Docker;
use nonempty::NonEmpty;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Request timeout handed to bollard, in seconds.
const CLIENT_TIMEOUT_SECS: u64 = 120;
const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from building a validated client.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("could not connect to {runtime}: all {attempted} endpoint(s) failed the liveness probe")]
    Exhausted {
        runtime: RuntimeKind,
        attempted: usize,
        failures: Vec<ProbeFailure>,
    },

    #[error("connection to {runtime} cancelled")]
    Cancelled { runtime: RuntimeKind },
}

/// Why a single candidate was discarded. Kept for diagnostics, never shown per-endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub endpoint: Endpoint,
    pub reason: String,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.reason)
    }
}

/// Minimal liveness probe.
#[async_trait]
pub trait Ping: Send + Sync {
    async fn ping(&self) -> Result<(), String>;
}

#[async_trait]
impl Ping for Docker {
    async fn ping(&self) -> Result<(), String> {
        Docker::ping(self).await.map(|_| ()).map_err(|e| e.to_string())
    }
}

/// Builds an (unvalidated) API client for one endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    type Client: Ping;

    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Client, String>;
}

/// Connector producing bollard clients with API version negotiation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BollardConnector;

impl BollardConnector {
    fn build(endpoint: &Endpoint) -> Result<Docker, String> {
        let version = bollard::API_DEFAULT_VERSION;
        let result = match endpoint.scheme() {
            Scheme::Tcp => {
                Docker::connect_with_http(endpoint.as_str(), CLIENT_TIMEOUT_SECS, version)
            }
            #[cfg(unix)]
            Scheme::Unix => {
                Docker::connect_with_unix(endpoint.address(), CLIENT_TIMEOUT_SECS, version)
            }
            #[cfg(windows)]
            Scheme::Npipe => {
                Docker::connect_with_named_pipe(endpoint.address(), CLIENT_TIMEOUT_SECS, version)
            }
            #[allow(unreachable_patterns)]
            other => {
                return Err(format!(
                    "{} endpoints are not supported on this platform",
                    other.prefix()
                ));
            }
        };
        result.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Connector for BollardConnector {
    type Client = Docker;

    async fn connect(&self, endpoint: &Endpoint) -> Result<Docker, String> {
        let client = Self::build(endpoint)?;
        client
            .negotiate_version()
            .await
            .map_err(|e| format!("version negotiation failed: {}", e))
    }
}

/// An API client bound to exactly one endpoint that answered a ping.
#[derive(Debug)]
pub struct ValidatedClient<C> {
    client: C,
    endpoint: Endpoint,
    runtime: RuntimeKind,
    skipped: Vec<ProbeFailure>,
}

impl<C> ValidatedClient<C> {
    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn runtime(&self) -> RuntimeKind {
        self.runtime
    }

    /// Earlier candidates that failed before this one succeeded.
    pub fn skipped(&self) -> &[ProbeFailure] {
        &self.skipped
    }
}

/// Tries candidates in order and keeps the first one that pings.
pub struct ClientFactory<C = BollardConnector> {
    connector: C,
    explicit: Option<Endpoint>,
}

impl ClientFactory<BollardConnector> {
    pub fn new() -> Self {
        Self::with_connector(BollardConnector)
    }
}

impl Default for ClientFactory<BollardConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> ClientFactory<C> {
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            explicit: None,
        }
    }

    /// A user-supplied endpoint replaces whatever candidates are passed later.
    pub fn with_override(mut self, endpoint: Option<Endpoint>) -> Self {
        self.explicit = endpoint;
        self
    }

    /// Build a validated client for `runtime` from `candidates`, or from the override when set.
    #[instrument(skip_all, fields(runtime = %runtime))]
    pub async fn create_client(
        &self,
        runtime: RuntimeKind,
        candidates: &NonEmpty<Endpoint>,
        cancel: &CancellationToken,
    ) -> Result<ValidatedClient<C::Client>, ConnectError> {
        let candidates = match &self.explicit {
            Some(endpoint) => NonEmpty::new(endpoint.clone()),
            None => candidates.clone(),
        };

        let mut failures = Vec::new();
        for endpoint in candidates.iter() {
            if cancel.is_cancelled() {
                return Err(ConnectError::Cancelled { runtime });
            }
            match self.try_endpoint(endpoint, cancel).await {
                Ok(client) => {
                    tracing::debug!(
                        "{} client validated after {} failed candidate(s)",
                        runtime,
                        failures.len()
                    );
                    return Ok(ValidatedClient {
                        client,
                        endpoint: endpoint.clone(),
                        runtime,
                        skipped: failures,
                    });
                }
                Err(reason) => {
                    tracing::debug!("{} candidate rejected: {}", runtime, reason);
                    failures.push(ProbeFailure {
                        endpoint: endpoint.clone(),
                        reason,
                    });
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(ConnectError::Cancelled { runtime });
        }
        Err(ConnectError::Exhausted {
            runtime,
            attempted: failures.len(),
            failures,
        })
    }

    async fn try_endpoint(
        &self,
        endpoint: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<C::Client, String> {
        let attempt = async {
            let client = self.connector.connect(endpoint).await?;
            match tokio::time::timeout(PING_TIMEOUT, client.ping()).await {
                Ok(Ok(())) => Ok(client),
                Ok(Err(e)) => Err(format!("ping failed: {}", e)),
                Err(_) => Err("ping timed out".to_string()),
            }
        };
        tokio::select! {
            result = attempt => result,
            _ = cancel.cancelled() => Err("cancelled".to_string()),
        }
    }
}
