// ABOUTME: Runtime error types with SNAFU pattern.
// ABOUTME: Unifies detection, connection and CLI introspection errors for programmatic handling.

use snafu::Snafu;

use super::client::ConnectError;
use super::detection::DetectionError;
use super::executor::ExecutorError;
use super::types::RuntimeKind;

/// Unified runtime error for detection, connection and introspection failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("runtime detection failed: {source}"))]
    Detection { source: DetectionError },

    #[snafu(display("runtime connection failed: {source}"))]
    Connection { source: ConnectError },

    #[snafu(display("runtime introspection failed: {source}"))]
    Introspection { source: ExecutorError },

    #[snafu(display("{runtime} is not responding: {message}"))]
    Unavailable {
        runtime: RuntimeKind,
        message: String,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// No container runtime found on the system.
    NoRuntimeFound,
    /// The host OS has no known socket conventions.
    UnsupportedOs,
    /// Every candidate endpoint failed the liveness probe.
    ConnectionFailed,
    /// The runtime CLI failed or returned unparsable output.
    Introspection,
    /// A previously validated runtime stopped answering.
    Unavailable,
    /// The operation was cancelled.
    Cancelled,
}

impl RuntimeError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            RuntimeError::Detection { source } => match source {
                DetectionError::NoRuntimeFound
                | DetectionError::NotReachable { .. }
                | DetectionError::NoCandidates { .. } => RuntimeErrorKind::NoRuntimeFound,
                DetectionError::UnsupportedOs(_) => RuntimeErrorKind::UnsupportedOs,
                DetectionError::Cancelled => RuntimeErrorKind::Cancelled,
            },
            RuntimeError::Connection { source } => match source {
                ConnectError::Exhausted { .. } => RuntimeErrorKind::ConnectionFailed,
                ConnectError::Cancelled { .. } => RuntimeErrorKind::Cancelled,
            },
            RuntimeError::Introspection { source } => {
                if source.is_cancelled() {
                    RuntimeErrorKind::Cancelled
                } else {
                    RuntimeErrorKind::Introspection
                }
            }
            RuntimeError::Unavailable { .. } => RuntimeErrorKind::Unavailable,
        }
    }

    /// Returns the runtime named by a connection failure.
    pub fn attempted_runtime(&self) -> Option<RuntimeKind> {
        match self {
            RuntimeError::Connection {
                source: ConnectError::Exhausted { runtime, .. } | ConnectError::Cancelled { runtime },
            } => Some(*runtime),
            RuntimeError::Detection {
                source:
                    DetectionError::NotReachable { runtime } | DetectionError::NoCandidates { runtime },
            } => Some(*runtime),
            RuntimeError::Unavailable { runtime, .. } => Some(*runtime),
            _ => None,
        }
    }

    /// How to bring the runtime back, naming it when known.
    pub fn start_hint(&self) -> String {
        match self.attempted_runtime() {
            Some(runtime) => format!(
                "make sure {} is running, or point KINDLE_CONTAINER_SOCKET at its socket",
                runtime.binary()
            ),
            None => "start Docker or Podman, or point KINDLE_CONTAINER_SOCKET at its socket"
                .to_string(),
        }
    }
}

impl From<DetectionError> for RuntimeError {
    fn from(source: DetectionError) -> Self {
        RuntimeError::Detection { source }
    }
}

impl From<ConnectError> for RuntimeError {
    fn from(source: ConnectError) -> Self {
        RuntimeError::Connection { source }
    }
}

impl From<ExecutorError> for RuntimeError {
    fn from(source: ExecutorError) -> Self {
        RuntimeError::Introspection { source }
    }
}
