// ABOUTME: Container runtime discovery and client construction for Docker and Podman.
// ABOUTME: Auto-detects an available runtime or honours explicit configuration.

mod client;
mod detection;
mod error;
mod executor;
mod info;
mod provider;
mod sockets;
mod types;

pub use client::{
    BollardConnector, ClientFactory, ConnectError, Connector, Ping, ProbeFailure, ValidatedClient,
};
pub use detection::{AutoDetector, Detection, DetectionError, Reachability, SocketProbe};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use executor::{
    CommandExecutor, DockerCommand, ExecutorError, PodmanCommand, default_executors,
    detect_executor, detect_executor_from, executor_for,
};
pub use info::{Capabilities, HostSecurity, RuntimeInfo};
pub use provider::{RuntimeCheck, RuntimeProvider, guess_kind};
pub use sockets::{DockerSockets, PodmanSockets, SocketDetector};
pub use types::{Os, RuntimeConfig, RuntimeKind};
