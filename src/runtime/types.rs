// ABOUTME: Runtime type definitions for Docker and Podman.
// ABOUTME: Includes RuntimeKind, the host Os and the resolved RuntimeConfig.

use super::detection::DetectionError;
use crate::types::Endpoint;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The container runtime type.
///
/// `Auto` is only ever a request; a connected provider always holds
/// `Docker` or `Podman`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Docker,
    Podman,
    #[default]
    Auto,
}

impl RuntimeKind {
    /// Name of the runtime's command-line binary.
    pub fn binary(&self) -> &'static str {
        match self {
            RuntimeKind::Docker | RuntimeKind::Auto => "docker",
            RuntimeKind::Podman => "podman",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, RuntimeKind::Auto)
    }
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeKind::Docker => write!(f, "docker"),
            RuntimeKind::Podman => write!(f, "podman"),
            RuntimeKind::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for RuntimeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(RuntimeKind::Docker),
            "podman" => Ok(RuntimeKind::Podman),
            "" | "auto" => Ok(RuntimeKind::Auto),
            other => Err(format!(
                "unknown container runtime '{}' (expected docker, podman or auto)",
                other
            )),
        }
    }
}

/// Operating systems with known socket conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    /// The OS this binary was compiled for.
    pub fn current() -> Result<Self, DetectionError> {
        std::env::consts::OS.parse()
    }
}

impl FromStr for Os {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Os::Linux),
            "macos" | "darwin" => Ok(Os::MacOs),
            "windows" => Ok(Os::Windows),
            other => Err(DetectionError::UnsupportedOs(other.to_string())),
        }
    }
}

/// Runtime selection resolved from the environment.
///
/// Immutable once built. An explicit socket short-circuits all detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    preferred: RuntimeKind,
    prefer_rootless: bool,
    explicit_socket: Option<Endpoint>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            preferred: RuntimeKind::Auto,
            prefer_rootless: true,
            explicit_socket: None,
        }
    }
}

impl RuntimeConfig {
    pub fn new(
        preferred: RuntimeKind,
        prefer_rootless: bool,
        explicit_socket: Option<Endpoint>,
    ) -> Self {
        Self {
            preferred,
            prefer_rootless,
            explicit_socket,
        }
    }

    pub fn preferred(&self) -> RuntimeKind {
        self.preferred
    }

    pub fn prefer_rootless(&self) -> bool {
        self.prefer_rootless
    }

    pub fn explicit_socket(&self) -> Option<&Endpoint> {
        self.explicit_socket.as_ref()
    }
}
