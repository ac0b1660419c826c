// ABOUTME: Scheme-qualified container runtime endpoint (unix, npipe, tcp).
// ABOUTME: The raw URI is kept verbatim so it reaches the API client unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseEndpointError {
    #[error("endpoint cannot be empty")]
    Empty,

    #[error("unsupported endpoint scheme in {0} (expected unix://, npipe:// or tcp://)")]
    UnsupportedScheme(String),

    #[error("endpoint {0} has no address after the scheme")]
    MissingAddress(String),
}

/// Transport used to reach a runtime endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Unix,
    Npipe,
    Tcp,
}

impl Scheme {
    pub fn prefix(&self) -> &'static str {
        match self {
            Scheme::Unix => "unix://",
            Scheme::Npipe => "npipe://",
            Scheme::Tcp => "tcp://",
        }
    }
}

/// A connection URI such as `unix:///var/run/docker.sock`,
/// `npipe:////./pipe/docker_engine` or `tcp://127.0.0.1:2375`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    uri: String,
    scheme: Scheme,
}

impl Endpoint {
    /// Parse a scheme-qualified URI. A bare absolute path is read as a unix socket.
    pub fn parse(input: &str) -> Result<Self, ParseEndpointError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseEndpointError::Empty);
        }

        if input.starts_with('/') {
            return Ok(Self::unix(input));
        }

        let scheme = [Scheme::Unix, Scheme::Npipe, Scheme::Tcp]
            .into_iter()
            .find(|s| input.starts_with(s.prefix()))
            .ok_or_else(|| ParseEndpointError::UnsupportedScheme(input.to_string()))?;

        if input.len() == scheme.prefix().len() {
            return Err(ParseEndpointError::MissingAddress(input.to_string()));
        }

        Ok(Self {
            uri: input.to_string(),
            scheme,
        })
    }

    /// Build a unix socket endpoint from a filesystem path.
    pub fn unix(path: impl AsRef<str>) -> Self {
        Self {
            uri: format!("unix://{}", path.as_ref()),
            scheme: Scheme::Unix,
        }
    }

    /// Build a Windows named pipe endpoint from a pipe name.
    pub fn npipe(name: &str) -> Self {
        Self {
            uri: format!("npipe:////./pipe/{}", name),
            scheme: Scheme::Npipe,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Address part after the scheme (a socket path, pipe path or host:port).
    pub fn address(&self) -> &str {
        &self.uri[self.scheme.prefix().len()..]
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = ParseEndpointError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Endpoint::parse(&value)
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.uri
    }
}
