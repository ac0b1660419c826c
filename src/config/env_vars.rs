// ABOUTME: Resolves the runtime configuration from environment variables.
// ABOUTME: Lookup is injectable so precedence rules can be tested without touching the process env.

use crate::error::{Error, Result};
use crate::runtime::{RuntimeConfig, RuntimeKind};
use crate::types::Endpoint;

/// Primary runtime selection (`docker`, `podman` or `auto`).
pub const RUNTIME_ENV: &str = "KINDLE_CONTAINER_RUNTIME";
/// Runtime selection understood by kind itself; honoured when the primary is unset.
pub const KIND_PROVIDER_ENV: &str = "KIND_EXPERIMENTAL_PROVIDER";
/// Explicit socket override. Wins over everything else.
pub const SOCKET_ENV: &str = "KINDLE_CONTAINER_SOCKET";
/// Docker's own host override, below `KINDLE_CONTAINER_SOCKET`.
pub const DOCKER_HOST_ENV: &str = "DOCKER_HOST";
/// Truthy value prefers rootful sockets over the per-user ones.
pub const ROOTFUL_ENV: &str = "KINDLE_ROOTFUL";

impl RuntimeConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let preferred = match get(RUNTIME_ENV) {
            Some(value) => value
                .parse::<RuntimeKind>()
                .map_err(|_| Error::InvalidEnv {
                    var: RUNTIME_ENV,
                    value,
                })?,
            // kind accepts providers we cannot drive (nerdctl); those fall back to detection.
            None => get(KIND_PROVIDER_ENV).map_or(RuntimeKind::Auto, |value| {
                value.parse::<RuntimeKind>().unwrap_or_else(|e| {
                    tracing::warn!("ignoring {}: {}", KIND_PROVIDER_ENV, e);
                    RuntimeKind::Auto
                })
            }),
        };

        let explicit_socket = match get(SOCKET_ENV) {
            Some(value) => Some(Endpoint::parse(&value).map_err(|_| Error::InvalidEnv {
                var: SOCKET_ENV,
                value,
            })?),
            // DOCKER_HOST may name transports we cannot use (ssh://); those are ignored.
            None => get(DOCKER_HOST_ENV).and_then(|value| match Endpoint::parse(&value) {
                Ok(endpoint) => Some(endpoint),
                Err(e) => {
                    tracing::warn!("ignoring {}: {}", DOCKER_HOST_ENV, e);
                    None
                }
            }),
        };

        let prefer_rootless = !get(ROOTFUL_ENV).is_some_and(|v| is_truthy(&v));

        tracing::debug!(
            preferred = %preferred,
            prefer_rootless,
            explicit_socket = explicit_socket.is_some(),
            "resolved runtime configuration"
        );

        Ok(RuntimeConfig::new(preferred, prefer_rootless, explicit_socket))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_means_auto() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.preferred(), RuntimeKind::Auto);
        assert!(config.prefer_rootless());
        assert!(config.explicit_socket().is_none());
    }

    #[test]
    fn kind_provider_is_a_fallback() {
        let config =
            RuntimeConfig::from_lookup(lookup(&[(KIND_PROVIDER_ENV, "podman")])).unwrap();
        assert_eq!(config.preferred(), RuntimeKind::Podman);

        let config = RuntimeConfig::from_lookup(lookup(&[
            (RUNTIME_ENV, "docker"),
            (KIND_PROVIDER_ENV, "podman"),
        ]))
        .unwrap();
        assert_eq!(config.preferred(), RuntimeKind::Docker);
    }

    #[test]
    fn unsupported_kind_provider_falls_back_to_auto() {
        let config =
            RuntimeConfig::from_lookup(lookup(&[(KIND_PROVIDER_ENV, "nerdctl")])).unwrap();
        assert_eq!(config.preferred(), RuntimeKind::Auto);

        let config = RuntimeConfig::from_lookup(lookup(&[
            (RUNTIME_ENV, "podman"),
            (KIND_PROVIDER_ENV, "nerdctl"),
        ]))
        .unwrap();
        assert_eq!(config.preferred(), RuntimeKind::Podman);
    }

    #[test]
    fn rootful_toggle_disables_rootless_preference() {
        let config = RuntimeConfig::from_lookup(lookup(&[(ROOTFUL_ENV, "1")])).unwrap();
        assert!(!config.prefer_rootless());

        let config = RuntimeConfig::from_lookup(lookup(&[(ROOTFUL_ENV, "no")])).unwrap();
        assert!(config.prefer_rootless());
    }

    #[test]
    fn invalid_runtime_names_the_variable() {
        let err = RuntimeConfig::from_lookup(lookup(&[(RUNTIME_ENV, "lxc")])).unwrap_err();
        assert!(err.to_string().contains(RUNTIME_ENV));
    }

    #[test]
    fn ssh_docker_host_is_ignored() {
        let config =
            RuntimeConfig::from_lookup(lookup(&[(DOCKER_HOST_ENV, "ssh://dev@build-box")]))
                .unwrap();
        assert!(config.explicit_socket().is_none());
    }

    #[test]
    fn malformed_explicit_socket_is_rejected() {
        let err =
            RuntimeConfig::from_lookup(lookup(&[(SOCKET_ENV, "ftp://nowhere")])).unwrap_err();
        assert!(err.to_string().contains(SOCKET_ENV));
    }
}
