// ABOUTME: Application-wide error types for kindle.
// ABOUTME: Uses thiserror for ergonomic error handling; each error may carry a hint.

use crate::cluster::ClusterError;
use crate::helm::HelmError;
use crate::install::InstallError;
use crate::pods::PodError;
use crate::runtime::{RuntimeError, RuntimeErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Helm(#[from] HelmError),

    #[error(transparent)]
    Pods(#[from] PodError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("interrupted")]
    Cancelled,
}

impl Error {
    /// A suggested next step for the user, where one exists.
    pub fn hint(&self) -> Option<String> {
        match self {
            Error::Install(e) => e.hint(),
            Error::Runtime(e) => match e.kind() {
                RuntimeErrorKind::NoRuntimeFound
                | RuntimeErrorKind::ConnectionFailed
                | RuntimeErrorKind::Unavailable => Some(e.start_hint()),
                RuntimeErrorKind::Cancelled => None,
                _ => Some("re-run with --verbose for more detail".to_string()),
            },
            Error::InvalidEnv { var, .. } => Some(format!("unset or correct {}", var)),
            Error::Cluster(ClusterError::NotInstalled { tool }) => {
                Some(format!("install {} and make sure it is on PATH", tool))
            }
            Error::Helm(HelmError::NotInstalled) => {
                Some("install helm and make sure it is on PATH".to_string())
            }
            Error::Pods(PodError::NotInstalled) => {
                Some("install kubectl and make sure it is on PATH".to_string())
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ConnectError, RuntimeKind};

    #[test]
    fn runtime_hint_names_the_runtime() {
        let err = Error::from(RuntimeError::from(ConnectError::Exhausted {
            runtime: RuntimeKind::Docker,
            attempted: 1,
            failures: Vec::new(),
        }));
        let hint = err.hint().unwrap();
        assert!(hint.contains("docker is running"), "{}", hint);
    }

    #[test]
    fn cancelled_runtime_has_no_hint() {
        let err = Error::from(RuntimeError::from(ConnectError::Cancelled {
            runtime: RuntimeKind::Podman,
        }));
        assert_eq!(err.hint(), None);
    }

    #[test]
    fn missing_helm_during_install_says_install_helm() {
        let err = Error::from(InstallError::Chart {
            release: "app".to_string(),
            source: HelmError::NotInstalled,
        });
        assert_eq!(
            err.hint().as_deref(),
            Some("install helm and make sure it is on PATH")
        );
    }
}
