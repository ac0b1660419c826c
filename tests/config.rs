// ABOUTME: Integration tests for environment-driven configuration and values files.
// ABOUTME: Tests runtime selection precedence, host facts and values layering.

use kindle::config::*;
use kindle::runtime::{RuntimeConfig, RuntimeKind};
use kindle::types::Endpoint;
use serde_yaml::Value;
use std::path::PathBuf;

const RUNTIME_VARS: [&str; 5] = [
    RUNTIME_ENV,
    KIND_PROVIDER_ENV,
    SOCKET_ENV,
    DOCKER_HOST_ENV,
    ROOTFUL_ENV,
];

/// Run `f` with only `set` among the runtime variables present.
fn with_runtime_env<R>(set: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    let vars: Vec<(&str, Option<&str>)> = RUNTIME_VARS
        .iter()
        .map(|name| {
            let value = set.iter().find(|(k, _)| k == name).map(|(_, v)| *v);
            (*name, value)
        })
        .collect();
    temp_env::with_vars(vars, f)
}

mod runtime_selection {
    use super::*;

    #[test]
    fn explicit_socket_beats_docker_host() {
        let config = with_runtime_env(
            &[
                (SOCKET_ENV, "unix:///run/user/1000/podman/podman.sock"),
                (DOCKER_HOST_ENV, "tcp://10.0.0.5:2375"),
            ],
            RuntimeConfig::from_env,
        )
        .unwrap();

        assert_eq!(
            config.explicit_socket(),
            Some(&Endpoint::unix("/run/user/1000/podman/podman.sock"))
        );
    }

    #[test]
    fn docker_host_is_the_fallback_override() {
        let config =
            with_runtime_env(&[(DOCKER_HOST_ENV, "tcp://10.0.0.5:2375")], RuntimeConfig::from_env)
                .unwrap();

        assert_eq!(
            config.explicit_socket().map(Endpoint::as_str),
            Some("tcp://10.0.0.5:2375")
        );
        assert_eq!(config.preferred(), RuntimeKind::Auto);
    }

    #[test]
    fn runtime_variable_beats_kind_provider() {
        let config = with_runtime_env(
            &[(RUNTIME_ENV, "Podman"), (KIND_PROVIDER_ENV, "docker")],
            RuntimeConfig::from_env,
        )
        .unwrap();
        assert_eq!(config.preferred(), RuntimeKind::Podman);
    }

    #[test]
    fn blank_values_are_unset() {
        let config =
            with_runtime_env(&[(RUNTIME_ENV, "  "), (SOCKET_ENV, "")], RuntimeConfig::from_env)
                .unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn unknown_runtime_is_rejected() {
        let err = with_runtime_env(&[(RUNTIME_ENV, "containerd")], RuntimeConfig::from_env)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains(RUNTIME_ENV), "got: {}", message);
        assert!(message.contains("containerd"), "got: {}", message);
    }
}

mod host {
    use super::*;

    #[test]
    fn host_facts_from_lookup() {
        let host = HostEnv::from_lookup(|key| match key {
            "UID" => Some("1000".to_string()),
            "HOME" => Some("/home/dev".to_string()),
            _ => None,
        });

        assert_eq!(host.uid, Some(1000));
        assert!(!host.is_root());
        assert_eq!(host.runtime_dir(), Some(PathBuf::from("/run/user/1000")));
        assert_eq!(host.data_dir(), PathBuf::from("/home/dev/.kindle"));
    }

    #[test]
    fn xdg_runtime_dir_wins() {
        let host = HostEnv::from_lookup(|key| match key {
            "UID" => Some("1000".to_string()),
            XDG_RUNTIME_DIR_ENV => Some("/tmp/xdg-1000".to_string()),
            _ => None,
        });
        assert_eq!(host.runtime_dir(), Some(PathBuf::from("/tmp/xdg-1000")));
    }
}

mod values {
    use super::*;

    #[test]
    fn user_file_layers_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.yaml");
        std::fs::write(
            &path,
            "postgresql:\n  image:\n    tag: 15.4.0\ningress:\n  host: kindle.local\n",
        )
        .unwrap();

        let mut values = parse_values("postgresql:\n  image:\n    tag: 13.16.0\n    repository: postgres\n").unwrap();
        merge_values(&mut values, load_values(&path).unwrap());

        let values = Value::Mapping(values);
        assert_eq!(values["postgresql"]["image"]["tag"].as_str(), Some("15.4.0"));
        assert_eq!(
            values["postgresql"]["image"]["repository"].as_str(),
            Some("postgres")
        );
        assert_eq!(values["ingress"]["host"].as_str(), Some("kindle.local"));
    }

    #[test]
    fn empty_file_is_empty_mapping() {
        assert!(parse_values("").unwrap().is_empty());
    }

    #[test]
    fn non_mapping_is_rejected() {
        assert!(parse_values("- a\n- b\n").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_values(std::path::Path::new("/nonexistent/values.yaml")).is_err());
    }
}
