// ABOUTME: Configuration resolution for kindle.
// ABOUTME: Environment-driven runtime selection, host facts and Helm values files.

mod env_vars;
mod host;
mod values;

pub use env_vars::{DOCKER_HOST_ENV, KIND_PROVIDER_ENV, ROOTFUL_ENV, RUNTIME_ENV, SOCKET_ENV};
pub use host::{HostEnv, XDG_RUNTIME_DIR_ENV};
pub use values::{load_values, merge_values, parse_values, set_path};
