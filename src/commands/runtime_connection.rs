// ABOUTME: Shared helper for connecting to the local container runtime.
// ABOUTME: Resolves configuration from the environment and builds a validated provider.

use kindle::config::HostEnv;
use kindle::error::Result;
use kindle::output::Output;
use kindle::runtime::{RuntimeConfig, RuntimeProvider};
use tokio_util::sync::CancellationToken;

/// Detect and connect to Docker or Podman on this machine.
///
/// This handles the common pattern of:
/// 1. Resolving runtime preferences from the environment
/// 2. Detecting and validating an endpoint
/// 3. Outputting progress messages
pub async fn connect_to_runtime(
    output: &Output,
    cancel: &CancellationToken,
) -> Result<(RuntimeProvider, HostEnv)> {
    output.progress("→ Detecting container runtime...");
    let config = RuntimeConfig::from_env()?;
    let host = HostEnv::current();

    let provider = RuntimeProvider::connect(&config, &host, cancel).await?;
    output.progress(&format!(
        "→ Found {} at {}",
        provider.kind(),
        provider.endpoint()
    ));

    Ok((provider, host))
}
