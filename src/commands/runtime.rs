// ABOUTME: Runtime command implementation.
// ABOUTME: Shows the detected runtime, its endpoint and derived capability flags.

use super::runtime_connection::connect_to_runtime;
use kindle::error::Result;
use kindle::output::Output;
use kindle::runtime::{Capabilities, RuntimeInfo, RuntimeKind};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
struct RuntimeReport {
    runtime: RuntimeKind,
    endpoint: String,
    cli: &'static str,
    info: Option<RuntimeInfo>,
    capabilities: Option<Capabilities>,
}

pub async fn runtime(output: Output, cancel: CancellationToken) -> Result<()> {
    let (provider, _) = connect_to_runtime(&output, &cancel).await?;

    let info = match provider.info(&cancel).await {
        Ok(info) => Some(info),
        Err(e) => {
            output.warning(&format!("could not read runtime info: {}", e));
            None
        }
    };
    let capabilities = info.as_ref().map(Capabilities::from_info);

    let report = RuntimeReport {
        runtime: provider.kind(),
        endpoint: provider.endpoint().to_string(),
        cli: provider.executor().runtime_name(),
        info,
        capabilities,
    };

    let mut text = format!(
        "Runtime:   {}\nEndpoint:  {}\nCLI:       {}\n",
        report.runtime, report.endpoint, report.cli
    );
    if let Some(info) = &report.info {
        text.push_str(&format!(
            "Arch:      {} ({} CPUs, kernel {})\n",
            info.architecture, info.cpu_count, info.kernel_version
        ));
    }
    if let Some(caps) = &report.capabilities {
        text.push_str(&format!(
            "Rootless:  {}\ncgroup v2: {}\nseccomp:   {}\nAppArmor:  {}\nSELinux:   {}\n",
            caps.rootless, caps.cgroups, caps.seccomp, caps.apparmor, caps.selinux
        ));
    }
    output.data(&report, &text);
    Ok(())
}
