// ABOUTME: Normalized runtime system facts and the capability flags derived from them.
// ABOUTME: Accepts Docker's flat `info` JSON and Podman's nested `host` JSON.

use serde::{Deserialize, Serialize};

/// Podman's `host.security` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostSecurity {
    pub rootless: bool,
    pub seccomp_enabled: bool,
    pub apparmor_enabled: bool,
    pub selinux_enabled: bool,
}

/// System facts reported by the runtime, in one shape for both runtimes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeInfo {
    pub cgroup_version: String,
    pub architecture: String,
    pub cpu_count: u64,
    pub mem_total: u64,
    pub os_type: String,
    pub kernel_version: String,
    pub security_options: Vec<String>,
    /// Present only when the runtime reported Podman's nested security block.
    pub host_security: Option<HostSecurity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DockerInfoWire {
    cgroup_version: String,
    architecture: String,
    #[serde(rename = "NCPU")]
    ncpu: u64,
    mem_total: u64,
    #[serde(rename = "OSType")]
    os_type: String,
    kernel_version: String,
    security_options: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodmanInfoWire {
    host: PodmanHostWire,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PodmanHostWire {
    arch: String,
    cgroup_version: String,
    cpus: u64,
    mem_total: u64,
    os: String,
    kernel: String,
    security: Option<HostSecurity>,
}

impl From<DockerInfoWire> for RuntimeInfo {
    fn from(wire: DockerInfoWire) -> Self {
        RuntimeInfo {
            cgroup_version: wire.cgroup_version,
            architecture: wire.architecture,
            cpu_count: wire.ncpu,
            mem_total: wire.mem_total,
            os_type: wire.os_type,
            kernel_version: wire.kernel_version,
            security_options: wire.security_options,
            host_security: None,
        }
    }
}

impl From<PodmanInfoWire> for RuntimeInfo {
    fn from(wire: PodmanInfoWire) -> Self {
        let host = wire.host;
        RuntimeInfo {
            cgroup_version: host.cgroup_version,
            architecture: host.arch,
            cpu_count: host.cpus,
            mem_total: host.mem_total,
            os_type: host.os,
            kernel_version: host.kernel,
            security_options: Vec::new(),
            host_security: host.security,
        }
    }
}

impl RuntimeInfo {
    /// Parse either wire shape. A top-level `host` object selects the Podman shape.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        if value.get("host").is_some_and(|h| h.is_object()) {
            Ok(serde_json::from_value::<PodmanInfoWire>(value)?.into())
        } else {
            Ok(serde_json::from_value::<DockerInfoWire>(value)?.into())
        }
    }
}

/// Feature flags derived from [`RuntimeInfo`]. Recomputed on every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub rootless: bool,
    /// cgroup v2 is available.
    pub cgroups: bool,
    pub seccomp: bool,
    pub apparmor: bool,
    pub selinux: bool,
    pub cgroup_version: String,
    pub security_options: Vec<String>,
}

impl Capabilities {
    pub fn from_info(info: &RuntimeInfo) -> Self {
        let (rootless, seccomp, apparmor, selinux) = match &info.host_security {
            Some(sec) => (
                sec.rootless,
                sec.seccomp_enabled,
                sec.apparmor_enabled,
                sec.selinux_enabled,
            ),
            None => {
                let has = |needle: &str| {
                    info.security_options
                        .iter()
                        .any(|opt| opt.to_ascii_lowercase().contains(needle))
                };
                (has("rootless"), has("seccomp"), has("apparmor"), has("selinux"))
            }
        };

        Capabilities {
            rootless,
            cgroups: is_cgroup_v2(&info.cgroup_version),
            seccomp,
            apparmor,
            selinux,
            cgroup_version: info.cgroup_version.clone(),
            security_options: info.security_options.clone(),
        }
    }

    /// Every flag set in `required` must also be set here. Unset requirements never block.
    pub fn is_compatible_with(&self, required: &Capabilities) -> bool {
        self.flags()
            .iter()
            .zip(required.flags())
            .all(|(have, need)| *have || !need)
    }

    fn flags(&self) -> [bool; 5] {
        [
            self.rootless,
            self.cgroups,
            self.seccomp,
            self.apparmor,
            self.selinux,
        ]
    }
}

fn is_cgroup_v2(version: &str) -> bool {
    let version = version.trim().to_ascii_lowercase();
    version.strip_prefix('v').unwrap_or(&version) == "2"
}
