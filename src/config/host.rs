// ABOUTME: Snapshot of host facts used by socket detection (uid, home, XDG runtime dir).
// ABOUTME: Captured once so detectors stay pure and testable.

use std::path::PathBuf;

/// User runtime directory used by rootless Podman and rootless Docker.
pub const XDG_RUNTIME_DIR_ENV: &str = "XDG_RUNTIME_DIR";

const DATA_DIR_NAME: &str = ".kindle";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnv {
    /// Effective user id, when it could be determined.
    pub uid: Option<u32>,
    /// Home directory of the invoking user.
    pub home: Option<PathBuf>,
    /// Value of `XDG_RUNTIME_DIR`, if set.
    pub xdg_runtime_dir: Option<PathBuf>,
}

impl HostEnv {
    /// Capture the current process's host facts.
    pub fn current() -> Self {
        let mut host = Self::from_lookup(|key| std::env::var(key).ok());
        if host.uid.is_none() {
            host.uid = uid_from_proc();
        }
        host
    }

    /// Build from a variable lookup only (no `/proc` fallback).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            uid: non_empty("UID").and_then(|v| v.trim().parse().ok()),
            home: non_empty("HOME")
                .or_else(|| non_empty("USERPROFILE"))
                .map(PathBuf::from),
            xdg_runtime_dir: non_empty(XDG_RUNTIME_DIR_ENV).map(PathBuf::from),
        }
    }

    pub fn is_root(&self) -> bool {
        self.uid == Some(0)
    }

    /// Per-user runtime directory: `$XDG_RUNTIME_DIR`, else `/run/user/<uid>`.
    pub fn runtime_dir(&self) -> Option<PathBuf> {
        self.xdg_runtime_dir
            .clone()
            .or_else(|| self.uid.map(|uid| PathBuf::from(format!("/run/user/{}", uid))))
    }

    /// Directory holding persisted installer data (mounted into the cluster node).
    pub fn data_dir(&self) -> PathBuf {
        self.home
            .clone()
            .unwrap_or_else(std::env::temp_dir)
            .join(DATA_DIR_NAME)
    }
}

fn uid_from_proc() -> Option<u32> {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|s| {
            s.lines()
                .find(|l| l.starts_with("Uid:"))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|uid| uid.parse().ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_dir_defaults_to_run_user() {
        let host = HostEnv {
            uid: Some(1000),
            ..Default::default()
        };
        assert_eq!(host.runtime_dir(), Some(PathBuf::from("/run/user/1000")));
    }

    #[test]
    fn xdg_runtime_dir_wins() {
        let host = HostEnv::from_lookup(|key| match key {
            "UID" => Some("1000".to_string()),
            XDG_RUNTIME_DIR_ENV => Some("/tmp/xdg".to_string()),
            _ => None,
        });
        assert_eq!(host.runtime_dir(), Some(PathBuf::from("/tmp/xdg")));
        assert!(!host.is_root());
    }

    #[test]
    fn data_dir_lives_under_home() {
        let host = HostEnv {
            home: Some(PathBuf::from("/home/dev")),
            ..Default::default()
        };
        assert_eq!(host.data_dir(), PathBuf::from("/home/dev/.kindle"));
    }
}
