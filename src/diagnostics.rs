// ABOUTME: Diagnostics accumulator for non-fatal warnings and failed-pod reports during install.
// ABOUTME: Collects findings that shouldn't fail an install but should be shown to users.

use crate::pods::PodPhase;
use serde::Serialize;

/// Collects non-fatal warnings and failed-pod reports during an install.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    pods: Vec<PodReport>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Record a failed pod with whatever log tail could be fetched.
    pub fn record_pod(&mut self, report: PodReport) {
        tracing::debug!("pod {} is {}", report.name, report.phase);
        self.pods.push(report);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn pods(&self) -> &[PodReport] {
        &self.pods
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Human-readable failed-pod summary, empty when no pod was recorded.
    pub fn render_pods(&self) -> String {
        let mut out = String::new();
        for pod in &self.pods {
            out.push_str(&format!("pod {} ({})", pod.name, pod.phase));
            if let Some(reason) = &pod.reason {
                out.push_str(&format!(": {}", reason));
            }
            out.push('\n');
            if let Some(logs) = &pod.log_tail {
                for line in logs.lines() {
                    out.push_str("  | ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out
    }
}

/// A non-fatal warning collected during install.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a warning for an existing cluster published on a different port.
    pub fn port_mismatch(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::PortMismatch,
            message: message.into(),
        }
    }

    /// Create a warning for diagnostics that could not be gathered.
    pub fn diagnostics_unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DiagnosticsUnavailable,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Existing cluster publishes ingress on a port other than the requested one.
    PortMismatch,
    /// Pod listing or log retrieval failed while collecting failure diagnostics.
    DiagnosticsUnavailable,
}

/// A pod found in a failed phase after an install failure.
#[derive(Debug, Clone, Serialize)]
pub struct PodReport {
    pub name: String,
    pub phase: PodPhase,
    pub reason: Option<String>,
    pub log_tail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
        assert!(diag.render_pods().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::port_mismatch("cluster uses 9080"));
        diag.warn(Warning::diagnostics_unavailable("kubectl missing"));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
        assert_eq!(diag.warnings()[0].kind, WarningKind::PortMismatch);
        assert_eq!(diag.warnings()[1].kind, WarningKind::DiagnosticsUnavailable);
    }

    #[test]
    fn pod_reports_render_with_log_excerpt() {
        let mut diag = Diagnostics::default();
        diag.record_pod(PodReport {
            name: "db-0".to_string(),
            phase: PodPhase::Failed,
            reason: Some("Error".to_string()),
            log_tail: Some("FATAL: data directory has wrong version\n".to_string()),
        });

        let text = diag.render_pods();
        assert!(text.starts_with("pod db-0 (Failed): Error\n"));
        assert!(text.contains("  | FATAL: data directory has wrong version"));
    }
}
