// ABOUTME: Install orchestration for the local cluster and its charts.
// ABOUTME: Bounded retry on Helm lock contention, failed-pod diagnostics on hard failures.

mod error;
mod legacy;
mod opts;
mod orchestrator;
mod port;
mod retry;

pub use error::InstallError;
pub use legacy::legacy_values;
pub use opts::{ChartRequest, InstallOpts, InstallSummary};
pub use orchestrator::{DEFAULT_LOG_TAIL, Installer};
pub use port::ensure_port_free;
pub use retry::{RetryError, RetryPolicy, is_stuck_operation, retry_stuck};
