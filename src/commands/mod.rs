// ABOUTME: Command module aggregator for the kindle CLI.
// ABOUTME: Re-exports install, status, logs, uninstall, and runtime command handlers.

mod install;
mod logs;
mod runtime;
mod runtime_connection;
mod status;
mod uninstall;

pub use install::install;
pub use logs::logs;
pub use runtime::runtime;
pub use status::status;
pub use uninstall::uninstall;

/// Release name of the ingress controller chart.
const INGRESS_RELEASE: &str = "ingress-nginx";
