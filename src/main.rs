// ABOUTME: Entry point for the kindle CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use kindle::error::{Error, Result};
use kindle::output::{Output, OutputMode};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins when set; otherwise the verbose flag picks the level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received, cancelling");
            trigger.cancel();
        }
    });

    let result = run(cli, mode, cancel).await;

    if let Err(e) = result {
        let output = Output::new(mode);
        output.error(&e.to_string());
        if let Some(hint) = e.hint() {
            output.hint(&hint);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode, cancel: CancellationToken) -> Result<()> {
    let output = Output::new(mode);
    let result = match cli.command {
        Commands::Install(args) => commands::install(args, output, cancel.clone()).await,
        Commands::Status { target } => commands::status(target, output, cancel.clone()).await,
        Commands::Logs { target, tail } => {
            commands::logs(target, tail, output, cancel.clone()).await
        }
        Commands::Uninstall {
            target,
            keep_cluster,
        } => commands::uninstall(target, keep_cluster, output, cancel.clone()).await,
        Commands::Runtime => commands::runtime(output, cancel.clone()).await,
    };

    match result {
        Err(_) if cancel.is_cancelled() => Err(Error::Cancelled),
        other => other,
    }
}
