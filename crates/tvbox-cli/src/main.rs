//! TvBox CLI entry point.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            output::print_error(&format!("Failed to start runtime: {e}"));
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(cli.execute());
    // A plugin whose init timed out still holds a blocking thread.
    runtime.shutdown_timeout(Duration::from_secs(1));

    if let Err(e) = result {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}
