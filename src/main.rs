//! cloudpipe binary entry point.

use clap::Parser;
use cloudpipe::cli::{self, Cli};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Silent unless RUST_LOG asks for output; stderr carries the diagnostic
    // contract, the logger only carries debug detail.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    cli::run(Cli::parse())
}
