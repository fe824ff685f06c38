use clap::Parser;
use njord::cli::{Cli, run};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> std::process::ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("njord=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    run(Cli::parse())
}
