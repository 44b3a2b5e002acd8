use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod dataset;
pub mod regressor;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr, their level is set by `BACKPROP_LOG` (`warn` by default).
    let filter = EnvFilter::try_from_env("BACKPROP_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cli::CLI::parse().execute()
}
