//! Binary entrypoint for the `north` CLI and HTTP service.
use clap::Parser;
use north_api::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run(Cli::parse()).await
}
