use clap::Parser;
use wildfire_enricher::cli::{run, Cli};
use wildfire_enricher::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
