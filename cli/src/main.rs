use clap::Parser;
use presentation::cli::{Cli, CliApp};
use shared::types::Result;

#[tokio::main]
async fn main() -> Result<()> {
    CliApp::new().run(Cli::parse()).await
}
