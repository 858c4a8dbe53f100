//! shardctl CLI - Main entry point.

use anyhow::Context;
use shardctl::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    let command = cli.command.name();

    // Returning the error prints the full cause chain, root cause last,
    // and exits with status 1.
    shardctl::run(cli)
        .await
        .with_context(|| format!("shardctl {} failed", command))?;

    Ok(())
}
