//! graveyard — operator CLI over a ledger snapshot
//!
//! Usage:
//!   graveyard --ledger ./ledger.json init
//!   graveyard --ledger ./ledger.json signup --name Ann --email ann@example.com
//!   graveyard --ledger ./ledger.json revive --project <id> --reviver <id>
//!   graveyard --ledger ./ledger.json leaderboard --limit 5
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use clap::Parser;
use graveyard::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "graveyard=info".into());
    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let output = graveyard::run(cli).await?;
    println!("{}", output);
    Ok(())
}
