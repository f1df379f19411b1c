mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, LogFormat};
use tether_directory::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }

    let ctx = CancellationToken::new();
    let root = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling in-flight calls");
            root.cancel();
        }
    });

    let clean = match cli.command {
        Command::Apply { file, dry_run, concurrency } => {
            commands::apply(&ctx, &cli.directory, cli.output, file, dry_run, concurrency).await?
        }
        Command::Destroy { file, yes, dry_run, concurrency } => {
            commands::destroy(&ctx, &cli.directory, cli.output, file, yes, dry_run, concurrency).await?
        }
        Command::Get { object } => {
            commands::get(&ctx, &cli.directory, cli.output, object).await?;
            true
        }
    };

    if !clean {
        std::process::exit(1);
    }
    Ok(())
}
