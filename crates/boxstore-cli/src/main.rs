//! BoxStore CLI - command-line client for the BoxStore record service.

mod commands;
mod formatter;

use std::time::Duration;

use clap::Parser;

use boxstore_client::{Client, ClientConfig};

use commands::Command;
use formatter::{create_formatter, OutputFormat};

/// BoxStore command-line client
#[derive(Parser, Debug)]
#[command(name = "boxstore")]
#[command(version, about, long_about = None)]
struct Args {
    /// Server address
    #[arg(
        short = 'H',
        long,
        env = "BOXSTORE_ADDRESS",
        default_value = boxstore_client::config::DEFAULT_ADDRESS
    )]
    address: String,

    /// Output format
    #[arg(short, long, default_value = "table", value_enum)]
    format: OutputFormat,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let formatter = create_formatter(args.format);
    let config =
        ClientConfig::new(args.address.clone()).with_timeout(Duration::from_secs(args.timeout));

    tracing::debug!(address = %args.address, "connecting");
    let client = Client::connect(config).await?;

    let outcome = commands::execute(&client, args.command, formatter.as_ref()).await?;
    println!("{}", outcome.output);

    client.close().await;
    Ok(outcome.ok)
}
