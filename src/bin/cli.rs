//! tas CLI
//!
//! Command-line client for a running tas server:
//! - Send INCR / APPEND commands over the ingest port
//! - Query keys over HTTP
//! - Show diagnostics and bucket counts

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tas::ingest::Command;
use tas::storage::Timestamp;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "tas-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for the tas time-series store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Query API URL
    #[arg(long, default_value = "http://localhost:7451", global = true)]
    pub api_url: String,

    /// Ingest listener address
    #[arg(long, default_value = "localhost:7450", global = true)]
    pub ingest_addr: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add to a counter
    Incr {
        /// Dotted key
        key: String,
        /// Amount to add
        #[arg(allow_hyphen_values = true)]
        delta: i64,
        /// Unix timestamp (default: now)
        #[arg(short, long)]
        time: Option<i64>,
    },

    /// Append to a series
    Append {
        /// Dotted key
        key: String,
        /// JSON array of items
        items: String,
        /// Unix timestamp (default: now)
        #[arg(short, long)]
        time: Option<i64>,
    },

    /// Query a key pattern
    Get {
        /// Dotted key, `*` matches one level
        key: String,
        /// Comma-separated timestamps to aggregate over
        #[arg(short, long)]
        timestamps: Option<String>,
        /// Rate interval in seconds
        #[arg(short, long)]
        interval: Option<f64>,
    },

    /// Show store diagnostics
    Diag,

    /// Show per-bucket sample counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Incr { key, delta, time } => {
            let command = Command::Incr {
                timestamp: resolve_time(time),
                key,
                delta,
            };
            send(&cli.ingest_addr, &command).await?;
            println!("Sent: {}", command);
        }

        Commands::Append { key, items, time } => {
            let items = match serde_json::from_str(&items).context("items must be JSON")? {
                serde_json::Value::Array(items) => items,
                _ => bail!("items must be a JSON array"),
            };
            let command = Command::Append {
                timestamp: resolve_time(time),
                key,
                items,
            };
            send(&cli.ingest_addr, &command).await?;
            println!("Sent: {}", command);
        }

        Commands::Get {
            key,
            timestamps,
            interval,
        } => {
            let mut params = vec![("key", key)];
            if let Some(t) = timestamps {
                params.push(("t", t));
            }
            if let Some(i) = interval {
                params.push(("i", i.to_string()));
            }

            let response = client
                .get(format!("{}/GET", cli.api_url))
                .query(&params)
                .send()
                .await
                .context("query request failed")?;
            print_json(response).await?;
        }

        Commands::Diag => {
            let response = client
                .get(format!("{}/DIAG", cli.api_url))
                .send()
                .await
                .context("diagnostics request failed")?;
            print_json(response).await?;
        }

        Commands::Stats => {
            let response = client
                .get(format!("{}/STATS", cli.api_url))
                .send()
                .await
                .context("stats request failed")?;

            if !response.status().is_success() {
                bail!("Stats failed ({})", response.status());
            }
            let counts: Vec<tas::BucketCount> = response.json().await?;
            if counts.is_empty() {
                println!("No buckets retained");
            }
            for count in counts {
                println!("{:>12}  {:>8}", count.timestamp, count.count);
            }
        }
    }

    Ok(())
}

fn resolve_time(time: Option<i64>) -> Timestamp {
    time.map(Timestamp::new).unwrap_or_else(Timestamp::now)
}

async fn send(addr: &str, command: &Command) -> anyhow::Result<()> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;
    stream.write_all(format!("{}\n", command).as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn print_json(response: reqwest::Response) -> anyhow::Result<()> {
    let status = response.status();
    let body: serde_json::Value = response.json().await?;
    if !status.is_success() {
        bail!("Request failed ({}): {}", status, body);
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
