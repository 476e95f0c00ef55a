//! tas server
//!
//! Run with: cargo run --bin tas -- [serve] [--config path]
//!
//! Configuration comes from `--config`, else the default search path
//! (`~/.config/tas/config.toml`, `/etc/tas/config.toml`, `./config.toml`),
//! with `TAS_*` environment overrides. `RUST_LOG` overrides the log level.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tas::config::{generate_default_config, Config, LoggingConfig};
use tas::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "tas")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "In-memory dotted-key time-series store")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingest listener, query API and evictor (default)
    Serve,

    /// Print a commented default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Wrote default config to {}", path.display());
                }
                None => print!("{}", content),
            }
            Ok(())
        }
        Commands::Serve => {
            let config = match cli.config {
                Some(path) => Config::load_with_env(&path)?,
                None => Config::load_default(),
            };
            init_tracing(&config.logging);

            tracing::info!("Starting tas v{}", env!("CARGO_PKG_VERSION"));
            tracing::info!(
                horizon_secs = config.retention.horizon_secs,
                bucket_width_secs = config.retention.bucket_width_secs,
                "Retention configured"
            );

            let server = Server::start(&config).await?;
            server.run_until_shutdown().await?;
            Ok(())
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("tas={},tower_http=info", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
