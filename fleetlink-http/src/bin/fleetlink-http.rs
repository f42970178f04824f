use clap::{Parser, Subcommand};
use fleetlink_http::{self, server::ServerConfig};
use std::path::PathBuf;

/// Fleetlink User Service HTTP API Server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "FLEETLINK_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "FLEETLINK_PORT")]
    port: u16,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server with a bridge configuration file
    Config {
        /// Path to the configuration file (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    fleetlink_http::init_tracing(&cli.log_level);

    let mut config = ServerConfig {
        host: cli.host,
        port: cli.port,
        ..Default::default()
    };

    if let Some(Commands::Config { file }) = &cli.command {
        println!("Loading bridge configuration from {}", file.display());
        config.bridge = fleetlink_core::config::from_file(file)?;
    }

    println!(
        "Starting fleetlink HTTP server on {}:{}",
        config.host, config.port
    );
    fleetlink_http::start_with_config(config).await?;

    Ok(())
}
