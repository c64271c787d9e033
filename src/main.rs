use anyhow::Result;
use clap::Parser;
use gemini_relay::models::{Config, RelayMode};
use gemini_relay::server::run_server;
use std::net::{IpAddr, SocketAddr};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "gemini-relay")]
#[command(about = "Relay document analysis and handwriting generation to Gemini")]
struct CliArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Override RELAY_MODE from the environment.
    #[arg(long, value_enum)]
    relay_mode: Option<RelayMode>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting gemini-relay");

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(mode) = args.relay_mode {
        config.relay_mode = mode;
    }

    let addr = SocketAddr::new(args.host, args.port);
    if let Err(e) = run_server(config, addr).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
