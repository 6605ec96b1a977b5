use clap::Parser;
use log::{error, info};
use server::config::{RoomTiming, ServerConfig};
use server::network::Server;
use server::results::LogResultSink;
use std::sync::Arc;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Room tick rate (updates per second)
    #[clap(short, long, default_value = "20")]
    tick_rate: u32,
    /// Minimum milliseconds between two room snapshots
    #[clap(long, default_value = "100")]
    snapshot_ms: u64,
    /// Countdown ticks before a room starts
    #[clap(long, default_value = "3")]
    countdown: u32,
    /// Assault match length in seconds
    #[clap(long, default_value = "300")]
    match_secs: u64,
    /// Seconds of silence before a client is dropped
    #[clap(long, default_value = "5")]
    client_timeout: u64,
    /// Maximum concurrent clients
    #[clap(long, default_value = "64")]
    max_clients: usize,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let room = RoomTiming {
            snapshot_interval: Duration::from_millis(self.snapshot_ms),
            countdown_ticks: self.countdown,
            assault_match_duration: Duration::from_secs(self.match_secs),
            ..RoomTiming::with_tick_rate(self.tick_rate)
        };
        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            max_clients: self.max_clients,
            client_timeout: Duration::from_secs(self.client_timeout),
            room,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    info!(
        "Starting server on {} ({:?} per tick, {} max clients)",
        config.bind_addr, config.room.tick, config.max_clients
    );

    let mut server = Server::new(config, Arc::new(LogResultSink)).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
