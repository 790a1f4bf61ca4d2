use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use brigade_server::config::ServerConfig;
use brigade_server::server::Server;
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting brigade server...");

    let config_path = Path::new("config/server.toml");
    let config = ServerConfig::load(config_path)?;
    info!(
        hostname = %config.hostname,
        port = config.port,
        tickrate = config.tickrate,
        max_players = config.max_players,
        "config loaded"
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let tickrate = config.tickrate;
    let mut server = Server::bind(addr, config)?;
    info!(%addr, "listening");

    let tick_interval = Duration::from_secs_f64(1.0 / tickrate as f64);
    let autosave_interval_ticks = ((tickrate as u32) * 60).max(1);

    loop {
        let tick_start = Instant::now();
        server.update();

        if server.tick() % autosave_interval_ticks == 0 {
            if let Err(e) = server.persist_config(config_path) {
                tracing::warn!(error = %e, "autosave failed");
            }
        }

        let elapsed = tick_start.elapsed();
        if elapsed < tick_interval {
            std::thread::sleep(tick_interval - elapsed);
        } else {
            tracing::warn!(?elapsed, budget = ?tick_interval, "tick overran budget");
        }
    }
}
