use std::net::SocketAddr;

use anyhow::Context;
use carbide::config::Config;
use carbide::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let endpoint: SocketAddr = cfg
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address '{}'", cfg.server.listen_addr))?;

    let server = Server::from_config(&cfg);
    server.on_exception(|event| tracing::warn!("{}", event));
    server
        .start_with_hosting(endpoint, cfg.server.enable_hosting)
        .await
        .context("failed to start server")?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    server.stop(true).await;

    Ok(())
}
