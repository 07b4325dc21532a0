use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use draughts_server::{Server, ServerConfig, ServerState};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("draughts_server=debug".parse()?))
        .init();

    info!("国际跳棋服务端启动中...");

    let config = ServerConfig::load()?;
    info!("Config: {:?}", config);

    let state = Arc::new(ServerState::from_config(config)?);
    let server = Server::bind(state).await.context("Failed to bind listener")?;
    server.run().await.context("Server stopped")?;

    Ok(())
}
