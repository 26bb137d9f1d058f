//! Gateway server command — `flowgate serve`.

use anyhow::{Context, Result};

use flowgate::config::GatewayConfig;
use flowgate::gateway::server::{self, ServerConfig};

pub async fn cmd_serve(host: String, port: u16, dev: bool) -> Result<()> {
    let config = GatewayConfig::from_env().context("Cannot start flowgate")?;

    server::start_server(
        ServerConfig {
            host,
            port,
            dev_mode: dev,
        },
        config,
    )
    .await
}
