use anyhow::Context;
use buddy_server::{ServerConfig, run_server, telemetry::init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::from_env().context("failed to load configuration")?;
    run_server(config).await
}
