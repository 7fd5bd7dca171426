//! chartdeck server binary.
//!
//! Exits non-zero when the required database settings are missing.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    server::start_server(config).await?;
    Ok(())
}
