//! `bentofolio serve`: Start the HTTP editor API.

use std::path::Path;

pub async fn run(path: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Bentofolio gateway");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Portfolio: {}", config.storage.identity);
    println!("   Assistant: {}", if config.has_api_key() { "enabled" } else { "no API key" });

    bentofolio_gateway::start(config).await?;

    Ok(())
}
