use anyhow::{anyhow, Result};
use log::info;

use crate::config::Config;

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let config = Config::init()?;
    info!("Looking up public {:?} address", config.version);
    let ip = publicip::query_dns(config.version)
        .await?
        .ok_or_else(|| anyhow!("No provider reported a public address"))?;
    println!("{}", ip);
    Ok(())
}
