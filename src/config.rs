use anyhow::Result;
use config::builder::{ConfigBuilder, DefaultState};
use publicip::IpVersion;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub version: IpVersion,
}

impl Config {
    /// Optional config file as the first argument, then `PUBLICIP_*` overrides.
    pub fn init() -> Result<Self> {
        let mut settings = config::Config::builder();
        if let Some(config_name) = std::env::args().nth(1) {
            settings = settings.add_source(config::File::with_name(&config_name));
        }
        Self::build(settings.add_source(config::Environment::with_prefix("PUBLICIP")))
    }

    fn build(settings: ConfigBuilder<DefaultState>) -> Result<Self> {
        Ok(settings.build()?.try_deserialize::<Self>()?)
    }
}
