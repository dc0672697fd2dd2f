use clap::Parser;

use crate::{influx::Client, prelude::*};

/// InfluxDB v2 connection, the run is not stored in InfluxDB without the URL.
#[derive(Parser)]
pub struct InfluxArgs {
    #[clap(long = "influx-url", env = "INFLUX_URL")]
    url: Option<String>,

    #[clap(long = "influx-org", env = "INFLUX_ORG", default_value = "eos")]
    org: String,

    #[clap(long = "influx-bucket", env = "INFLUX_BUCKET", default_value = "eos")]
    bucket: String,

    #[clap(long = "influx-token", env = "INFLUX_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl InfluxArgs {
    pub fn client(&self) -> Result<Option<Client>> {
        let Some(url) = &self.url else {
            return Ok(None);
        };
        let token = self.token.as_deref().context("InfluxDB token is required with the URL")?;
        Ok(Some(Client::new(url, self.org.clone(), self.bucket.clone(), token)))
    }
}
