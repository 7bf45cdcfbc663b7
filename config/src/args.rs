use clap::Parser;
use std::{
    net::SocketAddr,
    path::PathBuf,
};

/// Prometheus exporter for ConoHa usage and billing data
#[derive(Parser, Clone)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Additional YAML config file, applied after the one in the config directory.
    #[clap(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Region whose endpoints are scraped, e.g. `tyo1`.
    #[clap(long, env = "CONOHA_REGION", value_name = "REGION")]
    pub region: Option<String>,

    #[clap(long, env = "CONOHA_TENANT_ID", value_name = "ID")]
    pub tenant_id: Option<String>,

    #[clap(long, env = "CONOHA_USERNAME", value_name = "USER")]
    pub username: Option<String>,

    #[clap(long, env = "CONOHA_PASSWORD", value_name = "PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Token endpoint to use instead of `https://identity.<region>.conoha.io/v2.0/tokens`.
    #[clap(long, env = "CONOHA_IDENTITY_URL", value_name = "URL")]
    pub identity_url: Option<String>,

    /// Address the metrics endpoint listens on.
    #[clap(long, env = "CONOHA_EXPORTER_LISTEN_ADDRESS", value_name = "ADDR")]
    pub listen_address: Option<SocketAddr>,

    /// Port override for the listen address.
    #[clap(long, env = "PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Time between refresh cycles, e.g. `70s` or `2m`.
    #[clap(long, value_name = "DURATION")]
    pub refresh_interval: Option<String>,

    /// Which row from the end of a usage series is reported.
    #[clap(long, value_name = "N")]
    pub usage_row_offset: Option<u64>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[clap(long, short = 'v', action)]
    pub verbose: bool,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("config", &self.config)
            .field("region", &self.region)
            .field("tenant_id", &self.tenant_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("identity_url", &self.identity_url)
            .field("listen_address", &self.listen_address)
            .field("port", &self.port)
            .field("refresh_interval", &self.refresh_interval)
            .field("usage_row_offset", &self.usage_row_offset)
            .field("verbose", &self.verbose)
            .finish()
    }
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            let strings = [
                ("region", &self.region),
                ("tenant_id", &self.tenant_id),
                ("username", &self.username),
                ("password", &self.password),
                ("identity_url", &self.identity_url),
                ("refresh_interval", &self.refresh_interval),
            ];
            for (key, value) in strings {
                if let Some(value) = value {
                    cache.insert(key.to_string(), value.clone().into());
                }
            }
            if let Some(listen_address) = &self.listen_address {
                cache.insert("listen_address".to_string(), listen_address.to_string().into());
            }
            if let Some(offset) = self.usage_row_offset {
                cache.insert("usage_row_offset".to_string(), offset.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();

    format!(
        "{}

Authors: {author}
Config directory: {config_dir_path}",
        clap::crate_version!()
    )
}
