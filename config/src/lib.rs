#[macro_use]
extern crate tracing;

mod app_config;
mod args;

use app_config::AppConfig;
pub use app_config::get_config_dir;
pub use args::Args;
use color_eyre::Result;
use conoha_client::{
    ClientOptions,
    PasswordCredentials,
};
use eyre::ensure;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    net::SocketAddr,
    path::Path,
    time::Duration,
};
use url::Url;

/// Which upstream categories are scraped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectConfig {
    #[serde(default = "enabled")]
    pub compute: bool,
    #[serde(default = "enabled")]
    pub database: bool,
    #[serde(default = "enabled")]
    pub object_storage: bool,
    #[serde(default = "enabled")]
    pub billing: bool,
}

fn enabled() -> bool {
    true
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            compute: true,
            database: true,
            object_storage: true,
            billing: true,
        }
    }
}

impl CollectConfig {
    pub fn any(&self) -> bool {
        self.compute || self.database || self.object_storage || self.billing
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    app_config: AppConfig,
    pub region: String,
    pub tenant_id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub provider_domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_url: Option<Url>,
    pub listen_address: SocketAddr,
    #[serde(with = "humantime_duration")]
    pub refresh_interval: Duration,
    pub usage_row_offset: usize,
    #[serde(with = "humantime_duration")]
    pub renewal_margin: Duration,
    #[serde(default, with = "humantime_duration::option", skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<Duration>,
    #[serde(default)]
    pub collect: CollectConfig,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("region", &self.region)
            .field("tenant_id", &self.tenant_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("provider_domain", &self.provider_domain)
            .field("identity_url", &self.identity_url)
            .field("listen_address", &self.listen_address)
            .field("refresh_interval", &self.refresh_interval)
            .field("usage_row_offset", &self.usage_row_offset)
            .field("renewal_margin", &self.renewal_margin)
            .field("request_timeout", &self.request_timeout)
            .field("collect", &self.collect)
            .finish()
    }
}

impl Config {
    /// Layer, lowest to highest: built-in defaults, `config.yaml` in the config
    /// directory, the file given with `--config`, then flags and environment.
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        Self::with_config_dir(args, &get_config_dir())
    }

    pub fn with_config_dir(args: Args, config_dir: &Path) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml))
            .add_source(
                config::File::from(config_dir.join("config.yaml"))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            );

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()).format(config::FileFormat::Yaml));
        }

        let port = args.port;
        builder = builder.add_source(args);

        let mut cfg: Self = builder.build()?.try_deserialize()?;
        if let Some(port) = port {
            cfg.listen_address.set_port(port);
        }

        debug!(config_dir = %cfg.config_dir().display(), "loaded configuration");
        Ok(cfg)
    }

    pub fn config_dir(&self) -> &Path {
        &self.app_config.config_dir
    }

    /// Reject settings the exporter cannot start with.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.region.trim().is_empty(), "region must not be empty");
        ensure!(!self.tenant_id.trim().is_empty(), "tenant_id is required (CONOHA_TENANT_ID)");
        ensure!(!self.username.trim().is_empty(), "username is required (CONOHA_USERNAME)");
        ensure!(!self.password.is_empty(), "password is required (CONOHA_PASSWORD)");
        ensure!(!self.refresh_interval.is_zero(), "refresh_interval must be greater than zero");
        ensure!(self.usage_row_offset > 0, "usage_row_offset must be at least 1");
        ensure!(self.collect.any(), "at least one collector must be enabled");
        Ok(())
    }

    pub fn credentials(&self) -> PasswordCredentials {
        PasswordCredentials {
            tenant_id: self.tenant_id.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::new(&self.region, self.credentials());
        options.provider_domain = self.provider_domain.clone();
        options.identity_url = self.identity_url.clone();
        options.renewal_margin = self.renewal_margin;
        options.request_timeout = self.request_timeout;
        options.usage_row_offset = self.usage_row_offset;
        options
    }
}

mod humantime_duration {
    use serde::{
        de::Error as _,
        Deserialize,
        Deserializer,
        Serializer,
    };
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(|err| D::Error::custom(format!("invalid duration {raw:?}: {err}")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
            match duration {
                Some(duration) => super::serialize(duration, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| {
                    humantime::parse_duration(&raw)
                        .map_err(|err| D::Error::custom(format!("invalid duration {raw:?}: {err}")))
                })
                .transpose()
        }
    }
}
