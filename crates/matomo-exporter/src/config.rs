use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use matomo_metrics::DEFAULT_GEOCODER_URL;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MATOMO_URL or MATOMO_TOKEN environment variables are not set.")]
    MissingUrl,

    #[error("MATOMO_URL or MATOMO_TOKEN environment variables are not set.")]
    MissingToken,

    #[error("invalid MATOMO_URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("SCRAPE_INTERVAL must be greater than zero")]
    InvalidInterval,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "matomo-exporter")]
#[command(about = "Prometheus exporter for Matomo analytics")]
#[command(version)]
pub struct Cli {
    /// Matomo base URL
    #[arg(long, env = "MATOMO_URL")]
    pub url: Option<String>,

    /// Matomo API token
    #[arg(long, env = "MATOMO_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Address to serve metrics on
    #[arg(long, env = "IP", default_value = "0.0.0.0")]
    pub ip: IpAddr,

    /// Port to serve metrics on
    #[arg(long, env = "PORT", default_value = "9000")]
    pub port: u16,

    /// Seconds to wait between collection cycles
    #[arg(long, alias = "scrape_interval", env = "SCRAPE_INTERVAL", default_value = "30")]
    pub scrape_interval: u64,

    /// DEBUG, INFO, WARNING or ERROR (RUST_LOG takes precedence)
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    pub log_level: String,

    /// Timeout in seconds for each Matomo request
    #[arg(long, env = "REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// Nominatim compatible geocoding service
    #[arg(long, env = "GEOCODER_URL", default_value = DEFAULT_GEOCODER_URL)]
    pub geocoder_url: String,

    /// Publish regions without looking up coordinates
    #[arg(long, env = "DISABLE_GEOCODING")]
    pub disable_geocoding: bool,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub matomo_url: Url,
    pub token: String,
    pub ip: IpAddr,
    pub port: u16,
    pub scrape_interval: Duration,
    pub request_timeout: Option<Duration>,
    pub geocoder_url: Option<String>,
}

impl Cli {
    pub fn into_config(self) -> Result<ExporterConfig, ConfigError> {
        let url = non_empty(self.url).ok_or(ConfigError::MissingUrl)?;
        let token = non_empty(self.token).ok_or(ConfigError::MissingToken)?;

        let matomo_url = Url::parse(&url).map_err(|e| ConfigError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(matomo_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                reason: format!("unsupported scheme {}", matomo_url.scheme()),
                url,
            });
        }

        if self.scrape_interval == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        Ok(ExporterConfig {
            matomo_url,
            token,
            ip: self.ip,
            port: self.port,
            scrape_interval: Duration::from_secs(self.scrape_interval),
            request_timeout: self.request_timeout.map(Duration::from_secs),
            geocoder_url: (!self.disable_geocoding).then_some(self.geocoder_url),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
