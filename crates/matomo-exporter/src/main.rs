use std::process;

use clap::Parser;
use matomo_exporter::logging::init_logging;
use matomo_exporter::{run_server, Cli};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Error: {}", error);
            process::exit(1);
        }
    };

    log::info!("Starting Matomo exporter");
    log::debug!("Configuration:");
    log::debug!("  Matomo URL: {}", config.matomo_url);
    log::debug!("  Listen: {}:{}", config.ip, config.port);
    log::debug!("  Scrape interval: {:?}", config.scrape_interval);
    log::debug!("  Request timeout: {:?}", config.request_timeout);

    run_server(config).await
}
