use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use matomo_api::MatomoClient;
use matomo_metrics::{
    CachingGeocoder, DisabledGeocoder, ExporterRegistry, Geocoder, NominatimGeocoder, Scheduler,
    SiteCollector,
};

use crate::config::ExporterConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::metrics::handler))
        .route("/metrics", web::get().to(handlers::metrics::handler))
        .route("/health", web::get().to(handlers::health::handler));
}

/// Start the collection loop and serve the registry until the server stops.
pub async fn run_server(config: ExporterConfig) -> anyhow::Result<()> {
    let mut client = MatomoClient::new(config.matomo_url.as_str(), config.token.clone())
        .context("failed to create Matomo client")?;
    if let Some(timeout) = config.request_timeout {
        client = client
            .with_timeout(timeout)
            .context("failed to apply request timeout")?;
    }
    log::info!("Collecting from {}", client.endpoint());
    let api = Arc::new(client);

    let geocoder: Arc<dyn Geocoder> = match &config.geocoder_url {
        Some(url) => {
            log::info!("Geocoding regions with {}", url);
            let nominatim =
                NominatimGeocoder::new(url.as_str()).context("failed to create geocoder")?;
            Arc::new(CachingGeocoder::new(nominatim))
        }
        None => {
            log::info!("Geocoding disabled");
            Arc::new(DisabledGeocoder)
        }
    };

    let registry = Arc::new(ExporterRegistry::new().context("failed to build metric registry")?);
    let collector = SiteCollector::new(api.clone(), geocoder, registry.clone());
    let scheduler = Scheduler::new(api, collector, registry.clone(), config.scrape_interval);

    let state = web::Data::new(AppState::new(registry, scheduler.status_handle()));
    actix_web::rt::spawn(scheduler.run());

    log::info!("Serving metrics on {}:{}", config.ip, config.port);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind((config.ip, config.port))
        .with_context(|| format!("failed to bind {}:{}", config.ip, config.port))?
        .run()
        .await
        .context("metrics server stopped")?;

    Ok(())
}
