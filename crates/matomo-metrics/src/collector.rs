use std::sync::Arc;

use matomo_api::query::method;
use matomo_api::{AnalyticsApi, ApiError, Period, SiteId};
use thiserror::Error;

use crate::geo::{place_text, GeoPoint, Geocoder};
use crate::pages::flatten;
use crate::registry::{ExporterRegistry, SiteGauge};
use crate::types::SummaryWindow;

pub const UNKNOWN_SITE_NAME: &str = "Unknown";

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{method} failed: {source}")]
    Api {
        method: &'static str,
        #[source]
        source: ApiError,
    },
}

fn api_error(method: &'static str) -> impl FnOnce(ApiError) -> CollectError {
    move |source| CollectError::Api { method, source }
}

/// Fetches every metric family for one site and publishes it to the registry.
pub struct SiteCollector {
    api: Arc<dyn AnalyticsApi>,
    geocoder: Arc<dyn Geocoder>,
    registry: Arc<ExporterRegistry>,
}

impl SiteCollector {
    pub fn new(
        api: Arc<dyn AnalyticsApi>,
        geocoder: Arc<dyn Geocoder>,
        registry: Arc<ExporterRegistry>,
    ) -> Self {
        Self {
            api,
            geocoder,
            registry,
        }
    }

    /// Display name of a site, or [`UNKNOWN_SITE_NAME`] when the lookup fails.
    pub async fn site_name(&self, site: &SiteId) -> String {
        match self.api.site_name(site).await {
            Ok(name) => name,
            Err(error) => {
                log::error!("Error getting site name for site {}: {}", site, error);
                UNKNOWN_SITE_NAME.to_string()
            }
        }
    }

    /// Collect all families for `site`, labelled with `site_name`.
    ///
    /// Stops at the first API error. Series already written in this call are
    /// kept.
    pub async fn collect_site(&self, site: &SiteId, site_name: &str) -> Result<(), CollectError> {
        self.collect_summaries(site, site_name).await?;
        for period in Period::ALL {
            self.collect_pages(site, site_name, period).await?;
        }
        for period in Period::ALL {
            self.collect_os_versions(site, site_name, period).await?;
            self.collect_countries(site, site_name, period).await?;
        }
        for period in Period::ALL {
            self.collect_regions(site, site_name, period).await?;
        }
        Ok(())
    }

    async fn collect_summaries(&self, site: &SiteId, site_name: &str) -> Result<(), CollectError> {
        for window in SummaryWindow::canonical() {
            let summary = self
                .api
                .summary(site, window.period, window.date)
                .await
                .map_err(api_error(method::VISITS_SUMMARY))?;

            let label_values = [site_name, window.tag];
            let fields = [
                (&self.registry.visits, summary.nb_visits, "nb_visits"),
                (&self.registry.unique_visitors, summary.nb_uniq_visitors, "nb_uniq_visitors"),
                (&self.registry.bounce_count, summary.bounce_count, "bounce_count"),
                (&self.registry.actions, summary.nb_actions, "nb_actions"),
            ];

            for (gauge, value, field) in fields {
                match value {
                    Some(count) => gauge.set(site, &label_values, count as f64),
                    None => log::debug!(
                        "Site {} ({}): no valid {} for {}, keeping previous value",
                        site,
                        site_name,
                        field,
                        window.tag
                    ),
                }
            }
        }
        Ok(())
    }

    async fn collect_pages(
        &self,
        site: &SiteId,
        site_name: &str,
        period: Period,
    ) -> Result<(), CollectError> {
        let tree = self
            .api
            .page_tree(site, period)
            .await
            .map_err(api_error(method::PAGE_URLS))?;

        let tag = period.as_str();
        let rows = flatten(&tree)
            .into_iter()
            .map(|(page, count)| (labels(&[site_name, page.as_str(), tag]), count as f64));
        self.registry.page_visits.replace(site, tag, rows);
        Ok(())
    }

    async fn collect_os_versions(
        &self,
        site: &SiteId,
        site_name: &str,
        period: Period,
    ) -> Result<(), CollectError> {
        let rows = self
            .api
            .os_breakdown(site, period)
            .await
            .map_err(api_error(method::OS_VERSIONS))?;
        publish_breakdown(
            &self.registry.os_visitors,
            site,
            site_name,
            period,
            rows.iter().map(|row| (row.label.as_deref(), row.nb_visits)),
        );
        Ok(())
    }

    async fn collect_countries(
        &self,
        site: &SiteId,
        site_name: &str,
        period: Period,
    ) -> Result<(), CollectError> {
        let rows = self
            .api
            .country_breakdown(site, period)
            .await
            .map_err(api_error(method::COUNTRY))?;
        publish_breakdown(
            &self.registry.country_visitors,
            site,
            site_name,
            period,
            rows.iter().map(|row| (row.label.as_deref(), row.nb_visits)),
        );
        Ok(())
    }

    async fn collect_regions(
        &self,
        site: &SiteId,
        site_name: &str,
        period: Period,
    ) -> Result<(), CollectError> {
        let rows = self
            .api
            .region_breakdown(site, period)
            .await
            .map_err(api_error(method::REGION))?;

        let tag = period.as_str();
        let mut series = Vec::with_capacity(rows.len());
        for row in &rows {
            let (Some(region), Some(count)) = (row.region_display(), row.nb_visits) else {
                continue;
            };

            // Region codes and raw labels are never geocoded.
            let point = match row.region_name.as_deref().filter(|name| !name.trim().is_empty()) {
                Some(name) => {
                    self.resolve(place_text(Some(name), row.country_name.as_deref()))
                        .await
                }
                None => None,
            };
            let (latitude, longitude, resolved) = match point {
                Some(point) => (point.latitude, point.longitude, "true"),
                None => (0.0, 0.0, "false"),
            };
            let (latitude, longitude) = (latitude.to_string(), longitude.to_string());

            series.push((
                labels(&[
                    site_name,
                    region,
                    tag,
                    row.country.as_deref().unwrap_or_default(),
                    latitude.as_str(),
                    longitude.as_str(),
                    resolved,
                ]),
                count as f64,
            ));
        }

        self.registry.region_visitors.replace(site, tag, series);
        Ok(())
    }

    async fn resolve(&self, place: Option<String>) -> Option<GeoPoint> {
        let place = place?;
        match self.geocoder.geocode(&place).await {
            Ok(point) => Some(point),
            Err(error) => {
                log::debug!("Could not geocode {:?}: {}", place, error);
                None
            }
        }
    }
}

fn publish_breakdown<'a>(
    gauge: &SiteGauge,
    site: &SiteId,
    site_name: &str,
    period: Period,
    rows: impl Iterator<Item = (Option<&'a str>, Option<u64>)>,
) {
    let tag = period.as_str();
    let series = rows.filter_map(|(label, count)| {
        Some((labels(&[site_name, label?, tag]), count? as f64))
    });
    gauge.replace(site, tag, series);
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
