//! Process-wide metric registry.
//!
//! Created once at startup and shared by reference with the collector, the
//! scheduler and the scrape endpoint. It is never recreated while the process
//! runs.

use std::collections::{BTreeSet, HashMap};

use matomo_api::SiteId;
use parking_lot::Mutex;
use prometheus::{Encoder, Gauge, GaugeVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

pub const SITE_LABEL: &str = "site_name";
pub const PERIOD_LABEL: &str = "period";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("metrics output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

type LabelSet = Vec<String>;

/// A gauge family whose first label is the site name and which carries a
/// `period` label.
///
/// Every label set written is remembered under the site id that wrote it, so
/// a site only ever replaces or prunes its own series. Sites sharing a display
/// name may write the same label set; the series stays while any of them still
/// owns it.
pub struct SiteGauge {
    vec: GaugeVec,
    period_index: usize,
    owners: Mutex<HashMap<SiteId, BTreeSet<LabelSet>>>,
}

impl SiteGauge {
    fn new(name: &str, help: &str, labels: &[&str]) -> RegistryResult<Self> {
        debug_assert_eq!(labels.first(), Some(&SITE_LABEL));
        let period_index = labels
            .iter()
            .position(|label| *label == PERIOD_LABEL)
            .ok_or_else(|| {
                prometheus::Error::Msg(format!("{} has no {} label", name, PERIOD_LABEL))
            })?;

        Ok(Self {
            vec: GaugeVec::new(Opts::new(name, help), labels)?,
            period_index,
            owners: Mutex::new(HashMap::new()),
        })
    }

    /// Overwrite a single series written by `site`.
    pub fn set(&self, site: &SiteId, labels: &[&str], value: f64) {
        let mut owners = self.owners.lock();
        if self.write(labels, value) {
            owners
                .entry(site.clone())
                .or_default()
                .insert(to_label_set(labels));
        }
    }

    /// Publish the complete result of one (site, period) query: series that
    /// `site` wrote earlier for `period` and that are missing from `rows` are
    /// removed after the new values are written.
    pub fn replace<I>(&self, site: &SiteId, period: &str, rows: I)
    where
        I: IntoIterator<Item = (LabelSet, f64)>,
    {
        let mut owners = self.owners.lock();
        let mut fresh = BTreeSet::new();

        for (labels, value) in rows {
            let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
            if self.write(&refs, value) {
                fresh.insert(labels);
            }
        }

        let owned = owners.entry(site.clone()).or_default();
        let stale: Vec<LabelSet> = owned
            .iter()
            .filter(|labels| labels[self.period_index] == period && !fresh.contains(*labels))
            .cloned()
            .collect();
        for labels in &stale {
            owned.remove(labels);
        }
        owned.extend(fresh);

        for labels in stale {
            self.release(&owners, &labels);
        }
    }

    /// Keep only series written by a listed site under its current name.
    /// Returns how many series were removed.
    pub fn retain_sites(&self, current: &HashMap<SiteId, String>) -> usize {
        let mut owners = self.owners.lock();
        let mut dropped = Vec::new();

        owners.retain(|site, owned| match current.get(site) {
            Some(name) => {
                owned.retain(|labels| {
                    let keep = &labels[0] == name;
                    if !keep {
                        dropped.push(labels.clone());
                    }
                    keep
                });
                !owned.is_empty()
            }
            None => {
                dropped.extend(std::mem::take(owned));
                false
            }
        });

        dropped
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|labels| self.release(&owners, labels))
            .count()
    }

    /// Current value of a series, if some site has written it.
    pub fn get(&self, labels: &[&str]) -> Option<f64> {
        let owners = self.owners.lock();
        let key = to_label_set(labels);
        if !owners.values().any(|owned| owned.contains(&key)) {
            return None;
        }
        self.vec
            .get_metric_with_label_values(labels)
            .ok()
            .map(|gauge| gauge.get())
    }

    pub fn series_count(&self) -> usize {
        self.owners
            .lock()
            .values()
            .flatten()
            .collect::<BTreeSet<_>>()
            .len()
    }

    fn write(&self, labels: &[&str], value: f64) -> bool {
        match self.vec.get_metric_with_label_values(labels) {
            Ok(gauge) => {
                gauge.set(value);
                true
            }
            Err(error) => {
                log::warn!("Dropping sample {:?}: {}", labels, error);
                false
            }
        }
    }

    /// Remove the series unless another site still owns it. Returns whether
    /// it was removed.
    fn release(&self, owners: &HashMap<SiteId, BTreeSet<LabelSet>>, labels: &LabelSet) -> bool {
        if owners.values().any(|owned| owned.contains(labels)) {
            return false;
        }
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        if let Err(error) = self.vec.remove_label_values(&refs) {
            log::debug!("Series {:?} already gone: {}", labels, error);
        }
        true
    }
}

fn to_label_set(labels: &[&str]) -> LabelSet {
    labels.iter().map(|label| label.to_string()).collect()
}

pub struct ExporterRegistry {
    registry: Registry,
    pub sites: IntGauge,
    pub visits: SiteGauge,
    pub unique_visitors: SiteGauge,
    pub bounce_count: SiteGauge,
    pub actions: SiteGauge,
    pub page_visits: SiteGauge,
    pub os_visitors: SiteGauge,
    pub country_visitors: SiteGauge,
    pub region_visitors: SiteGauge,
    pub collection_failures: IntCounterVec,
    pub last_cycle_duration: Gauge,
}

impl ExporterRegistry {
    pub fn new() -> RegistryResult<Self> {
        let registry = Registry::new();

        let sites = IntGauge::new("number_of_sites", "Number of sites")?;
        let visits = SiteGauge::new(
            "number_of_visits",
            "Number of visits",
            &[SITE_LABEL, PERIOD_LABEL],
        )?;
        let unique_visitors = SiteGauge::new(
            "number_uniq_visitors",
            "Number of unique visitors",
            &[SITE_LABEL, PERIOD_LABEL],
        )?;
        let bounce_count = SiteGauge::new(
            "number_bouncing_rate",
            "Number of bounced visits",
            &[SITE_LABEL, PERIOD_LABEL],
        )?;
        let actions = SiteGauge::new(
            "number_of_actions",
            "Number of actions",
            &[SITE_LABEL, PERIOD_LABEL],
        )?;
        let page_visits = SiteGauge::new(
            "number_of_visits_per_page",
            "Number of visits per page",
            &[SITE_LABEL, "page", PERIOD_LABEL],
        )?;
        let os_visitors = SiteGauge::new(
            "number_of_visitors_per_os_version",
            "Number of visitors per OS version",
            &[SITE_LABEL, "os_version", PERIOD_LABEL],
        )?;
        let country_visitors = SiteGauge::new(
            "number_of_visitors_per_country",
            "Number of visitors per country",
            &[SITE_LABEL, "country", PERIOD_LABEL],
        )?;
        let region_visitors = SiteGauge::new(
            "number_of_visitors_per_region",
            "Number of visitors per region",
            &[
                SITE_LABEL,
                "region",
                PERIOD_LABEL,
                "country_code",
                "latitude",
                "longitude",
                "geo_resolved",
            ],
        )?;
        let collection_failures = IntCounterVec::new(
            Opts::new(
                "matomo_exporter_site_collection_failures_total",
                "Site collections aborted by an API error",
            ),
            &["site_id"],
        )?;
        let last_cycle_duration = Gauge::new(
            "matomo_exporter_last_cycle_duration_seconds",
            "Wall-clock duration of the last collection cycle",
        )?;

        registry.register(Box::new(sites.clone()))?;
        for family in [
            &visits,
            &unique_visitors,
            &bounce_count,
            &actions,
            &page_visits,
            &os_visitors,
            &country_visitors,
            &region_visitors,
        ] {
            registry.register(Box::new(family.vec.clone()))?;
        }
        registry.register(Box::new(collection_failures.clone()))?;
        registry.register(Box::new(last_cycle_duration.clone()))?;

        Ok(Self {
            registry,
            sites,
            visits,
            unique_visitors,
            bounce_count,
            actions,
            page_visits,
            os_visitors,
            country_visitors,
            region_visitors,
            collection_failures,
            last_cycle_duration,
        })
    }

    pub fn site_families(&self) -> [&SiteGauge; 8] {
        [
            &self.visits,
            &self.unique_visitors,
            &self.bounce_count,
            &self.actions,
            &self.page_visits,
            &self.os_visitors,
            &self.country_visitors,
            &self.region_visitors,
        ]
    }

    /// Drop site-labelled series of sites not in `current`, and series a
    /// listed site wrote under a name it no longer has.
    pub fn retain_sites(&self, current: &HashMap<SiteId, String>) -> usize {
        self.site_families()
            .iter()
            .map(|family| family.retain_sites(current))
            .sum()
    }

    pub fn record_failure(&self, site_id: &str) {
        match self.collection_failures.get_metric_with_label_values(&[site_id]) {
            Ok(counter) => counter.inc(),
            Err(error) => log::warn!("Cannot count failure for site {}: {}", site_id, error),
        }
    }

    /// Render the current snapshot in the Prometheus text format.
    pub fn encode(&self) -> RegistryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
