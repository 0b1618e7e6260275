use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, error, info};
use matomo_api::AnalyticsApi;
use parking_lot::RwLock;

use crate::collector::SiteCollector;
use crate::registry::ExporterRegistry;
use crate::types::{CycleReport, CycleStatus, SchedulerState};

pub type StatusHandle = Arc<RwLock<CycleStatus>>;

/// Drives collection cycles forever: one pass over all sites, then a pause of
/// `interval`. Cycles never overlap.
pub struct Scheduler {
    api: Arc<dyn AnalyticsApi>,
    collector: SiteCollector,
    registry: Arc<ExporterRegistry>,
    interval: Duration,
    status: StatusHandle,
}

impl Scheduler {
    pub fn new(
        api: Arc<dyn AnalyticsApi>,
        collector: SiteCollector,
        registry: Arc<ExporterRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            collector,
            registry,
            interval,
            status: Arc::new(RwLock::new(CycleStatus::default())),
        }
    }

    pub fn status_handle(&self) -> StatusHandle {
        Arc::clone(&self.status)
    }

    pub async fn run(self) {
        info!(
            "Scheduler started, collecting every {}s",
            self.interval.as_secs_f64()
        );
        loop {
            self.run_cycle().await;
            self.status.write().state = SchedulerState::Idle;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One pass over every site. A failing site is logged and counted; the
    /// remaining sites are still collected.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        {
            let mut status = self.status.write();
            status.state = SchedulerState::Collecting;
            status.last_cycle_started_at = Some(Utc::now());
        }

        let report = self.collect_all().await;

        let elapsed = started.elapsed().as_secs_f64();
        self.registry.last_cycle_duration.set(elapsed);
        info!(
            "Collection cycle finished in {:.2}s: {} ok, {} failed",
            elapsed,
            report.succeeded,
            report.failed.len()
        );

        let mut status = self.status.write();
        status.cycles_completed += 1;
        status.last_cycle_finished_at = Some(Utc::now());
        status.last_cycle = Some(report.clone());
        report
    }

    async fn collect_all(&self) -> CycleReport {
        let sites = match self.api.list_sites().await {
            Ok(sites) => sites,
            Err(e) => {
                error!("Error getting site list: {}", e);
                self.registry.sites.set(-1);
                return CycleReport::default();
            }
        };

        self.registry.sites.set(sites.len() as i64);

        let mut report = CycleReport {
            sites_total: Some(sites.len()),
            ..CycleReport::default()
        };
        let mut current = HashMap::with_capacity(sites.len());

        for site in &sites {
            let name = self.collector.site_name(&site.idsite).await;
            current.insert(site.idsite.clone(), name.clone());

            match self.collector.collect_site(&site.idsite, &name).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    error!("Error getting data for site {}, {}", site.idsite, e);
                    self.registry.record_failure(site.idsite.as_str());
                    report.failed.push(site.idsite.clone());
                }
            }
        }

        let pruned = self.registry.retain_sites(&current);
        if pruned > 0 {
            debug!("Removed {} series of removed or renamed sites", pruned);
        }

        report
    }
}
