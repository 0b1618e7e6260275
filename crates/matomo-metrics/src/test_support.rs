use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use matomo_api::{
    AnalyticsApi, ApiError, BreakdownRow, DateAnchor, PageNode, Period, RegionRow, Result,
    SiteId, SiteInfo, VisitsSummary,
};
use parking_lot::Mutex;

use crate::geo::{GeoPoint, GeocodeError, Geocoder};

/// In-memory reporting API. Breakdowns are the same for every period.
#[derive(Default)]
pub struct FakeApi {
    sites: Mutex<Vec<SiteInfo>>,
    summaries: Mutex<HashMap<(SiteId, Period, DateAnchor), VisitsSummary>>,
    pages: Mutex<HashMap<SiteId, Vec<PageNode>>>,
    os: HashMap<SiteId, Vec<BreakdownRow>>,
    countries: HashMap<SiteId, Vec<BreakdownRow>>,
    regions: HashMap<SiteId, Vec<RegionRow>>,
    failing_sites: Mutex<HashSet<SiteId>>,
    failing_pages: Mutex<HashSet<SiteId>>,
    fail_listing: AtomicBool,
    fail_names: AtomicBool,
    pub list_calls: AtomicUsize,
}

impl FakeApi {
    pub fn with_site(self, id: u64, name: &str) -> Self {
        self.sites.lock().push(SiteInfo {
            idsite: SiteId::from(id),
            name: name.to_string(),
        });
        self
    }

    pub fn with_summary(
        self,
        id: u64,
        period: Period,
        date: DateAnchor,
        summary: VisitsSummary,
    ) -> Self {
        self.set_summary(id, period, date, summary);
        self
    }

    pub fn with_pages(self, id: u64, pages: Vec<PageNode>) -> Self {
        self.set_pages(id, pages);
        self
    }

    pub fn with_os(mut self, id: u64, rows: Vec<BreakdownRow>) -> Self {
        self.os.insert(SiteId::from(id), rows);
        self
    }

    pub fn with_countries(mut self, id: u64, rows: Vec<BreakdownRow>) -> Self {
        self.countries.insert(SiteId::from(id), rows);
        self
    }

    pub fn with_regions(mut self, id: u64, rows: Vec<RegionRow>) -> Self {
        self.regions.insert(SiteId::from(id), rows);
        self
    }

    pub fn set_summary(&self, id: u64, period: Period, date: DateAnchor, summary: VisitsSummary) {
        self.summaries
            .lock()
            .insert((SiteId::from(id), period, date), summary);
    }

    pub fn set_pages(&self, id: u64, pages: Vec<PageNode>) {
        self.pages.lock().insert(SiteId::from(id), pages);
    }

    pub fn remove_site(&self, id: u64) {
        let id = SiteId::from(id);
        self.sites.lock().retain(|site| site.idsite != id);
    }

    pub fn rename_site(&self, id: u64, name: &str) {
        let id = SiteId::from(id);
        for site in self.sites.lock().iter_mut().filter(|site| site.idsite == id) {
            site.name = name.to_string();
        }
    }

    /// Every data call for the site fails; the name lookup still works.
    pub fn fail_site(&self, id: u64) {
        self.failing_sites.lock().insert(SiteId::from(id));
    }

    pub fn heal_site(&self, id: u64) {
        self.failing_sites.lock().remove(&SiteId::from(id));
    }

    pub fn fail_pages_for(&self, id: u64) {
        self.failing_pages.lock().insert(SiteId::from(id));
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn fail_site_names(&self) {
        self.fail_names.store(true, Ordering::SeqCst);
    }

    fn check(&self, site: &SiteId) -> Result<()> {
        if self.failing_sites.lock().contains(site) {
            return Err(ApiError::Api(format!("site {} unavailable", site)));
        }
        Ok(())
    }
}

#[async_trait]
impl AnalyticsApi for FakeApi {
    async fn list_sites(&self) -> Result<Vec<SiteInfo>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ApiError::Api("listing unavailable".to_string()));
        }
        Ok(self.sites.lock().clone())
    }

    async fn site_name(&self, site: &SiteId) -> Result<String> {
        if self.fail_names.load(Ordering::SeqCst) {
            return Err(ApiError::Api("no access".to_string()));
        }
        self.sites
            .lock()
            .iter()
            .find(|info| &info.idsite == site)
            .map(|info| info.name.clone())
            .ok_or_else(|| ApiError::Api(format!("unknown site {}", site)))
    }

    async fn summary(
        &self,
        site: &SiteId,
        period: Period,
        date: DateAnchor,
    ) -> Result<VisitsSummary> {
        self.check(site)?;
        Ok(self
            .summaries
            .lock()
            .get(&(site.clone(), period, date))
            .cloned()
            .unwrap_or_default())
    }

    async fn page_tree(&self, site: &SiteId, _period: Period) -> Result<Vec<PageNode>> {
        self.check(site)?;
        if self.failing_pages.lock().contains(site) {
            return Err(ApiError::Api("page report unavailable".to_string()));
        }
        Ok(self.pages.lock().get(site).cloned().unwrap_or_default())
    }

    async fn os_breakdown(&self, site: &SiteId, _period: Period) -> Result<Vec<BreakdownRow>> {
        self.check(site)?;
        Ok(self.os.get(site).cloned().unwrap_or_default())
    }

    async fn country_breakdown(
        &self,
        site: &SiteId,
        _period: Period,
    ) -> Result<Vec<BreakdownRow>> {
        self.check(site)?;
        Ok(self.countries.get(site).cloned().unwrap_or_default())
    }

    async fn region_breakdown(&self, site: &SiteId, _period: Period) -> Result<Vec<RegionRow>> {
        self.check(site)?;
        Ok(self.regions.get(site).cloned().unwrap_or_default())
    }
}

/// Resolves only the places it was given; everything else is `NotFound`.
#[derive(Default)]
pub struct FakeGeocoder {
    places: HashMap<String, GeoPoint>,
}

impl FakeGeocoder {
    pub fn with_place(mut self, place: &str, point: GeoPoint) -> Self {
        self.places.insert(place.to_string(), point);
        self
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, place: &str) -> std::result::Result<GeoPoint, GeocodeError> {
        self.places
            .get(place)
            .copied()
            .ok_or_else(|| GeocodeError::NotFound(place.to_string()))
    }
}
