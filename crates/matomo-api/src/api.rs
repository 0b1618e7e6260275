use async_trait::async_trait;

use crate::error::Result;
use crate::query::{DateAnchor, Period};
use crate::types::{BreakdownRow, PageNode, RegionRow, SiteId, SiteInfo, VisitsSummary};

/// Read-only view of the reporting API consumed by the collector.
///
/// Breakdown reports are always anchored at today.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    async fn list_sites(&self) -> Result<Vec<SiteInfo>>;

    async fn site_name(&self, site: &SiteId) -> Result<String>;

    async fn summary(
        &self,
        site: &SiteId,
        period: Period,
        date: DateAnchor,
    ) -> Result<VisitsSummary>;

    /// Page URL tree with subtables expanded inline.
    async fn page_tree(&self, site: &SiteId, period: Period) -> Result<Vec<PageNode>>;

    async fn os_breakdown(&self, site: &SiteId, period: Period) -> Result<Vec<BreakdownRow>>;

    async fn country_breakdown(&self, site: &SiteId, period: Period)
        -> Result<Vec<BreakdownRow>>;

    async fn region_breakdown(&self, site: &SiteId, period: Period) -> Result<Vec<RegionRow>>;
}
