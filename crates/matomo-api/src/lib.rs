pub mod api;
pub mod client;
pub mod error;
pub mod query;
pub mod types;

pub use api::AnalyticsApi;
pub use client::MatomoClient;
pub use error::{ApiError, Result};
pub use query::{ApiQuery, DateAnchor, Period};
pub use types::{BreakdownRow, PageNode, RegionRow, SiteId, SiteInfo, VisitsSummary};
