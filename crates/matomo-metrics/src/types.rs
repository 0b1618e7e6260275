use chrono::{DateTime, Utc};
use matomo_api::{DateAnchor, Period, SiteId};
use serde::Serialize;

/// A summary query window and the `period` label it is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryWindow {
    pub period: Period,
    pub date: DateAnchor,
    pub tag: &'static str,
}

impl SummaryWindow {
    pub const fn new(period: Period, date: DateAnchor, tag: &'static str) -> Self {
        Self { period, date, tag }
    }

    /// Current day, previous day, current week, current month, current year.
    pub fn canonical() -> Vec<SummaryWindow> {
        vec![
            Self::new(Period::Day, DateAnchor::Today, "day"),
            Self::new(Period::Day, DateAnchor::Yesterday, "yesterday"),
            Self::new(Period::Week, DateAnchor::Today, "week"),
            Self::new(Period::Month, DateAnchor::Today, "month"),
            Self::new(Period::Year, DateAnchor::Today, "year"),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    /// Initial state: the first cycle starts immediately.
    #[default]
    Collecting,
}

/// Outcome of one pass over all sites.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CycleReport {
    /// `None` when the site list could not be fetched.
    pub sites_total: Option<usize>,
    pub succeeded: usize,
    pub failed: Vec<SiteId>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CycleStatus {
    pub state: SchedulerState,
    pub cycles_completed: u64,
    pub last_cycle_started_at: Option<DateTime<Utc>>,
    pub last_cycle_finished_at: Option<DateTime<Utc>>,
    pub last_cycle: Option<CycleReport>,
}
