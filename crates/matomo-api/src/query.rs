use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::SiteId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Day, Period::Week, Period::Month, Period::Year];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference date a report period is anchored at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DateAnchor {
    Today,
    Yesterday,
}

impl DateAnchor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
        }
    }
}

/// Reporting API methods used by the exporter.
pub mod method {
    pub const GET_ALL_SITES: &str = "SitesManager.getAllSites";
    pub const GET_SITE_FROM_ID: &str = "SitesManager.getSiteFromId";
    pub const VISITS_SUMMARY: &str = "VisitsSummary.get";
    pub const PAGE_URLS: &str = "Actions.getPageUrls";
    pub const OS_VERSIONS: &str = "DevicesDetection.getOsVersions";
    pub const COUNTRY: &str = "UserCountry.getCountry";
    pub const REGION: &str = "UserCountry.getRegion";
}

/// Builder for the query string of a single reporting API call.
///
/// The token is never part of the query; the client sends it in the request
/// body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
    method: &'static str,
    params: Vec<(&'static str, String)>,
}

impl ApiQuery {
    pub fn new(method: &'static str) -> Self {
        Self {
            method,
            params: Vec::new(),
        }
    }

    pub fn site(mut self, site: &SiteId) -> Self {
        self.params.push(("idSite", site.as_str().to_string()));
        self
    }

    pub fn period(mut self, period: Period) -> Self {
        self.params.push(("period", period.as_str().to_string()));
        self
    }

    pub fn date(mut self, date: DateAnchor) -> Self {
        self.params.push(("date", date.as_str().to_string()));
        self
    }

    /// Ask for nested subtables inline instead of subtable ids.
    pub fn expanded(mut self, expanded: bool) -> Self {
        self.params
            .push(("expanded", if expanded { "1" } else { "0" }.to_string()));
        self
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn params(&self) -> Vec<(&str, &str)> {
        let mut params = vec![
            ("module", "API"),
            ("method", self.method),
            ("format", "JSON"),
        ];
        params.extend(self.params.iter().map(|(k, v)| (*k, v.as_str())));
        params
    }
}
