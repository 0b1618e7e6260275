use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::api::AnalyticsApi;
use crate::error::{ApiError, Result};
use crate::query::{method, ApiQuery, DateAnchor, Period};
use crate::types::{BreakdownRow, PageNode, RegionRow, SiteId, SiteInfo, VisitsSummary};

const USER_AGENT: &str = concat!("matomo-exporter/", env!("CARGO_PKG_VERSION"));

/// Token-authenticated client for the Matomo reporting API.
pub struct MatomoClient {
    client: Client,
    endpoint: Url,
    token: String,
}

impl MatomoClient {
    /// `base_url` is the Matomo installation root (`https://stats.example.org/`)
    /// or the full `index.php` URL.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(None)?,
            endpoint: api_endpoint(base_url)?,
            token: token.into(),
        })
    }

    /// Apply a whole-request timeout to every call.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(Some(timeout))?;
        Ok(self)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call(&self, query: &ApiQuery) -> Result<Value> {
        log::debug!("Calling {} with {:?}", query.method(), query.params());

        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&query.params())
            .form(&[("token_auth", self.token.as_str())])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let value: Value = serde_json::from_str(&text)?;
        check_error_payload(&value)?;
        Ok(value)
    }

    async fn call_as<T: DeserializeOwned>(&self, query: &ApiQuery) -> Result<T> {
        let value = self.call(query).await?;
        Ok(serde_json::from_value(value)?)
    }
}

impl fmt::Debug for MatomoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatomoClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &"***")
            .finish()
    }
}

#[async_trait]
impl AnalyticsApi for MatomoClient {
    async fn list_sites(&self) -> Result<Vec<SiteInfo>> {
        self.call_as(&ApiQuery::new(method::GET_ALL_SITES)).await
    }

    async fn site_name(&self, site: &SiteId) -> Result<String> {
        let value = self
            .call(&ApiQuery::new(method::GET_SITE_FROM_ID).site(site))
            .await?;

        // Older releases wrap the site in a one-element array.
        let info = match value {
            Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            other => other,
        };

        match info.get("name") {
            Some(Value::String(name)) => Ok(name.clone()),
            _ => Err(ApiError::Api(format!("site {} has no name", site))),
        }
    }

    async fn summary(
        &self,
        site: &SiteId,
        period: Period,
        date: DateAnchor,
    ) -> Result<VisitsSummary> {
        let query = ApiQuery::new(method::VISITS_SUMMARY)
            .site(site)
            .period(period)
            .date(date);
        let value = self.call(&query).await?;
        Ok(VisitsSummary::from_value(value)?)
    }

    async fn page_tree(&self, site: &SiteId, period: Period) -> Result<Vec<PageNode>> {
        let query = ApiQuery::new(method::PAGE_URLS)
            .site(site)
            .period(period)
            .date(DateAnchor::Today)
            .expanded(true);
        self.call_as(&query).await
    }

    async fn os_breakdown(&self, site: &SiteId, period: Period) -> Result<Vec<BreakdownRow>> {
        self.call_as(&breakdown(method::OS_VERSIONS, site, period))
            .await
    }

    async fn country_breakdown(
        &self,
        site: &SiteId,
        period: Period,
    ) -> Result<Vec<BreakdownRow>> {
        self.call_as(&breakdown(method::COUNTRY, site, period)).await
    }

    async fn region_breakdown(&self, site: &SiteId, period: Period) -> Result<Vec<RegionRow>> {
        self.call_as(&breakdown(method::REGION, site, period)).await
    }
}

fn breakdown(method: &'static str, site: &SiteId, period: Period) -> ApiQuery {
    ApiQuery::new(method)
        .site(site)
        .period(period)
        .date(DateAnchor::Today)
}

fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

fn api_endpoint(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url.trim())?;
    if url.path().ends_with(".php") {
        return Ok(url);
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url.join("index.php")?)
}

fn check_error_payload(value: &Value) -> Result<()> {
    if value.get("result").and_then(Value::as_str) == Some("error") {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(ApiError::Api(message.to_string()));
    }
    Ok(())
}
