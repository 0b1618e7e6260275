use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

const USER_AGENT: &str = concat!("matomo-exporter/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no match for {0:?}")]
    NotFound(String),

    #[error("ambiguous match for {0:?}")]
    Ambiguous(String),

    #[error("invalid coordinate {0:?}")]
    InvalidCoordinate(String),

    #[error("geocoding disabled")]
    Disabled,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, place: &str) -> Result<GeoPoint, GeocodeError>;
}

/// Query text for a region: `"<region>, <country>"`, or whichever part is
/// known.
pub fn place_text(region: Option<&str>, country: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [region, country]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Geocoder backed by a Nominatim compatible `/search` endpoint.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    importance: Option<f64>,
}

impl NominatimPlace {
    fn point(&self) -> Result<GeoPoint, GeocodeError> {
        let latitude = self
            .lat
            .parse::<f64>()
            .map_err(|_| GeocodeError::InvalidCoordinate(self.lat.clone()))?;
        let longitude = self
            .lon
            .parse::<f64>()
            .map_err(|_| GeocodeError::InvalidCoordinate(self.lon.clone()))?;
        Ok(GeoPoint {
            latitude,
            longitude,
        })
    }
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GeocodeError> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, place: &str) -> Result<GeoPoint, GeocodeError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", place), ("format", "json"), ("limit", "2")])
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;
        let places: Vec<NominatimPlace> = serde_json::from_str(&text)?;

        let first = places
            .first()
            .ok_or_else(|| GeocodeError::NotFound(place.to_string()))?;
        let point = first.point()?;

        // Results come ranked by importance; a tie between two different
        // locations means the name alone does not identify the place.
        if let Some(second) = places.get(1) {
            let tie = first.importance.is_some() && first.importance == second.importance;
            if tie && second.point()? != point {
                return Err(GeocodeError::Ambiguous(place.to_string()));
            }
        }

        Ok(point)
    }
}

/// Remembers successful lookups for the lifetime of the process. Failures
/// are not cached and are retried on the next request.
pub struct CachingGeocoder<G> {
    inner: G,
    cache: DashMap<String, GeoPoint>,
}

impl<G: Geocoder> CachingGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachingGeocoder<G> {
    async fn geocode(&self, place: &str) -> Result<GeoPoint, GeocodeError> {
        if let Some(point) = self.cache.get(place) {
            return Ok(*point);
        }
        let point = self.inner.geocode(place).await?;
        self.cache.insert(place.to_string(), point);
        Ok(point)
    }
}

/// Used when geocoding is turned off: every lookup is unresolved.
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(&self, _place: &str) -> Result<GeoPoint, GeocodeError> {
        Err(GeocodeError::Disabled)
    }
}
