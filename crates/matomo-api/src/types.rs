use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Opaque site identifier. Matomo returns it as a string or a number
/// depending on the version, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for SiteId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for SiteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for SiteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "expected site id as string or number, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteInfo {
    pub idsite: SiteId,
    #[serde(default)]
    pub name: String,
}

/// `VisitsSummary.get` for one site and one period.
///
/// Every field is optional: a missing, null or non-numeric value decodes to
/// `None` instead of failing the whole response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VisitsSummary {
    #[serde(default, deserialize_with = "lenient_count")]
    pub nb_visits: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub nb_uniq_visitors: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub bounce_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub nb_actions: Option<u64>,
}

impl VisitsSummary {
    /// Decode a summary response. Matomo answers `[]` instead of an object
    /// when a period has no data yet.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        match value {
            Value::Array(mut rows) => match rows.len() {
                0 => Ok(Self::default()),
                _ => serde_json::from_value(rows.swap_remove(0)),
            },
            other => serde_json::from_value(other),
        }
    }
}

/// One row of `Actions.getPageUrls` with `expanded=1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageNode {
    #[serde(default, deserialize_with = "lenient_label")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub nb_visits: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subtable: Vec<PageNode>,
}

impl PageNode {
    pub fn leaf(label: impl Into<String>, nb_visits: u64) -> Self {
        Self {
            label: Some(label.into()),
            nb_visits: Some(nb_visits),
            subtable: Vec::new(),
        }
    }

    pub fn branch(label: impl Into<String>, nb_visits: u64, subtable: Vec<PageNode>) -> Self {
        Self {
            label: Some(label.into()),
            nb_visits: Some(nb_visits),
            subtable,
        }
    }
}

/// Flat `{label, nb_visits}` record (OS versions, countries).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BreakdownRow {
    #[serde(default, deserialize_with = "lenient_label")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub nb_visits: Option<u64>,
}

/// One row of `UserCountry.getRegion`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegionRow {
    #[serde(default, deserialize_with = "lenient_label")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub region_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub country_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub nb_visits: Option<u64>,
}

impl RegionRow {
    /// Human readable region: the resolved name, then the region code, then
    /// the raw label.
    pub fn region_display(&self) -> Option<&str> {
        self.region_name
            .as_deref()
            .or(self.region.as_deref())
            .or(self.label.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Interpret a JSON value as a non-negative integral count.
pub fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_count))
}

fn lenient_label<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
