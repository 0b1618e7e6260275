pub mod collector;
pub mod geo;
pub mod pages;
pub mod registry;
pub mod scheduler;
pub mod types;

#[cfg(test)]
mod test_support;

pub use collector::{CollectError, SiteCollector, UNKNOWN_SITE_NAME};
pub use geo::{
    CachingGeocoder, DisabledGeocoder, GeoPoint, GeocodeError, Geocoder, NominatimGeocoder,
    DEFAULT_GEOCODER_URL,
};
pub use pages::{flatten, PageVisits};
pub use registry::{ExporterRegistry, RegistryError, RegistryResult, SiteGauge};
pub use scheduler::{Scheduler, StatusHandle};
pub use types::{CycleReport, CycleStatus, SchedulerState, SummaryWindow};
