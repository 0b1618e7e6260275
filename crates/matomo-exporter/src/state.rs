use std::sync::Arc;

use matomo_metrics::{ExporterRegistry, StatusHandle};

pub struct AppState {
    pub registry: Arc<ExporterRegistry>,
    pub status: StatusHandle,
}

impl AppState {
    pub fn new(registry: Arc<ExporterRegistry>, status: StatusHandle) -> Self {
        Self { registry, status }
    }
}
