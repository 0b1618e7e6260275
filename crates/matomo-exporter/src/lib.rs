pub mod config;
pub mod handlers;
pub mod logging;
pub mod server;
pub mod state;

pub use config::{Cli, ConfigError, ExporterConfig};
pub use server::{routes, run_server};
pub use state::AppState;
