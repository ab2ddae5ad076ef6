//! Prometheus metrics exporter for SIPIS.
//!
//! The exporter polls the `/stats/summary/json` endpoint of each configured
//! SIPIS instance on a fixed schedule and exposes the values as gauges,
//! labelled by instance, on an HTTP `/metrics` endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ SIPIS instances │<────│    Scheduler    │     │   HTTP Server   │
//! │ (stats summary) │────>│   + Collector   │────>│   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//!                          writes GaugeSet         reads GaugeSet
//! ```
//!
//! # Usage
//!
//! ```bash
//! sipis-exporter --instance http://sipis01:8081 --instance http://sipis02:8081 --every 5m
//! SIPIS_INSTANCES=http://sipis01:8081,http://sipis02:8081 sipis-exporter
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod fetcher;
pub mod http;
pub mod mapping;
pub mod measurement;
pub mod registry;
pub mod scheduler;

pub use collector::{SampleCollector, SharedCollector};
pub use config::{ConfigError, ConfigOverrides, ExporterConfig};
pub use fetcher::{FetchError, StatsFetcher};
pub use http::HttpServer;
pub use measurement::Measurement;
pub use registry::{GaugeSet, SharedGauges};
pub use scheduler::Scheduler;

use config::{LogFormat, LoggingConfig};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| {
                    ConfigError::Validation(format!("Failed to initialize tracing: {}", e))
                })?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| {
                    ConfigError::Validation(format!("Failed to initialize tracing: {}", e))
                })?;
        }
    }

    Ok(())
}
