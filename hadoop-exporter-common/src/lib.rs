//! Shared machinery for Hadoop Prometheus exporters.
//!
//! Each exporter binary scrapes one JSON management endpoint of a Hadoop
//! daemon on every inbound Prometheus scrape, copies a curated set of fields
//! into gauges and serves them over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ Hadoop daemon   │<────│    Collector    │<────│   HTTP Server   │
//! │ (/jmx, /ws/...) │────>│ (fetch + map)   │────>│   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! An exporter is described by a static [`ExporterProfile`]: its namespace,
//! defaults, document layout and metric table. Running it is a single call:
//!
//! ```ignore
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     hadoop_exporter_common::run_exporter(&MY_PROFILE).await
//! }
//! ```

pub mod args;
pub mod client;
pub mod collector;
pub mod config;
pub mod document;
pub mod error;
pub mod http;
pub mod mapping;
pub mod profile;
pub mod registry;
pub mod runner;

pub use args::ExporterArgs;
pub use client::UpstreamClient;
pub use collector::{CollectorStats, MapSummary, ScrapeCollector, SharedCollector};
pub use config::{ExporterConfig, LogFormat, LoggingConfig};
pub use document::{DocumentLayout, Record, UpstreamDocument};
pub use error::{Error, Result};
pub use http::HttpServer;
pub use mapping::{Extraction, MetricSpec};
pub use profile::ExporterProfile;
pub use registry::{GaugeSet, MetricDescriptor};
pub use runner::{run_exporter, serve};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level. HTTP client
/// internals are capped at `warn` unless `RUST_LOG` says otherwise.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| Error::config(format!("Invalid log level '{}': {}", config.level, e)))?
            .add_directive(
                "hyper_util=warn"
                    .parse()
                    .map_err(|e| Error::config(format!("Invalid log directive: {}", e)))?,
            ),
    };

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
