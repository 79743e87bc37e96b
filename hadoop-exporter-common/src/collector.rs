//! Scrape-and-map collector.
//!
//! Every inbound scrape fetches the upstream document, copies the curated
//! fields into their gauges and encodes the whole registry. A failed fetch or
//! decode leaves all gauges at their previous values and drops `up` to 0.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::client::UpstreamClient;
use crate::config::ExporterConfig;
use crate::document::{DocumentLayout, UpstreamDocument};
use crate::error::Result;
use crate::profile::ExporterProfile;
use crate::registry::{GaugeSet, MetricDescriptor};

/// What a single document contributed to the gauges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapSummary {
    /// Distinct allow-listed records found in the document.
    pub records_matched: usize,
    /// Gauges assigned a new value.
    pub gauges_updated: usize,
    /// Gauges whose record was present but whose field was absent or not numeric.
    pub fields_skipped: usize,
}

/// Collector statistics.
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// Scrapes attempted.
    pub scrapes: u64,
    /// Scrapes that failed to fetch or decode.
    pub failures: u64,
    /// Error message of the most recent failure.
    pub last_error: Option<String>,
    /// Summary of the most recent successful scrape.
    pub last_summary: MapSummary,
}

/// Fetches the upstream document on demand and maps it onto the gauges.
#[derive(Debug)]
pub struct ScrapeCollector {
    client: UpstreamClient,
    layout: DocumentLayout,
    gauges: GaugeSet,
    /// Serializes fetch-map-encode across concurrent scrapes.
    scrape_lock: Mutex<()>,
    stats: RwLock<CollectorStats>,
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<ScrapeCollector>;

impl ScrapeCollector {
    /// Declare and register the profile's gauges and build the upstream client.
    ///
    /// Errors here are configuration errors and should stop the process.
    pub fn new(profile: &ExporterProfile, config: &ExporterConfig) -> Result<Self> {
        let gauges = GaugeSet::new(profile.namespace, &config.labels, profile.metrics)?;
        let client = UpstreamClient::new(config.upstream_url(profile), &config.upstream)?;

        Ok(Self {
            client,
            layout: profile.layout,
            gauges,
            scrape_lock: Mutex::new(()),
            stats: RwLock::new(CollectorStats::default()),
        })
    }

    /// Static descriptors of every exported metric.
    pub fn describe(&self) -> &[MetricDescriptor] {
        self.gauges.describe()
    }

    /// The registered gauges.
    pub fn gauges(&self) -> &GaugeSet {
        &self.gauges
    }

    /// URL fetched on every scrape.
    pub fn upstream_url(&self) -> &str {
        self.client.url()
    }

    /// Get collector statistics.
    pub fn stats(&self) -> CollectorStats {
        self.stats.read().clone()
    }

    /// Scrape the upstream endpoint and encode every registered metric.
    ///
    /// Upstream failures never surface here; they are reflected by `up`.
    pub async fn collect(&self) -> Result<String> {
        let _guard = self.scrape_lock.lock().await;
        self.scrape_locked().await;
        self.gauges.encode()
    }

    /// Scrape the upstream endpoint without encoding. Returns whether the
    /// document was fetched and decoded.
    pub async fn scrape(&self) -> bool {
        let _guard = self.scrape_lock.lock().await;
        self.scrape_locked().await
    }

    async fn scrape_locked(&self) -> bool {
        let started = Instant::now();
        let outcome = self.fetch_document().await.map(|doc| self.apply(&doc));
        let elapsed = started.elapsed();

        let mut stats = self.stats.write();
        stats.scrapes += 1;

        match outcome {
            Ok(summary) => {
                self.gauges.observe_scrape(true, elapsed);
                stats.last_summary = summary;
                debug!(
                    url = %self.client.url(),
                    records = summary.records_matched,
                    updated = summary.gauges_updated,
                    skipped = summary.fields_skipped,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Scrape complete"
                );
                true
            }
            Err(e) => {
                self.gauges.observe_scrape(false, elapsed);
                stats.failures += 1;
                stats.last_error = Some(e.to_string());
                warn!(
                    url = %self.client.url(),
                    error = %e,
                    "Scrape failed, keeping previous values"
                );
                false
            }
        }
    }

    async fn fetch_document(&self) -> Result<UpstreamDocument> {
        let body = self.client.fetch().await?;
        UpstreamDocument::parse(self.layout, &body)
    }

    /// Copy the allow-listed fields of `document` into their gauges.
    ///
    /// Records not named by any spec are ignored. Gauges whose record or field
    /// is missing keep their previous value.
    pub fn apply(&self, document: &UpstreamDocument) -> MapSummary {
        let mut summary = MapSummary::default();
        let mut matched: HashSet<&str> = HashSet::new();

        for (spec, gauge) in self.gauges.entries() {
            let Some(record) = document.record(spec.source) else {
                continue;
            };
            matched.insert(spec.source);

            match spec.extract(record) {
                Some(value) => {
                    gauge.set(value);
                    summary.gauges_updated += 1;
                }
                None => {
                    summary.fields_skipped += 1;
                    trace!(
                        metric = spec.name,
                        field = spec.field,
                        "Field absent or not numeric"
                    );
                }
            }
        }

        summary.records_matched = matched.len();
        summary
    }
}
