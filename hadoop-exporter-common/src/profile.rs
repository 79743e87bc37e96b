//! Static description of one exporter variant.

use crate::document::DocumentLayout;
use crate::mapping::MetricSpec;

/// Everything that distinguishes one exporter binary from another.
#[derive(Debug, Clone, Copy)]
pub struct ExporterProfile {
    /// Metric namespace, prepended as `<namespace>_` to every metric.
    pub namespace: &'static str,
    /// Landing page title.
    pub title: &'static str,
    /// Listen address used when neither config nor CLI set one.
    pub default_listen: &'static str,
    /// Upstream base URL used when neither config nor CLI set one.
    pub default_upstream: &'static str,
    /// Path joined onto the upstream base URL (empty to use the URL as-is).
    pub endpoint: &'static str,
    /// Additional long flag accepted for the upstream URL.
    pub upstream_flag: &'static str,
    /// Shape of the upstream document.
    pub layout: DocumentLayout,
    /// Exported gauges.
    pub metrics: &'static [MetricSpec],
}

impl ExporterProfile {
    /// Build the URL actually fetched on every scrape.
    pub fn upstream_url(&self, base: &str) -> String {
        if self.endpoint.is_empty() {
            return base.to_string();
        }
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}
