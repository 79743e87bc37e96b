//! Prometheus exporter for the YARN ResourceManager.
//!
//! Scrapes the cluster metrics REST API (`/ws/v1/cluster/metrics`) on every
//! Prometheus scrape and exports its fields as `resourcemanager_*` gauges.
//!
//! # Usage
//!
//! ```bash
//! resourcemanager-exporter --resourcemanager.url http://rm1:8088
//! ```

use hadoop_exporter_common::{DocumentLayout, ExporterProfile, MetricSpec};

/// Top-level member holding the cluster counters.
pub const CLUSTER_METRICS: &str = "clusterMetrics";

/// Cluster metrics API path, relative to the ResourceManager base URL.
pub const CLUSTER_METRICS_ENDPOINT: &str = "/ws/v1/cluster/metrics";

const fn cluster(field: &'static str) -> MetricSpec {
    MetricSpec::gauge(field, CLUSTER_METRICS, field)
}

/// Gauges exported by the ResourceManager exporter.
pub const RESOURCEMANAGER_METRICS: &[MetricSpec] = &[
    cluster("activeNodes"),
    cluster("rebootedNodes"),
    cluster("decommissionedNodes"),
    cluster("unhealthyNodes"),
    cluster("lostNodes"),
    cluster("totalNodes"),
    cluster("totalVirtualCores"),
    cluster("availableMB"),
    cluster("reservedMB"),
    cluster("appsKilled"),
    cluster("appsFailed"),
    cluster("appsRunning"),
    cluster("appsPending"),
    cluster("appsCompleted"),
    cluster("appsSubmitted"),
    cluster("allocatedMB"),
    cluster("reservedVirtualCores"),
    cluster("availableVirtualCores"),
    cluster("allocatedVirtualCores"),
    cluster("containersAllocated"),
    cluster("containersReserved"),
    cluster("containersPending"),
    cluster("totalMB"),
];

/// The ResourceManager exporter.
pub const RESOURCEMANAGER: ExporterProfile = ExporterProfile {
    namespace: "resourcemanager",
    title: "ResourceManager Exporter",
    default_listen: ":9088",
    default_upstream: "http://localhost:8088",
    endpoint: CLUSTER_METRICS_ENDPOINT,
    upstream_flag: "resourcemanager.url",
    layout: DocumentLayout::Keyed,
    metrics: RESOURCEMANAGER_METRICS,
};
