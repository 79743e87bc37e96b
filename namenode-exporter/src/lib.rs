//! Prometheus exporter for the HDFS NameNode.
//!
//! Scrapes the NameNode JMX servlet (`/jmx`) on every Prometheus scrape and
//! exports a curated set of bean attributes as `namenode_*` gauges.
//!
//! # Usage
//!
//! ```bash
//! namenode-exporter --namenode.jmx.url http://nn1:50070/jmx --const.labels "cluster:dc"
//! ```

use hadoop_exporter_common::{DocumentLayout, ExporterProfile, MetricSpec};

/// Filesystem namespace bean.
pub const FS_NAMESYSTEM: &str = "Hadoop:service=NameNode,name=FSNamesystem";
/// Datanode liveness bean.
pub const FS_NAMESYSTEM_STATE: &str = "Hadoop:service=NameNode,name=FSNamesystemState";
/// Hadoop's own JVM metrics bean.
pub const JVM_METRICS: &str = "Hadoop:service=NameNode,name=JvmMetrics";
/// Young generation collector bean.
pub const GC_PAR_NEW: &str = "java.lang:type=GarbageCollector,name=ParNew";
/// Old generation collector bean.
pub const GC_CONCURRENT_MARK_SWEEP: &str = "java.lang:type=GarbageCollector,name=ConcurrentMarkSweep";
/// JVM memory bean.
pub const MEMORY: &str = "java.lang:type=Memory";

/// Gauges exported by the NameNode exporter.
pub const NAMENODE_METRICS: &[MetricSpec] = &[
    // FSNamesystem
    MetricSpec::gauge("MissingBlocks", FS_NAMESYSTEM, "MissingBlocks"),
    MetricSpec::gauge("CapacityTotal", FS_NAMESYSTEM, "CapacityTotal"),
    MetricSpec::gauge("CapacityUsed", FS_NAMESYSTEM, "CapacityUsed"),
    MetricSpec::gauge("CapacityRemaining", FS_NAMESYSTEM, "CapacityRemaining"),
    MetricSpec::gauge("CapacityUsedNonDFS", FS_NAMESYSTEM, "CapacityUsedNonDFS"),
    MetricSpec::gauge("BlocksTotal", FS_NAMESYSTEM, "BlocksTotal"),
    MetricSpec::gauge("FilesTotal", FS_NAMESYSTEM, "FilesTotal"),
    MetricSpec::gauge("CorruptBlocks", FS_NAMESYSTEM, "CorruptBlocks"),
    MetricSpec::gauge("ExcessBlocks", FS_NAMESYSTEM, "ExcessBlocks"),
    MetricSpec::gauge("StaleDataNodes", FS_NAMESYSTEM, "StaleDataNodes"),
    MetricSpec::gauge("BlockCapacity", FS_NAMESYSTEM, "BlockCapacity"),
    MetricSpec::gauge("TotalLoad", FS_NAMESYSTEM, "TotalLoad"),
    MetricSpec::gauge("UnderReplicatedBlocks", FS_NAMESYSTEM, "UnderReplicatedBlocks"),
    MetricSpec::flag("isActive", FS_NAMESYSTEM, "tag.HAState", "active"),
    // FSNamesystemState
    MetricSpec::gauge("VolumeFailuresTotal", FS_NAMESYSTEM_STATE, "VolumeFailuresTotal"),
    MetricSpec::gauge("NumLiveDataNodes", FS_NAMESYSTEM_STATE, "NumLiveDataNodes"),
    MetricSpec::gauge("NumDeadDataNodes", FS_NAMESYSTEM_STATE, "NumDeadDataNodes"),
    // JvmMetrics
    MetricSpec::gauge("GcCountConcurrentMarkSweep", JVM_METRICS, "GcCountConcurrentMarkSweep"),
    MetricSpec::gauge(
        "GcTimeMillisConcurrentMarkSweep",
        JVM_METRICS,
        "GcTimeMillisConcurrentMarkSweep",
    ),
    MetricSpec::gauge("MemNonHeapUsedM", JVM_METRICS, "MemNonHeapUsedM"),
    MetricSpec::gauge("MemNonHeapCommittedM", JVM_METRICS, "MemNonHeapCommittedM"),
    MetricSpec::gauge("MemHeapUsedM", JVM_METRICS, "MemHeapUsedM"),
    MetricSpec::gauge("MemHeapCommittedM", JVM_METRICS, "MemHeapCommittedM"),
    MetricSpec::gauge("MemHeapMaxM", JVM_METRICS, "MemHeapMaxM"),
    // Garbage collectors
    MetricSpec::gauge("ParNew_CollectionCount", GC_PAR_NEW, "CollectionCount")
        .with_help("ParNew GC Count"),
    MetricSpec::gauge("ParNew_CollectionTime", GC_PAR_NEW, "CollectionTime")
        .with_help("ParNew GC Time"),
    MetricSpec::gauge(
        "ConcurrentMarkSweep_CollectionCount",
        GC_CONCURRENT_MARK_SWEEP,
        "CollectionCount",
    )
    .with_help("ConcurrentMarkSweep GC Count"),
    MetricSpec::gauge(
        "ConcurrentMarkSweep_CollectionTime",
        GC_CONCURRENT_MARK_SWEEP,
        "CollectionTime",
    )
    .with_help("ConcurrentMarkSweep GC Time"),
    // Memory
    MetricSpec::gauge("heapMemoryUsageCommitted", MEMORY, "HeapMemoryUsage.committed"),
    MetricSpec::gauge("heapMemoryUsageInit", MEMORY, "HeapMemoryUsage.init"),
    MetricSpec::gauge("heapMemoryUsageMax", MEMORY, "HeapMemoryUsage.max"),
    MetricSpec::gauge("heapMemoryUsageUsed", MEMORY, "HeapMemoryUsage.used"),
];

/// The NameNode exporter.
pub const NAMENODE: ExporterProfile = ExporterProfile {
    namespace: "namenode",
    title: "NameNode Exporter",
    default_listen: ":9070",
    default_upstream: "http://localhost:50070/jmx",
    endpoint: "",
    upstream_flag: "namenode.jmx.url",
    layout: DocumentLayout::Beans,
    metrics: NAMENODE_METRICS,
};
