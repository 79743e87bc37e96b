//! Gauge declarations and their Prometheus registry.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use crate::error::{Error, Result};
use crate::mapping::{MetricSpec, is_valid_metric_name, sanitize_label_name};

/// Name of the upstream availability gauge.
pub const UP: &str = "up";
/// Name of the last scrape duration gauge.
pub const SCRAPE_DURATION: &str = "scrape_duration_seconds";
/// Name of the failed scrape counter (exposed with a `_total` suffix).
pub const SCRAPE_FAILURES: &str = "scrape_failures";

/// A floating point gauge as stored in the registry.
pub type FloatGauge = Gauge<f64, AtomicU64>;

/// Static description of one exported metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Full metric name including the namespace.
    pub name: String,
    /// Help text.
    pub help: String,
    /// Names of the constant labels attached to the metric.
    pub labels: Vec<String>,
}

/// The declared gauges of one exporter, registered exactly once.
#[derive(Debug)]
pub struct GaugeSet {
    registry: Registry,
    gauges: Vec<(MetricSpec, FloatGauge)>,
    up: FloatGauge,
    scrape_duration: FloatGauge,
    scrape_failures: Counter,
    descriptors: Vec<MetricDescriptor>,
}

impl GaugeSet {
    /// Declare one gauge per spec under `namespace` and register them.
    ///
    /// Fails on an invalid namespace or metric name, and on any metric name
    /// declared twice (including the exporter's own `up` and scrape metrics).
    pub fn new(
        namespace: &str,
        const_labels: &BTreeMap<String, String>,
        specs: &[MetricSpec],
    ) -> Result<Self> {
        if !is_valid_metric_name(namespace) {
            return Err(Error::InvalidMetricName(namespace.to_string()));
        }

        let mut seen: HashSet<&str> = HashSet::from([
            UP,
            SCRAPE_DURATION,
            SCRAPE_FAILURES,
            "scrape_failures_total",
        ]);
        for spec in specs {
            if !is_valid_metric_name(spec.name) {
                return Err(Error::InvalidMetricName(spec.name.to_string()));
            }
            if !seen.insert(spec.name) {
                return Err(Error::DuplicateMetric(format!("{}_{}", namespace, spec.name)));
            }
        }

        check_labels(const_labels, specs)?;

        let const_labels: Vec<(String, String)> = const_labels
            .iter()
            .map(|(k, v)| (sanitize_label_name(k), v.clone()))
            .collect();
        let const_label_names: Vec<String> = const_labels.iter().map(|(k, _)| k.clone()).collect();

        let mut registry = Registry::with_prefix(namespace);
        let mut descriptors = Vec::with_capacity(specs.len() + 3);
        let mut gauges = Vec::with_capacity(specs.len());

        let base = with_labels(&mut registry, &const_labels);

        for spec in specs {
            let spec_labels: Vec<(String, String)> = spec
                .labels
                .iter()
                .map(|(k, v)| (sanitize_label_name(k), v.to_string()))
                .collect();

            let gauge = FloatGauge::default();
            with_labels(&mut *base, &spec_labels).register(spec.name, spec.help, gauge.clone());

            let mut label_names = const_label_names.clone();
            label_names.extend(spec_labels.into_iter().map(|(k, _)| k));
            descriptors.push(MetricDescriptor {
                name: format!("{}_{}", namespace, spec.name),
                help: spec.help.to_string(),
                labels: label_names,
            });

            gauges.push((*spec, gauge));
        }

        let up = FloatGauge::default();
        base.register(
            UP,
            "Whether the last scrape of the upstream endpoint succeeded",
            up.clone(),
        );

        let scrape_duration = FloatGauge::default();
        base.register(
            SCRAPE_DURATION,
            "Duration of the last upstream scrape in seconds",
            scrape_duration.clone(),
        );

        let scrape_failures = Counter::default();
        base.register(
            SCRAPE_FAILURES,
            "Number of failed upstream scrapes",
            scrape_failures.clone(),
        );

        for (name, help) in [
            (UP.to_string(), "Whether the last scrape of the upstream endpoint succeeded"),
            (SCRAPE_DURATION.to_string(), "Duration of the last upstream scrape in seconds"),
            (format!("{}_total", SCRAPE_FAILURES), "Number of failed upstream scrapes"),
        ] {
            descriptors.push(MetricDescriptor {
                name: format!("{}_{}", namespace, name),
                help: help.to_string(),
                labels: const_label_names.clone(),
            });
        }

        Ok(Self {
            registry,
            gauges,
            up,
            scrape_duration,
            scrape_failures,
            descriptors,
        })
    }

    /// Descriptors of every registered metric. Never touches the network.
    pub fn describe(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    /// The declared gauges paired with their specs, in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&MetricSpec, &FloatGauge)> {
        self.gauges.iter().map(|(spec, gauge)| (spec, gauge))
    }

    /// Number of declared gauges (self-metrics excluded).
    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    /// Whether no gauges were declared.
    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    /// Current value of a declared gauge by its unprefixed name.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.gauges
            .iter()
            .find(|(spec, _)| spec.name == name)
            .map(|(_, gauge)| gauge.get())
    }

    /// Current value of the up-indicator.
    pub fn up(&self) -> f64 {
        self.up.get()
    }

    /// Number of failed scrapes so far.
    pub fn scrape_failures(&self) -> u64 {
        self.scrape_failures.get()
    }

    /// Record the outcome of one scrape.
    pub fn observe_scrape(&self, success: bool, elapsed: Duration) {
        self.up.set(if success { 1.0 } else { 0.0 });
        self.scrape_duration.set(elapsed.as_secs_f64());
        if !success {
            self.scrape_failures.inc();
        }
    }

    /// Encode every registered metric in the OpenMetrics text format.
    pub fn encode(&self) -> Result<String> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

/// Check that constant and per-spec labels encode to a valid exposition.
///
/// Label names must stay distinct once sanitized, both among the constant
/// labels and between them and each spec's own labels. Values are written
/// unescaped, so quotes, backslashes and line breaks are rejected.
pub fn check_labels(const_labels: &BTreeMap<String, String>, specs: &[MetricSpec]) -> Result<()> {
    let mut const_names: HashMap<String, &str> = HashMap::new();

    for (key, value) in const_labels {
        check_label_value(key, value)?;
        let name = sanitize_label_name(key);
        if let Some(previous) = const_names.insert(name.clone(), key.as_str()) {
            return Err(Error::config(format!(
                "Labels '{}' and '{}' both map to label name '{}'",
                previous, key, name
            )));
        }
    }

    for spec in specs {
        let mut spec_names: HashSet<String> = HashSet::new();
        for (key, value) in spec.labels {
            check_label_value(key, value)?;
            let name = sanitize_label_name(key);
            if const_names.contains_key(&name) || !spec_names.insert(name.clone()) {
                return Err(Error::config(format!(
                    "Label name '{}' is used twice on metric {}",
                    name, spec.name
                )));
            }
        }
    }

    Ok(())
}

fn check_label_value(key: &str, value: &str) -> Result<()> {
    if value.contains(['"', '\\', '\n', '\r']) {
        return Err(Error::config(format!(
            "Label '{}' has a value containing a quote, backslash or line break",
            key
        )));
    }
    Ok(())
}

/// Descend into nested sub-registries, one per label.
fn with_labels<'r>(registry: &'r mut Registry, labels: &[(String, String)]) -> &'r mut Registry {
    labels.iter().fold(registry, |registry, (key, value)| {
        registry.sub_registry_with_label((Cow::Owned(key.clone()), Cow::Owned(value.clone())))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "Hadoop:service=NameNode,name=FSNamesystem";

    const SPECS: &[MetricSpec] = &[
        MetricSpec::gauge("MissingBlocks", SOURCE, "MissingBlocks"),
        MetricSpec::gauge("CapacityTotal", SOURCE, "CapacityTotal"),
        MetricSpec::flag("isActive", SOURCE, "tag.HAState", "active"),
    ];

    fn no_labels() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    #[test]
    fn test_new_registers_all_specs() {
        let set = GaugeSet::new("namenode", &no_labels(), SPECS).unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.value("MissingBlocks"), Some(0.0));
        assert_eq!(set.value("unknown"), None);
        assert_eq!(set.up(), 0.0);
        assert_eq!(set.scrape_failures(), 0);
    }

    #[test]
    fn test_duplicate_metric_rejected() {
        let specs = [
            MetricSpec::gauge("MissingBlocks", SOURCE, "MissingBlocks"),
            MetricSpec::gauge("MissingBlocks", SOURCE, "Other"),
        ];

        let err = GaugeSet::new("namenode", &no_labels(), &specs).unwrap_err();
        assert!(matches!(err, Error::DuplicateMetric(ref name) if name == "namenode_MissingBlocks"));
    }

    #[test]
    fn test_reserved_names_rejected() {
        let specs = [MetricSpec::gauge("up", SOURCE, "up")];

        let err = GaugeSet::new("namenode", &no_labels(), &specs).unwrap_err();
        assert!(matches!(err, Error::DuplicateMetric(_)));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let specs = [MetricSpec::gauge("tag.HAState", SOURCE, "tag.HAState")];
        let err = GaugeSet::new("namenode", &no_labels(), &specs).unwrap_err();
        assert!(matches!(err, Error::InvalidMetricName(_)));

        let err = GaugeSet::new("name-node", &no_labels(), SPECS).unwrap_err();
        assert!(matches!(err, Error::InvalidMetricName(_)));
    }

    #[test]
    fn test_describe() {
        let mut labels = BTreeMap::new();
        labels.insert("cluster".to_string(), "dc".to_string());
        labels.insert("data-center".to_string(), "dc1".to_string());

        let set = GaugeSet::new("namenode", &labels, SPECS).unwrap();
        let descriptors = set.describe();

        assert_eq!(descriptors.len(), 6);
        assert_eq!(descriptors[0].name, "namenode_MissingBlocks");
        assert_eq!(descriptors[0].help, "MissingBlocks");
        assert_eq!(descriptors[0].labels, vec!["cluster", "data_center"]);
        assert!(descriptors.iter().any(|d| d.name == "namenode_up"));
        assert!(
            descriptors
                .iter()
                .any(|d| d.name == "namenode_scrape_failures_total")
        );
    }

    #[test]
    fn test_encode_with_const_labels() {
        let mut labels = BTreeMap::new();
        labels.insert("cluster".to_string(), "dc".to_string());

        let set = GaugeSet::new("namenode", &labels, SPECS).unwrap();
        for (spec, gauge) in set.entries() {
            if spec.name == "MissingBlocks" {
                gauge.set(3.0);
            }
        }

        let output = set.encode().unwrap();

        assert!(output.contains("# TYPE namenode_MissingBlocks gauge"));
        assert!(output.contains("namenode_MissingBlocks{cluster=\"dc\"} 3"));
        assert!(output.contains("namenode_up{cluster=\"dc\"} 0"));
        assert!(output.contains("namenode_scrape_failures_total{cluster=\"dc\"} 0"));
    }

    #[test]
    fn test_encode_with_spec_labels() {
        const LABELED: &[MetricSpec] = &[MetricSpec::gauge(
            "CollectionCount",
            "java.lang:type=GarbageCollector,name=ParNew",
            "CollectionCount",
        )
        .with_labels(&[("collector", "ParNew")])];

        let set = GaugeSet::new("jvm", &no_labels(), LABELED).unwrap();
        let output = set.encode().unwrap();

        assert!(output.contains("jvm_CollectionCount{collector=\"ParNew\"} 0"));
        assert_eq!(set.describe()[0].labels, vec!["collector"]);
    }

    #[test]
    fn test_const_labels_colliding_after_sanitize_rejected() {
        let mut labels = BTreeMap::new();
        labels.insert("data-center".to_string(), "a".to_string());
        labels.insert("data_center".to_string(), "b".to_string());

        let err = GaugeSet::new("namenode", &labels, SPECS).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("data_center")));
    }

    #[test]
    fn test_const_label_colliding_with_spec_label_rejected() {
        const LABELED: &[MetricSpec] = &[MetricSpec::gauge(
            "CollectionCount",
            "java.lang:type=GarbageCollector,name=ParNew",
            "CollectionCount",
        )
        .with_labels(&[("collector", "ParNew")])];

        let mut labels = BTreeMap::new();
        labels.insert("collector".to_string(), "dc".to_string());

        let err = GaugeSet::new("jvm", &labels, LABELED).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_label_values_needing_escape_rejected() {
        for value in ["a\"b", "a\\b", "a\nb"] {
            let mut labels = BTreeMap::new();
            labels.insert("cluster".to_string(), value.to_string());

            let err = GaugeSet::new("namenode", &labels, SPECS).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "value {:?}", value);
        }

        let mut labels = BTreeMap::new();
        labels.insert("endpoint".to_string(), "http://nn:50070/jmx?q=a b".to_string());
        assert!(GaugeSet::new("namenode", &labels, SPECS).is_ok());
    }

    #[test]
    fn test_observe_scrape() {
        let set = GaugeSet::new("namenode", &no_labels(), SPECS).unwrap();

        set.observe_scrape(true, Duration::from_millis(250));
        assert_eq!(set.up(), 1.0);
        assert_eq!(set.scrape_failures(), 0);

        set.observe_scrape(false, Duration::from_millis(10));
        set.observe_scrape(false, Duration::from_millis(10));
        assert_eq!(set.up(), 0.0);
        assert_eq!(set.scrape_failures(), 2);
    }
}
