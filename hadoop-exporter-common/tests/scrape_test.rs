//! End-to-end scrape tests against a mock upstream endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;

use hadoop_exporter_common::{
    DocumentLayout, ExporterConfig, ExporterProfile, HttpServer, MetricSpec, ScrapeCollector,
};

const FS: &str = "Hadoop:service=NameNode,name=FSNamesystem";
const INFO: &str = "Hadoop:service=NameNode,name=NameNodeInfo";

const METRICS: &[MetricSpec] = &[
    MetricSpec::gauge("MissingBlocks", FS, "MissingBlocks"),
    MetricSpec::gauge("CapacityTotal", FS, "CapacityTotal"),
    MetricSpec::flag("isActive", FS, "tag.HAState", "active"),
    MetricSpec::gauge("Threads", INFO, "Threads"),
];

/// Canned upstream response.
#[derive(Clone)]
struct MockUpstream {
    response: Arc<Mutex<(StatusCode, String)>>,
    delay: Arc<Mutex<Duration>>,
}

impl MockUpstream {
    fn set(&self, status: StatusCode, body: &str) {
        *self.response.lock() = (status, body.to_string());
    }

    fn stall(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }
}

async fn jmx_handler(State(mock): State<MockUpstream>) -> (StatusCode, String) {
    let delay = *mock.delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    mock.response.lock().clone()
}

/// Start a mock upstream on an ephemeral port.
async fn start_upstream(body: &str) -> (MockUpstream, SocketAddr) {
    let mock = MockUpstream {
        response: Arc::new(Mutex::new((StatusCode::OK, body.to_string()))),
        delay: Arc::new(Mutex::new(Duration::ZERO)),
    };
    let router = Router::new()
        .route("/jmx", get(jmx_handler))
        .with_state(mock.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (mock, addr)
}

fn profile() -> ExporterProfile {
    ExporterProfile {
        namespace: "namenode",
        title: "NameNode Exporter",
        default_listen: "127.0.0.1:0",
        default_upstream: "http://127.0.0.1:9/jmx",
        endpoint: "",
        upstream_flag: "namenode.jmx.url",
        layout: DocumentLayout::Beans,
        metrics: METRICS,
    }
}

fn collector_for(addr: SocketAddr, labels: &[(&str, &str)]) -> ScrapeCollector {
    let mut config = ExporterConfig::default();
    config.upstream.url = Some(format!("http://{}/jmx", addr));
    config.upstream.timeout_secs = 2;
    for (k, v) in labels {
        config.labels.insert(k.to_string(), v.to_string());
    }
    ScrapeCollector::new(&profile(), &config).unwrap()
}

const HEALTHY: &str = r#"{"beans":[
    {"name":"Hadoop:service=NameNode,name=FSNamesystem","MissingBlocks":3,"CapacityTotal":1000,"tag.HAState":"active"},
    {"name":"Hadoop:service=NameNode,name=NameNodeInfo","Threads":58,"Version":"2.7.3"}
]}"#;

#[tokio::test]
async fn test_scrape_maps_fields() {
    let (_mock, addr) = start_upstream(HEALTHY).await;
    let collector = collector_for(addr, &[("cluster", "dc")]);

    let output = collector.collect().await.unwrap();

    assert!(output.contains("namenode_MissingBlocks{cluster=\"dc\"} 3"));
    assert!(output.contains("namenode_CapacityTotal{cluster=\"dc\"} 1000"));
    assert!(output.contains("namenode_isActive{cluster=\"dc\"} 1"));
    assert!(output.contains("namenode_Threads{cluster=\"dc\"} 58"));
    assert!(output.contains("namenode_up{cluster=\"dc\"} 1"));
    assert!(output.contains("namenode_scrape_failures_total{cluster=\"dc\"} 0"));
    assert!(output.ends_with("# EOF\n"));
}

#[tokio::test]
async fn test_upstream_error_keeps_last_values() {
    let (mock, addr) = start_upstream(HEALTHY).await;
    let collector = collector_for(addr, &[]);

    assert!(collector.scrape().await);
    assert_eq!(collector.gauges().value("MissingBlocks"), Some(3.0));

    mock.set(StatusCode::INTERNAL_SERVER_ERROR, "boom");
    let output = collector.collect().await.unwrap();

    assert!(output.contains("namenode_MissingBlocks 3"));
    assert!(output.contains("namenode_up 0"));
    assert!(output.contains("namenode_scrape_failures_total 1"));

    let stats = collector.stats();
    assert_eq!(stats.scrapes, 2);
    assert_eq!(stats.failures, 1);
    assert!(stats.last_error.unwrap().contains("500"));

    // Recovery brings up back to 1 with fresh values
    mock.set(
        StatusCode::OK,
        r#"{"beans":[{"name":"Hadoop:service=NameNode,name=FSNamesystem","MissingBlocks":0}]}"#,
    );
    let output = collector.collect().await.unwrap();
    assert!(output.contains("namenode_MissingBlocks 0"));
    assert!(output.contains("namenode_up 1"));
    assert_eq!(collector.gauges().value("Threads"), Some(58.0));
}

#[tokio::test]
async fn test_hung_upstream_times_out() {
    let (mock, addr) = start_upstream(HEALTHY).await;
    let mut config = ExporterConfig::default();
    config.upstream.url = Some(format!("http://{}/jmx", addr));
    config.upstream.timeout_secs = 1;
    let collector = ScrapeCollector::new(&profile(), &config).unwrap();

    assert!(collector.scrape().await);

    mock.stall(Duration::from_secs(10));
    let started = Instant::now();
    let output = collector.collect().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(3), "collect took {:?}", elapsed);
    assert!(output.contains("namenode_MissingBlocks 3"));
    assert!(output.contains("namenode_up 0"));
    assert!(output.contains("namenode_scrape_failures_total 1"));
    assert_eq!(collector.stats().failures, 1);
}

#[tokio::test]
async fn test_malformed_body_is_a_failure() {
    let (mock, addr) = start_upstream("not json").await;
    let collector = collector_for(addr, &[]);

    assert!(!collector.scrape().await);
    assert_eq!(collector.gauges().up(), 0.0);

    mock.set(StatusCode::OK, r#"{"items":[]}"#);
    assert!(!collector.scrape().await);
    assert_eq!(collector.gauges().scrape_failures(), 2);
}

#[tokio::test]
async fn test_empty_beans_is_a_success() {
    let (_mock, addr) = start_upstream(r#"{"beans":[]}"#).await;
    let collector = collector_for(addr, &[]);

    let output = collector.collect().await.unwrap();

    assert!(output.contains("namenode_up 1"));
    assert!(output.contains("namenode_MissingBlocks 0"));
    assert_eq!(collector.stats().last_summary.records_matched, 0);
}

#[tokio::test]
async fn test_non_numeric_field_skipped() {
    let (mock, addr) = start_upstream(HEALTHY).await;
    let collector = collector_for(addr, &[]);
    assert!(collector.scrape().await);

    mock.set(
        StatusCode::OK,
        r#"{"beans":[{"name":"Hadoop:service=NameNode,name=FSNamesystem","MissingBlocks":"n/a","CapacityTotal":2000,"tag.HAState":"standby"}]}"#,
    );
    assert!(collector.scrape().await);

    let gauges = collector.gauges();
    assert_eq!(gauges.value("MissingBlocks"), Some(3.0));
    assert_eq!(gauges.value("CapacityTotal"), Some(2000.0));
    assert_eq!(gauges.value("isActive"), Some(0.0));
    assert_eq!(gauges.up(), 1.0);
}

#[tokio::test]
async fn test_repeated_scrapes_are_identical() {
    let (_mock, addr) = start_upstream(HEALTHY).await;
    let collector = collector_for(addr, &[]);

    collector.scrape().await;
    let first = collector.gauges().encode().unwrap();
    collector.scrape().await;
    let second = collector.gauges().encode().unwrap();

    // Only the duration gauge may differ between two scrapes
    let strip = |s: &str| {
        s.lines()
            .filter(|l| !l.contains("scrape_duration_seconds"))
            .map(str::to_string)
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&first), strip(&second));
}

#[tokio::test]
async fn test_concurrent_collects() {
    let (_mock, addr) = start_upstream(HEALTHY).await;
    let collector = Arc::new(collector_for(addr, &[]));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let collector = collector.clone();
        handles.push(tokio::spawn(async move { collector.collect().await }));
    }

    for handle in handles {
        let output = handle.await.unwrap().unwrap();
        assert!(output.contains("namenode_MissingBlocks 3"));
        assert!(output.contains("namenode_up 1"));
    }

    assert_eq!(collector.stats().scrapes, 8);
    assert_eq!(collector.stats().failures, 0);
}

#[tokio::test]
async fn test_http_server_end_to_end() {
    let (_mock, upstream) = start_upstream(HEALTHY).await;
    let collector = Arc::new(collector_for(upstream, &[("idc", "dc1")]));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = HttpServer::new(collector, addr, "/metrics", "NameNode Exporter");
    let server_task = tokio::spawn(server.serve(listener, shutdown_rx));

    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/metrics", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/openmetrics-text")
    );
    let body = response.text().await.unwrap();
    assert!(body.contains("namenode_MissingBlocks{idc=\"dc1\"} 3"));
    assert!(body.contains("namenode_up{idc=\"dc1\"} 1"));

    let landing = client
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(landing.contains("NameNode Exporter"));
    assert!(landing.contains("href=\"/metrics\""));

    shutdown_tx.send(true).unwrap();
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_http_server_reports_unreachable_upstream() {
    // Bind then drop to obtain a port nobody listens on
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let collector = Arc::new(collector_for(dead_addr, &[]));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = HttpServer::new(collector, addr, "/metrics", "NameNode Exporter");
    let server_task = tokio::spawn(server.serve(listener, shutdown_rx));

    let response = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("namenode_up 0"));
    assert!(body.contains("namenode_scrape_failures_total 1"));

    shutdown_tx.send(true).unwrap();
    server_task.await.unwrap().unwrap();
}
