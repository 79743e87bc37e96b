//! Prometheus exporter for the YARN ResourceManager.

use resourcemanager_exporter::RESOURCEMANAGER;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hadoop_exporter_common::run_exporter(&RESOURCEMANAGER).await
}
