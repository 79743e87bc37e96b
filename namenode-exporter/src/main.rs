//! Prometheus exporter for the HDFS NameNode.

use namenode_exporter::NAMENODE;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hadoop_exporter_common::run_exporter(&NAMENODE).await
}
