//! Exporter configuration.
//!
//! Configuration is read from an optional JSON5 file and then overridden by
//! command line flags. Values left unset fall back to the exporter profile.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::profile::ExporterProfile;
use crate::registry::check_labels;

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP endpoint settings.
    #[serde(default)]
    pub web: WebConfig,

    /// Upstream management endpoint settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Constant labels added to every exported metric.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Address to listen on (default: the profile's address).
    #[serde(default)]
    pub listen: Option<String>,

    /// Path for the metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: None,
            path: default_path(),
        }
    }
}

/// Upstream endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the management endpoint (default: the profile's URL).
    #[serde(default)]
    pub url: Option<String>,

    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum idle pooled connections (default: 10).
    #[serde(default = "default_max_idle")]
    pub max_idle_connections: usize,
}

fn default_timeout() -> u64 {
    10
}

fn default_max_idle() -> usize {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_timeout(),
            max_idle_connections: default_max_idle(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(json5::from_str(content)?)
    }

    /// Listen address, falling back to the profile default.
    pub fn listen_addr(&self, profile: &ExporterProfile) -> Result<SocketAddr> {
        let listen = self.web.listen.as_deref().unwrap_or(profile.default_listen);
        parse_listen_addr(listen)
    }

    /// Upstream base URL, falling back to the profile default.
    pub fn upstream_base<'a>(&'a self, profile: &'a ExporterProfile) -> &'a str {
        self.upstream.url.as_deref().unwrap_or(profile.default_upstream)
    }

    /// Full URL fetched on every scrape.
    pub fn upstream_url(&self, profile: &ExporterProfile) -> String {
        profile.upstream_url(self.upstream_base(profile))
    }

    /// Validate the configuration against a profile.
    pub fn validate(&self, profile: &ExporterProfile) -> Result<()> {
        self.listen_addr(profile)?;

        if !self.web.path.starts_with('/') {
            return Err(Error::config("Metrics path must start with /"));
        }

        // "/" serves the landing page
        if self.web.path == "/" {
            return Err(Error::config("Metrics path must not be /"));
        }

        // Route captures and wildcards would make the router panic or match more than one path
        if self.web.path.contains(['*', ':', '{', '}'])
            || self.web.path[1..].split('/').any(str::is_empty)
        {
            return Err(Error::config(format!(
                "Metrics path must be a plain path without wildcards, captures or empty segments: {}",
                self.web.path
            )));
        }

        let base = self.upstream_base(profile);
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::config(format!(
                "Upstream URL must use http or https: {}",
                base
            )));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be > 0"));
        }

        if self.labels.keys().any(|k| k.trim().is_empty()) {
            return Err(Error::config("Label names must not be empty"));
        }

        check_labels(&self.labels, profile.metrics)?;

        Ok(())
    }
}

/// Parse a listen address, accepting the `:9070` shorthand for all interfaces.
pub fn parse_listen_addr(listen: &str) -> Result<SocketAddr> {
    let candidate = if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    };

    candidate
        .parse()
        .map_err(|_| Error::config(format!("Invalid listen address: {}", listen)))
}

/// Parse constant labels written as `key:value;key:value`.
///
/// Empty segments are ignored; the value may itself contain `:`.
pub fn parse_const_labels(spec: &str) -> Result<BTreeMap<String, String>> {
    let mut labels = BTreeMap::new();

    for pair in spec.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let (key, value) = pair
            .split_once(':')
            .ok_or_else(|| Error::config(format!("Invalid label pair '{}': expected key:value", pair)))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(Error::config(format!(
                "Invalid label pair '{}': empty name",
                pair
            )));
        }

        labels.insert(key.to_string(), value.trim().to_string());
    }

    Ok(labels)
}
