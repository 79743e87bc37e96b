//! CLI argument parsing for exporters.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser};

use crate::config::{ExporterConfig, parse_const_labels};
use crate::error::Result;
use crate::profile::ExporterProfile;

/// Common CLI arguments for all exporters. Every flag overrides the
/// corresponding configuration file value.
#[derive(Parser, Debug, Clone, Default)]
#[command(version)]
pub struct ExporterArgs {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address on which to expose metrics and web interface.
    #[arg(long = "web.listen-address")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path")]
    pub telemetry_path: Option<String>,

    /// Base URL of the upstream management endpoint.
    #[arg(long = "upstream.url")]
    pub upstream_url: Option<String>,

    /// Constant labels added to every metric, as `key:value;key:value`.
    #[arg(long = "const.labels")]
    pub const_labels: Option<String>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl ExporterArgs {
    /// Parse the process arguments for `profile`, exiting on error.
    ///
    /// The profile's own upstream flag (e.g. `--namenode.jmx.url`) is accepted
    /// as an alias of `--upstream.url`.
    pub fn parse_for(profile: &ExporterProfile) -> Self {
        Self::try_parse_for_from(profile, std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parse `args` for `profile`.
    pub fn try_parse_for_from<I, T>(profile: &ExporterProfile, args: I) -> clap::error::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = <Self as CommandFactory>::command()
            .about(profile.title)
            .mut_arg("upstream_url", |arg| arg.visible_alias(profile.upstream_flag))
            .try_get_matches_from(args)?;

        <Self as FromArgMatches>::from_arg_matches(&matches)
    }

    /// Apply the flags given on the command line on top of `config`.
    ///
    /// Constant labels from the command line are merged over the file's labels.
    pub fn apply(&self, config: &mut ExporterConfig) -> Result<()> {
        if let Some(listen) = &self.listen_address {
            config.web.listen = Some(listen.clone());
        }

        if let Some(path) = &self.telemetry_path {
            config.web.path = path.clone();
        }

        if let Some(url) = &self.upstream_url {
            config.upstream.url = Some(url.clone());
        }

        if let Some(labels) = &self.const_labels {
            config.labels.extend(parse_const_labels(labels)?);
        }

        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }

        Ok(())
    }

    /// Load the configuration file (if any) and apply the flags over it.
    pub fn load_config(&self) -> Result<ExporterConfig> {
        let mut config = match &self.config {
            Some(path) => ExporterConfig::load_from_file(path)?,
            None => ExporterConfig::default(),
        };
        self.apply(&mut config)?;
        Ok(config)
    }
}
