//! Processor configuration

use anyhow::{ensure, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Processor configuration, read from `ROS_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Label attached to startup logs
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory polled for usage CSV reports
    #[serde(default = "default_inbox_dir")]
    pub inbox_dir: PathBuf,

    /// Directory receiving aggregated CSV output
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: PathBuf,

    /// Inbox poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Upper bound on batches aggregated at the same time
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
}

fn default_service_name() -> String {
    "ros-processor".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_inbox_dir() -> PathBuf {
    PathBuf::from("./inbox")
}

fn default_outbox_dir() -> PathBuf {
    PathBuf::from("./outbox")
}

fn default_poll_interval() -> u64 {
    30
}

fn default_max_concurrent_batches() -> usize {
    4
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            api_port: default_api_port(),
            inbox_dir: default_inbox_dir(),
            outbox_dir: default_outbox_dir(),
            poll_interval_secs: default_poll_interval(),
            max_concurrent_batches: default_max_concurrent_batches(),
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let source = config::Config::builder()
            .add_source(config::Environment::with_prefix("ROS").try_parsing(true))
            .build()?;
        Self::from_source(source)
    }

    fn from_source(source: config::Config) -> Result<Self> {
        let config: ProcessorConfig = source.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.poll_interval_secs > 0, "poll_interval_secs must be positive");
        ensure!(
            self.max_concurrent_batches > 0,
            "max_concurrent_batches must be positive"
        );
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
