//! Observability handles for the aggregation pipeline
//!
//! Provides:
//! - Prometheus counters for dropped rows (validity, unsupported kind, missing owner)
//! - Aggregation latency histogram
//! - Structured logging with tracing

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Histogram buckets for batch aggregation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Counter of rows dropped by the validity filter (`invalidDataPoints`)
pub const INVALID_DATAPOINTS_METRIC: &str = "rosocp_invalid_datapoints_total";

/// Handle registered in the default registry, shared by every `new()` call
static GLOBAL_METRICS: OnceLock<PipelineMetrics> = OnceLock::new();

/// Collectors behind a [`PipelineMetrics`] handle
struct PipelineMetricsInner {
    invalid_datapoints: IntCounter,
    unsupported_workload_rows: IntCounter,
    unclassifiable_rows: IntCounter,
    aggregated_rows: IntCounter,
    aggregation_duration_seconds: Histogram,
}

impl PipelineMetricsInner {
    fn new() -> prometheus::Result<Self> {
        Ok(Self {
            invalid_datapoints: IntCounter::new(
                INVALID_DATAPOINTS_METRIC,
                "The total number of invalid datapoints (rows) found in received CSVs",
            )?,
            unsupported_workload_rows: IntCounter::new(
                "rosocp_unsupported_workload_rows_total",
                "Rows dropped because the resolved workload kind is not supported",
            )?,
            unclassifiable_rows: IntCounter::new(
                "rosocp_unclassifiable_rows_total",
                "Rows dropped because owner or workload information was empty",
            )?,
            aggregated_rows: IntCounter::new(
                "rosocp_aggregated_rows_total",
                "Aggregated rows produced for the recommendation engine",
            )?,
            aggregation_duration_seconds: Histogram::with_opts(
                HistogramOpts::new(
                    "rosocp_aggregation_duration_seconds",
                    "Time spent aggregating one batch",
                )
                .buckets(LATENCY_BUCKETS.to_vec()),
            )?,
        })
    }

    fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.invalid_datapoints.clone()))?;
        registry.register(Box::new(self.unsupported_workload_rows.clone()))?;
        registry.register(Box::new(self.unclassifiable_rows.clone()))?;
        registry.register(Box::new(self.aggregated_rows.clone()))?;
        registry.register(Box::new(self.aggregation_duration_seconds.clone()))?;
        Ok(())
    }
}

/// Thread-safe metrics sink for the pipeline.
///
/// Clones share the same collectors, so concurrent batches increment one
/// set of counters.
#[derive(Clone)]
pub struct PipelineMetrics {
    inner: Arc<PipelineMetricsInner>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    /// Handle backed by the process-wide default registry
    pub fn new() -> Self {
        GLOBAL_METRICS
            .get_or_init(|| {
                let inner = PipelineMetricsInner::new().expect("Failed to create pipeline metrics");
                inner
                    .register(prometheus::default_registry())
                    .expect("Failed to register pipeline metrics");
                Self {
                    inner: Arc::new(inner),
                }
            })
            .clone()
    }

    /// Handle registered in a caller-owned registry
    pub fn with_registry(registry: &Registry) -> prometheus::Result<Self> {
        let inner = PipelineMetricsInner::new()?;
        inner.register(registry)?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Add rows dropped by the validity filter
    pub fn add_invalid_datapoints(&self, count: usize) {
        self.inner.invalid_datapoints.inc_by(count as u64);
    }

    pub fn add_unsupported_workload_rows(&self, count: usize) {
        self.inner.unsupported_workload_rows.inc_by(count as u64);
    }

    pub fn add_unclassifiable_rows(&self, count: usize) {
        self.inner.unclassifiable_rows.inc_by(count as u64);
    }

    pub fn add_aggregated_rows(&self, count: usize) {
        self.inner.aggregated_rows.inc_by(count as u64);
    }

    /// Record one batch aggregation latency observation
    pub fn observe_aggregation_duration(&self, duration_secs: f64) {
        self.inner.aggregation_duration_seconds.observe(duration_secs);
    }

    pub fn invalid_datapoints(&self) -> u64 {
        self.inner.invalid_datapoints.get()
    }

    pub fn unsupported_workload_rows(&self) -> u64 {
        self.inner.unsupported_workload_rows.get()
    }

    pub fn unclassifiable_rows(&self) -> u64 {
        self.inner.unclassifiable_rows.get()
    }

    pub fn aggregated_rows(&self) -> u64 {
        self.inner.aggregated_rows.get()
    }
}

/// Structured logger for pipeline events
///
/// Every event carries the batch source (usually the file name) so log
/// lines from concurrently processed batches stay attributable.
#[derive(Clone, Debug)]
pub struct PipelineLogger {
    source: String,
}

impl PipelineLogger {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Log rows dropped for absent or negative usage statistics
    pub fn log_invalid_records(&self, dropped: usize) {
        info!(
            event = "invalid_records",
            source = %self.source,
            dropped = dropped,
            "Invalid records in CSV - {}",
            dropped
        );
    }

    pub fn log_unsupported_kinds(&self, dropped: usize) {
        debug!(
            event = "unsupported_kinds",
            source = %self.source,
            dropped = dropped,
            "Dropped rows with unsupported workload kinds"
        );
    }

    pub fn log_unclassifiable(&self, dropped: usize) {
        debug!(
            event = "unclassifiable_rows",
            source = %self.source,
            dropped = dropped,
            "Dropped rows without owner or workload information"
        );
    }

    /// Log a batch with no valid rows left to aggregate
    pub fn log_batch_empty(&self, input_rows: usize) {
        info!(
            event = "batch_empty",
            source = %self.source,
            input_rows = input_rows,
            "No valid rows left after filtering"
        );
    }

    pub fn log_batch_aggregated(&self, input_rows: usize, output_rows: usize, duration_secs: f64) {
        info!(
            event = "batch_aggregated",
            source = %self.source,
            input_rows = input_rows,
            output_rows = output_rows,
            duration_secs = duration_secs,
            "Aggregated usage batch"
        );
    }
}
