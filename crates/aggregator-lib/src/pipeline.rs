//! Batch aggregation pipeline
//!
//! Classifier -> type filter -> validity filter -> aggregator. Each stage
//! consumes the whole batch from the previous one; nothing is streamed.

use crate::aggregator::aggregate;
use crate::classifier::classify_batch;
use crate::filters::{filter_supported_kinds, filter_valid_records};
use crate::models::{AggregatedBatch, SampleBatch};
use crate::observability::{PipelineLogger, PipelineMetrics};
use serde::Serialize;
use std::time::Instant;

/// Row counts observed at each stage of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub input_rows: usize,
    pub unclassifiable_rows: usize,
    pub unsupported_kind_rows: usize,
    pub invalid_rows: usize,
    pub output_rows: usize,
}

impl PipelineReport {
    /// Rows that reached the aggregator
    pub fn aggregated_input_rows(&self) -> usize {
        self.input_rows - self.unclassifiable_rows - self.unsupported_kind_rows - self.invalid_rows
    }
}

/// Aggregation pipeline with its injected metrics sink and logger.
///
/// Cheap to clone; runs over different batches may proceed concurrently.
#[derive(Clone)]
pub struct AggregationPipeline {
    metrics: PipelineMetrics,
    logger: PipelineLogger,
}

impl AggregationPipeline {
    pub fn new(metrics: PipelineMetrics, logger: PipelineLogger) -> Self {
        Self { metrics, logger }
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Same metrics sink, logging under another batch source
    pub fn with_source(&self, source: impl Into<String>) -> Self {
        Self {
            metrics: self.metrics.clone(),
            logger: PipelineLogger::new(source),
        }
    }

    /// Turn raw samples into workload-level aggregates
    pub fn run(&self, batch: SampleBatch) -> AggregatedBatch {
        self.run_with_report(batch).0
    }

    pub fn run_with_report(&self, batch: SampleBatch) -> (AggregatedBatch, PipelineReport) {
        let started = Instant::now();
        let mut report = PipelineReport {
            input_rows: batch.len(),
            ..Default::default()
        };

        let (classified, unclassifiable) = classify_batch(batch);
        report.unclassifiable_rows = unclassifiable;
        if unclassifiable != 0 {
            self.metrics.add_unclassifiable_rows(unclassifiable);
            self.logger.log_unclassifiable(unclassifiable);
        }

        let (supported, unsupported) = filter_supported_kinds(classified);
        report.unsupported_kind_rows = unsupported;
        if unsupported != 0 {
            self.metrics.add_unsupported_workload_rows(unsupported);
            self.logger.log_unsupported_kinds(unsupported);
        }

        let (valid, invalid) = filter_valid_records(supported);
        report.invalid_rows = invalid;
        if invalid != 0 {
            self.metrics.add_invalid_datapoints(invalid);
            self.logger.log_invalid_records(invalid);
        }

        if valid.is_empty() {
            self.logger.log_batch_empty(report.input_rows);
            return (AggregatedBatch::empty(), report);
        }

        let aggregated = aggregate(valid);
        report.output_rows = aggregated.len();

        let elapsed = started.elapsed().as_secs_f64();
        self.metrics.add_aggregated_rows(aggregated.len());
        self.metrics.observe_aggregation_duration(elapsed);
        self.logger
            .log_batch_aggregated(report.input_rows, report.output_rows, elapsed);

        (aggregated, report)
    }
}
