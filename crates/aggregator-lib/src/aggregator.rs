//! Group-by aggregation over workload rows
//!
//! Rows are partitioned by [`GroupingKey`] and every metric column is folded
//! with the reduction assigned to it in the column table.

use crate::models::{AggregatedBatch, AggregatedRow, GroupingKey, WorkloadRow};
use crate::schema::{MetricColumn, MetricValues, Reduction, METRIC_COLUMN_COUNT};
use std::collections::BTreeMap;

/// Running statistics for one column of one group.
///
/// Absent and non-finite values are skipped, so a column with no usable
/// values reduces to `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    pub fn push(&mut self, value: Option<f64>) {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return;
        };
        if self.count == 0 {
            self.min = v;
            self.max = v;
        } else {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
        self.sum += v;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn finish(&self, reduction: Reduction) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(match reduction {
            Reduction::Mean => self.sum / self.count as f64,
            Reduction::Sum => self.sum,
            Reduction::Min => self.min,
            Reduction::Max => self.max,
        })
    }
}

#[derive(Debug, Default)]
struct GroupState {
    columns: [Accumulator; METRIC_COLUMN_COUNT],
}

impl GroupState {
    fn push(&mut self, metrics: &MetricValues) {
        for (acc, (_, value)) in self.columns.iter_mut().zip(metrics.iter()) {
            acc.push(value);
        }
    }

    fn finish(&self) -> MetricValues {
        let mut out = MetricValues::new();
        for (acc, column) in self.columns.iter().zip(MetricColumn::ALL) {
            out.set(column, acc.finish(column.reduction()));
        }
        out
    }
}

/// Partition rows by grouping key and reduce every metric column.
///
/// Output is ordered by key. Every group holds at least one row.
pub fn aggregate(rows: Vec<WorkloadRow>) -> AggregatedBatch {
    let mut groups: BTreeMap<GroupingKey, GroupState> = BTreeMap::new();
    for row in &rows {
        groups
            .entry(row.grouping_key())
            .or_default()
            .push(&row.sample.metrics);
    }

    let aggregated = groups
        .into_iter()
        .map(|(key, state)| AggregatedRow {
            key,
            metrics: state.finish(),
        })
        .collect();

    AggregatedBatch::new(aggregated)
}
