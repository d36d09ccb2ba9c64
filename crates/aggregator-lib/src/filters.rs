//! Row filters applied between classification and aggregation

use crate::models::{ClassifiedRow, WorkloadKind, WorkloadRow};
use crate::schema::{MetricValues, VALIDATED_COLUMNS};

/// Keep rows whose resolved object type is a supported controller kind.
///
/// Returns the surviving rows and the number dropped.
pub fn filter_supported_kinds(rows: Vec<ClassifiedRow>) -> (Vec<WorkloadRow>, usize) {
    let input = rows.len();
    let kept: Vec<WorkloadRow> = rows
        .into_iter()
        .filter_map(|row| {
            let kind = row.k8s_object_type.parse::<WorkloadKind>().ok()?;
            Some(WorkloadRow {
                sample: row.sample,
                kind,
                k8s_object_name: row.k8s_object_name,
            })
        })
        .collect();

    let dropped = input - kept.len();
    (kept, dropped)
}

/// True when every usage statistic is present and non-negative.
///
/// NaN fails the comparison and therefore invalidates the row.
pub fn is_valid_record(metrics: &MetricValues) -> bool {
    VALIDATED_COLUMNS
        .iter()
        .all(|column| matches!(metrics[*column], Some(v) if v >= 0.0))
}

/// Drop rows with absent or negative usage statistics.
///
/// Conjunctive: one failing column drops the whole row. Returns the
/// surviving rows and the number dropped.
pub fn filter_valid_records(rows: Vec<WorkloadRow>) -> (Vec<WorkloadRow>, usize) {
    let input = rows.len();
    let kept: Vec<WorkloadRow> = rows
        .into_iter()
        .filter(|row| is_valid_record(&row.sample.metrics))
        .collect();

    let dropped = input - kept.len();
    (kept, dropped)
}
