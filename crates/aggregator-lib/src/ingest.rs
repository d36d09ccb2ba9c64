//! CSV batch boundary
//!
//! Reads producer usage reports into a [`SampleBatch`] and writes
//! [`AggregatedBatch`] rows back out with the same column names.

use crate::error::{PipelineError, Result};
use crate::models::{AggregatedBatch, SampleBatch, SampleRow};
use crate::schema::{self, MetricColumn, MetricValues, Schema, GROUPING_COLUMNS};
use csv::StringRecord;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Read a usage report.
///
/// The header is resolved once; every record is then decoded positionally.
pub fn read_samples<R: Read>(reader: R) -> Result<SampleBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let schema = Schema::from_headers(reader.headers()?)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(decode_record(&schema, &record?)?);
    }

    debug!(rows = rows.len(), "Read usage samples");
    Ok(SampleBatch::new(rows))
}

pub fn read_samples_from_path(path: &Path) -> Result<SampleBatch> {
    let file = File::open(path)?;
    read_samples(file)
}

fn decode_record(schema: &Schema, record: &StringRecord) -> Result<SampleRow> {
    let text = |name: &str| -> String {
        schema
            .identity_position(name)
            .and_then(|pos| record.get(pos))
            .unwrap_or_default()
            .to_string()
    };

    let mut metrics = MetricValues::new();
    for column in MetricColumn::ALL {
        let cell = record.get(schema.metric_position(column)).unwrap_or_default();
        metrics.set(column, parse_metric(record, column, cell)?);
    }

    Ok(SampleRow {
        namespace: text(schema::NAMESPACE),
        owner_kind: text(schema::OWNER_KIND),
        owner_name: text(schema::OWNER_NAME),
        workload: text(schema::WORKLOAD),
        workload_type: text(schema::WORKLOAD_TYPE),
        container_name: text(schema::CONTAINER_NAME),
        image_name: text(schema::IMAGE_NAME),
        interval_start: text(schema::INTERVAL_START),
        interval_end: text(schema::INTERVAL_END),
        metrics,
    })
}

/// Empty cells and non-finite literals such as `NaN` are absent values;
/// anything else must parse as a float
fn parse_metric(record: &StringRecord, column: MetricColumn, cell: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(|v| v.is_finite().then_some(v))
        .map_err(|_| PipelineError::InvalidValue {
            line: record.position().map(|p| p.line()).unwrap_or_default(),
            column: column.name().to_string(),
            value: cell.to_string(),
        })
}

/// Write aggregated rows: key columns first, then every metric column
pub fn write_aggregated<W: Write>(batch: &AggregatedBatch, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    let header = GROUPING_COLUMNS
        .iter()
        .copied()
        .chain(MetricColumn::ALL.iter().map(|c| c.name()));
    writer.write_record(header)?;

    for row in batch.iter() {
        let mut record: Vec<String> = row.key.fields().iter().map(|f| f.to_string()).collect();
        record.extend(
            row.metrics
                .iter()
                .map(|(_, value)| value.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_aggregated_to_path(batch: &AggregatedBatch, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_aggregated(batch, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MetricFamily, IDENTITY_COLUMNS};

    fn header() -> String {
        let mut names: Vec<&str> = vec!["report_period_start", "pod"];
        names.extend(IDENTITY_COLUMNS);
        names.extend(MetricColumn::ALL.iter().map(|c| c.name()));
        names.join(",")
    }

    fn line(identity: [&str; 9], metric: &str) -> String {
        let mut cells: Vec<String> = vec!["2023-02-01".to_string(), "app-pod-1".to_string()];
        cells.extend(identity.iter().map(|s| s.to_string()));
        cells.extend(MetricColumn::ALL.iter().map(|_| metric.to_string()));
        cells.join(",")
    }

    const IDENTITY: [&str; 9] = [
        "proj",
        "ReplicaSet",
        "rs-123",
        "<none>",
        "replicaset",
        "app",
        "quay.io/proj/app:v1",
        "2023-02-01 00:00:00 +0000 UTC",
        "2023-02-01 00:14:59 +0000 UTC",
    ];

    #[test]
    fn test_read_samples() {
        let csv = format!("{}\n{}\n{}\n", header(), line(IDENTITY, "1.5"), line(IDENTITY, ""));
        let batch = read_samples(csv.as_bytes()).unwrap();
        assert_eq!(batch.len(), 2);

        let rows = batch.into_rows();
        assert_eq!(rows[0].namespace, "proj");
        assert_eq!(rows[0].owner_kind, "ReplicaSet");
        assert_eq!(rows[0].workload, "<none>");
        assert_eq!(rows[0].interval_end, "2023-02-01 00:14:59 +0000 UTC");
        assert_eq!(rows[0].metrics[MetricColumn::CpuUsageContainerSum], Some(1.5));
        assert_eq!(rows[1].metrics[MetricColumn::CpuUsageContainerSum], None);
    }

    #[test]
    fn test_nan_cells_are_absent() {
        let mut cells: Vec<String> = vec!["2023-02-01".to_string(), "app-pod-1".to_string()];
        cells.extend(IDENTITY.iter().map(|s| s.to_string()));
        cells.extend(MetricColumn::ALL.iter().map(|c| match c.family() {
            MetricFamily::CpuThrottle => "NaN".to_string(),
            MetricFamily::CpuUsage => "nan".to_string(),
            _ => "2".to_string(),
        }));
        let csv = format!("{}\n{}\n", header(), cells.join(","));

        let rows = read_samples(csv.as_bytes()).unwrap().into_rows();
        assert_eq!(rows[0].metrics[MetricColumn::CpuThrottleContainerSum], None);
        assert_eq!(rows[0].metrics[MetricColumn::CpuThrottleContainerMax], None);
        assert_eq!(rows[0].metrics[MetricColumn::CpuUsageContainerAvg], None);
        assert_eq!(rows[0].metrics[MetricColumn::MemoryUsageContainerAvg], Some(2.0));
        // absent usage fails validation rather than slipping through
        assert!(!crate::filters::is_valid_record(&rows[0].metrics));
    }

    #[test]
    fn test_read_header_only() {
        let batch = read_samples(format!("{}\n", header()).as_bytes()).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_missing_column_is_schema_violation() {
        let csv = "namespace,owner_kind\nproj,ReplicaSet\n";
        let err = read_samples(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "owner_name"));
        assert!(err.is_schema_violation());
    }

    #[test]
    fn test_non_numeric_metric() {
        let csv = format!("{}\n{}\n", header(), line(IDENTITY, "lots"));
        match read_samples(csv.as_bytes()) {
            Err(PipelineError::InvalidValue {
                line,
                column,
                value,
            }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "cpu_request_container_avg");
                assert_eq!(value, "lots");
            }
            other => panic!("expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_ragged_row() {
        let csv = format!("{}\nproj,ReplicaSet\n", header());
        let err = read_samples(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Csv(_)));
        assert!(err.is_schema_violation());
    }

    #[test]
    fn test_write_aggregated_header() {
        let mut out = Vec::new();
        write_aggregated(&AggregatedBatch::empty(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let header: Vec<&str> = text.trim_end().split(',').collect();
        assert_eq!(header.len(), GROUPING_COLUMNS.len() + MetricColumn::ALL.len());
        assert_eq!(header[1], "k8s_object_type");
        assert_eq!(header[8], "cpu_request_container_avg");
    }

    #[test]
    fn test_missing_file() {
        let err = read_samples_from_path(Path::new("/nonexistent/usage.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
        assert!(!err.is_schema_violation());
    }
}
