//! Run the full aggregation pipeline over one report

use aggregator_lib::ingest::write_aggregated;
use aggregator_lib::{
    AggregatedRow, AggregationPipeline, MetricColumn, PipelineLogger, PipelineMetrics,
    PipelineReport,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::Path;
use tabled::Tabled;

use super::load_report;
use crate::output::{
    color_count, format_bytes, format_metric, print_info, print_json, print_success, print_table,
    OutputFormat,
};

/// Row for the aggregates table
#[derive(Tabled)]
struct AggregateRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Workload")]
    name: String,
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "Interval Start")]
    interval_start: String,
    #[tabled(rename = "CPU Avg")]
    cpu_avg: String,
    #[tabled(rename = "CPU Max")]
    cpu_max: String,
    #[tabled(rename = "Mem Avg")]
    memory_avg: String,
    #[tabled(rename = "Mem Max")]
    memory_max: String,
    #[tabled(rename = "RSS Max")]
    rss_max: String,
}

impl From<&AggregatedRow> for AggregateRow {
    fn from(row: &AggregatedRow) -> Self {
        Self {
            namespace: row.key.namespace.clone(),
            kind: row.key.k8s_object_type.to_string(),
            name: row.key.k8s_object_name.clone(),
            container: row.key.container_name.clone(),
            interval_start: row.key.interval_start.clone(),
            cpu_avg: format_metric(row.get(MetricColumn::CpuUsageContainerAvg)),
            cpu_max: format_metric(row.get(MetricColumn::CpuUsageContainerMax)),
            memory_avg: format_bytes(row.get(MetricColumn::MemoryUsageContainerAvg)),
            memory_max: format_bytes(row.get(MetricColumn::MemoryUsageContainerMax)),
            rss_max: format_bytes(row.get(MetricColumn::MemoryRssUsageContainerMax)),
        }
    }
}

#[derive(Serialize)]
struct AggregateOutput<'a> {
    report: PipelineReport,
    rows: Vec<&'a AggregatedRow>,
}

pub fn run(file: &Path, output: Option<&Path>, format: OutputFormat) -> Result<()> {
    let batch = load_report(file)?;
    let source = file.display().to_string();
    let pipeline = AggregationPipeline::new(PipelineMetrics::new(), PipelineLogger::new(source));
    let (aggregated, report) = pipeline.run_with_report(batch);

    match format {
        OutputFormat::Csv => match output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_aggregated(&aggregated, file)?;
                print_success(&format!(
                    "Wrote {} aggregated rows to {}",
                    aggregated.len(),
                    path.display()
                ));
            }
            None => write_aggregated(&aggregated, io::stdout().lock())?,
        },
        OutputFormat::Json => {
            print_json(&AggregateOutput {
                report,
                rows: aggregated.iter().collect(),
            })?;
        }
        OutputFormat::Table => {
            print_summary(&report);
            println!();
            print_table(
                aggregated.iter().map(AggregateRow::from).collect(),
                "No valid rows left to aggregate",
            );
            println!("\nTotal: {} aggregated rows", aggregated.len());
        }
    }

    Ok(())
}

fn print_summary(report: &PipelineReport) {
    print_info(&format!("Input rows:            {}", report.input_rows));
    println!("  Missing owner info:  {}", color_count(report.unclassifiable_rows));
    println!("  Unsupported kind:    {}", color_count(report.unsupported_kind_rows));
    println!("  Invalid metrics:     {}", color_count(report.invalid_rows));
    println!("  Aggregated from:     {}", report.aggregated_input_rows());
}
