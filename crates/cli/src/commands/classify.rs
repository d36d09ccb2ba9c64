//! Show how each row of a report resolves to a workload object

use aggregator_lib::classifier::{classify, has_owner_info};
use aggregator_lib::{SampleRow, WorkloadKind};
use anyhow::{bail, Result};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::load_report;
use crate::output::{print_json, print_table, yes_no, OutputFormat};

#[derive(Debug, Serialize, Tabled)]
struct ClassificationRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Owner Kind")]
    owner_kind: String,
    #[tabled(rename = "Owner Name")]
    owner_name: String,
    #[tabled(rename = "Workload")]
    workload: String,
    #[tabled(rename = "Object Type")]
    k8s_object_type: String,
    #[tabled(rename = "Object Name")]
    k8s_object_name: String,
    #[tabled(skip)]
    aggregated: bool,
    #[serde(skip)]
    #[tabled(rename = "Aggregated")]
    aggregated_label: String,
}

impl From<&SampleRow> for ClassificationRow {
    fn from(row: &SampleRow) -> Self {
        let (object_type, object_name, aggregated) = if has_owner_info(row) {
            let object = classify(row);
            let supported = object.object_type.parse::<WorkloadKind>().is_ok();
            (object.object_type, object.object_name, supported)
        } else {
            (String::new(), String::new(), false)
        };

        Self {
            namespace: row.namespace.clone(),
            owner_kind: row.owner_kind.clone(),
            owner_name: row.owner_name.clone(),
            workload: row.workload.clone(),
            k8s_object_type: object_type,
            k8s_object_name: object_name,
            aggregated,
            aggregated_label: yes_no(aggregated),
        }
    }
}

pub fn run(file: &Path, limit: Option<usize>, format: OutputFormat) -> Result<()> {
    let batch = load_report(file)?;
    let total = batch.len();
    let rows: Vec<ClassificationRow> = batch
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(ClassificationRow::from)
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Csv => bail!("CSV output is only supported by `aggregate`"),
        OutputFormat::Table => {
            let shown = rows.len();
            let supported = rows.iter().filter(|r| r.aggregated).count();
            print_table(rows, "Report has no rows");
            println!(
                "\nShowing {} of {} rows, {} resolve to a supported workload kind",
                shown, total, supported
            );
        }
    }

    Ok(())
}
