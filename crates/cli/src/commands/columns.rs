//! Print the metric column table

use aggregator_lib::schema::GROUPING_COLUMNS;
use aggregator_lib::MetricColumn;
use anyhow::{bail, Result};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_json, print_table, yes_no, OutputFormat};

#[derive(Serialize, Tabled)]
struct ColumnRow {
    #[tabled(rename = "Column")]
    column: &'static str,
    #[tabled(rename = "Family")]
    family: &'static str,
    #[tabled(rename = "Statistic")]
    statistic: &'static str,
    #[tabled(rename = "Reduction")]
    reduction: &'static str,
    #[tabled(skip)]
    validated: bool,
    #[serde(skip)]
    #[tabled(rename = "Must Be Non-Negative")]
    validated_label: String,
}

pub fn run(format: OutputFormat) -> Result<()> {
    let rows: Vec<ColumnRow> = MetricColumn::ALL
        .iter()
        .map(|column| {
            let validated = column.family().is_validated();
            ColumnRow {
                column: column.name(),
                family: column.family().column_prefix(),
                statistic: column.statistic().suffix(),
                reduction: column.reduction().as_str(),
                validated,
                validated_label: yes_no(validated),
            }
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Csv => bail!("CSV output is only supported by `aggregate`"),
        OutputFormat::Table => {
            println!("Grouped by: {}\n", GROUPING_COLUMNS.join(", "));
            print_table(rows, "No metric columns");
        }
    }

    Ok(())
}
