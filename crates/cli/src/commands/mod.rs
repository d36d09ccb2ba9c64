//! Subcommand implementations

pub mod aggregate;
pub mod classify;
pub mod columns;

use aggregator_lib::ingest::read_samples_from_path;
use aggregator_lib::SampleBatch;
use anyhow::{Context, Result};
use std::path::Path;

/// Read a usage report, attaching the path to any error
pub(crate) fn load_report(path: &Path) -> Result<SampleBatch> {
    read_samples_from_path(path).with_context(|| format!("Failed to read {}", path.display()))
}
