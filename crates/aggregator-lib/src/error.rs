//! Error taxonomy for batch ingestion and emission
//!
//! Only contract violations are errors here. Negative metric values,
//! unsupported workload kinds and empty results are ordinary pipeline
//! outcomes and never surface as `PipelineError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required column is absent from the batch header
    #[error("missing required column `{0}`")]
    MissingColumn(String),

    /// A metric cell could not be parsed as a number
    #[error("invalid value {value:?} for column `{column}` on line {line}")]
    InvalidValue {
        line: u64,
        column: String,
        value: String,
    },

    /// Malformed CSV (ragged rows, bad quoting, invalid UTF-8)
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// True when the input batch itself breaks the column contract.
    ///
    /// Such batches must be rejected rather than retried.
    pub fn is_schema_violation(&self) -> bool {
        match self {
            PipelineError::MissingColumn(_) | PipelineError::InvalidValue { .. } => true,
            PipelineError::Csv(e) => !e.is_io_error(),
            PipelineError::Io(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
