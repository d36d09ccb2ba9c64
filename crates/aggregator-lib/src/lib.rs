//! Workload usage aggregation library
//!
//! This crate provides the core functionality for:
//! - Reading per-container usage reports from CSV
//! - Resolving each sample's owning workload
//! - Filtering unsupported workload kinds and invalid samples
//! - Aggregating samples per workload container and interval
//! - Health checks and observability

pub mod aggregator;
pub mod classifier;
pub mod error;
pub mod filters;
pub mod health;
pub mod ingest;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod schema;

pub use error::{PipelineError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PipelineLogger, PipelineMetrics};
pub use pipeline::{AggregationPipeline, PipelineReport};
pub use schema::{MetricColumn, MetricFamily, MetricValues, Reduction, Statistic};
