//! Usage report processor
//!
//! Polls an inbox directory for container usage reports, aggregates each
//! one with the workload pipeline and serves health and metrics endpoints.

pub mod api;
pub mod config;
pub mod worker;
