//! ROS Processor - workload usage aggregation service
//!
//! Picks up per-container usage reports from an inbox directory and
//! writes workload-level aggregates for the recommendation engine.

use aggregator_lib::{
    health::{components, HealthRegistry},
    observability::{PipelineLogger, PipelineMetrics},
    AggregationPipeline,
};
use anyhow::Result;
use ros_processor::{api, config::ProcessorConfig, worker::InboxProcessor};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PROCESSOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ProcessorConfig::load()?;
    info!(
        service = %config.service_name,
        version = PROCESSOR_VERSION,
        inbox = %config.inbox_dir.display(),
        outbox = %config.outbox_dir.display(),
        "Starting processor"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::INBOX).await;
    health_registry.register(components::PIPELINE).await;
    health_registry.register(components::OUTBOX).await;

    let pipeline = AggregationPipeline::new(
        PipelineMetrics::new(),
        PipelineLogger::new(&config.service_name),
    );
    let processor = InboxProcessor::new(&config, pipeline, health_registry.clone());
    processor.prepare().await?;

    let app_state = Arc::new(api::AppState::new(health_registry.clone()));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let processor_handle = tokio::spawn(processor.run(shutdown_rx));

    health_registry.set_ready(true).await;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!(reason = "SIGINT received", "Shutting down");
        }
        served = api_handle => {
            match served {
                Ok(Ok(())) => info!("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    health_registry.set_ready(false).await;
    let _ = shutdown_tx.send(true);
    processor_handle.await?;
    info!("Processor stopped");

    Ok(())
}
