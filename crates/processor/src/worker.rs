//! Inbox polling and per-file batch processing
//!
//! Every `*.csv` report dropped in the inbox is aggregated on a blocking
//! worker and written to the outbox. Reports that break the column contract
//! are renamed to `*.rejected` and never retried; I/O failures leave the
//! report in place for the next poll.

use crate::config::ProcessorConfig;
use aggregator_lib::health::{components, HealthRegistry};
use aggregator_lib::ingest::{read_samples_from_path, write_aggregated_to_path};
use aggregator_lib::{AggregationPipeline, PipelineError, PipelineReport};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

const INPUT_EXTENSION: &str = "csv";
const REJECTED_SUFFIX: &str = "rejected";
const OUTPUT_SUFFIX: &str = "aggregated.csv";
const PARTIAL_SUFFIX: &str = "tmp";

/// What happened to one inbox report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Processed {
        output: PathBuf,
        report: PipelineReport,
    },
    Rejected {
        reason: String,
    },
}

/// Totals for one pass over the inbox
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub processed: usize,
    pub rejected: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct InboxProcessor {
    inbox: PathBuf,
    outbox: PathBuf,
    poll_interval: Duration,
    pipeline: AggregationPipeline,
    health: HealthRegistry,
    permits: Arc<Semaphore>,
}

impl InboxProcessor {
    pub fn new(
        config: &ProcessorConfig,
        pipeline: AggregationPipeline,
        health: HealthRegistry,
    ) -> Self {
        Self {
            inbox: config.inbox_dir.clone(),
            outbox: config.outbox_dir.clone(),
            poll_interval: config.poll_interval(),
            pipeline,
            health,
            permits: Arc::new(Semaphore::new(config.max_concurrent_batches)),
        }
    }

    /// Create the inbox and outbox directories if needed
    pub async fn prepare(&self) -> Result<()> {
        for dir in [&self.inbox, &self.outbox] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    /// Reports waiting in the inbox, oldest name first
    pub async fn pending_reports(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.inbox)
            .await
            .with_context(|| format!("Failed to read inbox {}", self.inbox.display()))?;

        let mut reports = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_report = path.extension().and_then(|e| e.to_str()) == Some(INPUT_EXTENSION);
            if is_report && entry.file_type().await?.is_file() {
                reports.push(path);
            }
        }
        reports.sort();
        Ok(reports)
    }

    /// Process every pending report, at most `max_concurrent_batches` at once
    pub async fn poll_once(&self) -> Result<PollSummary> {
        let reports = match self.pending_reports().await {
            Ok(reports) => {
                self.health.set_healthy(components::INBOX).await;
                reports
            }
            Err(e) => {
                self.health
                    .set_unhealthy(components::INBOX, format!("{:#}", e))
                    .await;
                return Err(e);
            }
        };

        if reports.is_empty() {
            debug!(inbox = %self.inbox.display(), "No pending reports");
            return Ok(PollSummary::default());
        }

        let mut tasks = JoinSet::new();
        for path in reports {
            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .context("Batch semaphore closed")?;
            let this = self.clone();
            tasks.spawn(async move {
                let outcome = this.process_report(&path).await;
                drop(permit);
                (path, outcome)
            });
        }

        let mut summary = PollSummary::default();
        while let Some(joined) = tasks.join_next().await {
            let (path, outcome) = joined.context("Batch task panicked")?;
            match outcome {
                Ok(BatchOutcome::Processed { .. }) => summary.processed += 1,
                Ok(BatchOutcome::Rejected { .. }) => summary.rejected += 1,
                Err(e) => {
                    error!(
                        report = %path.display(),
                        error = %format!("{:#}", e),
                        "Failed to process report"
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            processed = summary.processed,
            rejected = summary.rejected,
            failed = summary.failed,
            "Inbox poll complete"
        );
        Ok(summary)
    }

    /// Aggregate one report and settle its file
    pub async fn process_report(&self, path: &Path) -> Result<BatchOutcome> {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = self.outbox.join(output_name(path));

        let partial = partial_path(&output);

        let pipeline = self.pipeline.with_source(source.clone());
        let input = path.to_path_buf();
        let destination = output.clone();
        let staging = partial.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<PipelineReport, PipelineError> {
            let batch = read_samples_from_path(&input)?;
            let (aggregated, report) = pipeline.run_with_report(batch);
            // consumers only ever see complete files under the final name
            write_aggregated_to_path(&aggregated, &staging)?;
            std::fs::rename(&staging, &destination)?;
            Ok(report)
        })
        .await
        .context("Aggregation worker panicked")?;

        match result {
            Ok(report) => {
                tokio::fs::remove_file(path)
                    .await
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                self.health.set_healthy(components::PIPELINE).await;
                self.health.set_healthy(components::OUTBOX).await;
                self.health.record_processed().await;
                info!(
                    report = %source,
                    output = %output.display(),
                    input_rows = report.input_rows,
                    output_rows = report.output_rows,
                    "Report aggregated"
                );
                Ok(BatchOutcome::Processed { output, report })
            }
            Err(e) if e.is_schema_violation() => {
                let rejected = rejected_path(path);
                tokio::fs::rename(path, &rejected)
                    .await
                    .with_context(|| format!("Failed to reject {}", path.display()))?;
                self.health
                    .set_degraded(components::PIPELINE, format!("{}: {}", source, e))
                    .await;
                self.health.record_rejected().await;
                warn!(report = %source, error = %e, "Rejected report");
                Ok(BatchOutcome::Rejected {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(
                            path = %partial.display(),
                            error = %cleanup,
                            "Failed to remove partial output"
                        );
                    }
                }
                self.health
                    .set_degraded(components::OUTBOX, format!("{}: {}", source, e))
                    .await;
                Err(e).with_context(|| format!("Failed to aggregate {}", path.display()))
            }
        }
    }

    /// Poll until the shutdown flag flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        info!(
            inbox = %self.inbox.display(),
            outbox = %self.outbox.display(),
            interval_secs = self.poll_interval.as_secs(),
            "Inbox processor started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %format!("{:#}", e), "Inbox poll failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Inbox processor stopping");
                        break;
                    }
                }
            }
        }
    }
}

/// `usage.csv` -> `usage.aggregated.csv`
fn output_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    format!("{}.{}", stem, OUTPUT_SUFFIX)
}

/// `usage.aggregated.csv` -> `usage.aggregated.csv.tmp`
fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// `usage.csv` -> `usage.csv.rejected`
fn rejected_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(REJECTED_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggregator_lib::schema::IDENTITY_COLUMNS;
    use aggregator_lib::{ComponentStatus, MetricColumn, PipelineLogger, PipelineMetrics};
    use prometheus::Registry;
    use tempfile::TempDir;

    fn report_csv(rows: &[[&str; 9]]) -> String {
        let mut header: Vec<&str> = IDENTITY_COLUMNS.to_vec();
        header.extend(MetricColumn::ALL.iter().map(|c| c.name()));
        let mut lines = vec![header.join(",")];
        for identity in rows {
            let mut cells: Vec<&str> = identity.to_vec();
            cells.extend(MetricColumn::ALL.iter().map(|_| "2"));
            lines.push(cells.join(","));
        }
        lines.join("\n") + "\n"
    }

    fn row<'a>(owner_name: &'a str, workload: &'a str) -> [&'a str; 9] {
        [
            "proj",
            "ReplicaSet",
            owner_name,
            workload,
            "deployment",
            "app",
            "app:v1",
            "t0",
            "t1",
        ]
    }

    fn processor(dir: &TempDir) -> (InboxProcessor, PipelineMetrics) {
        let config = ProcessorConfig {
            inbox_dir: dir.path().join("inbox"),
            outbox_dir: dir.path().join("outbox"),
            max_concurrent_batches: 2,
            ..Default::default()
        };
        let metrics = PipelineMetrics::with_registry(&Registry::new()).unwrap();
        let pipeline = AggregationPipeline::new(metrics.clone(), PipelineLogger::new("inbox"));
        (
            InboxProcessor::new(&config, pipeline, HealthRegistry::new()),
            metrics,
        )
    }

    #[test]
    fn test_file_names() {
        assert_eq!(output_name(Path::new("/in/usage-1.csv")), "usage-1.aggregated.csv");
        assert_eq!(
            rejected_path(Path::new("/in/usage-1.csv")),
            PathBuf::from("/in/usage-1.csv.rejected")
        );
        assert_eq!(
            partial_path(Path::new("/out/usage-1.aggregated.csv")),
            PathBuf::from("/out/usage-1.aggregated.csv.tmp")
        );
    }

    #[tokio::test]
    async fn test_poll_processes_reports() {
        let dir = TempDir::new().unwrap();
        let (processor, metrics) = processor(&dir);
        processor.prepare().await.unwrap();

        let inbox = dir.path().join("inbox");
        for i in 0..3 {
            std::fs::write(
                inbox.join(format!("usage-{}.csv", i)),
                report_csv(&[row("web-1", "web"), row("web-2", "web")]),
            )
            .unwrap();
        }
        std::fs::write(inbox.join("notes.txt"), "ignored").unwrap();

        let summary = processor.poll_once().await.unwrap();
        assert_eq!(
            summary,
            PollSummary {
                processed: 3,
                rejected: 0,
                failed: 0
            }
        );

        assert!(processor.pending_reports().await.unwrap().is_empty());
        assert!(inbox.join("notes.txt").exists());

        let output =
            std::fs::read_to_string(dir.path().join("outbox/usage-0.aggregated.csv")).unwrap();
        assert_eq!(output.lines().count(), 2);
        assert_eq!(metrics.aggregated_rows(), 3);

        let health = processor.health.health().await;
        assert_eq!(health.batches.processed, 3);
        assert_eq!(health.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_schema_violation_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (processor, _) = processor(&dir);
        processor.prepare().await.unwrap();

        let report = dir.path().join("inbox/broken.csv");
        std::fs::write(&report, "namespace,owner_kind\nproj,ReplicaSet\n").unwrap();

        let outcome = processor.process_report(&report).await.unwrap();
        match outcome {
            BatchOutcome::Rejected { reason } => assert!(reason.contains("owner_name")),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(!report.exists());
        assert!(dir.path().join("inbox/broken.csv.rejected").exists());

        let health = processor.health.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.batches.rejected, 1);

        // rejected files are not picked up again
        let summary = processor.poll_once().await.unwrap();
        assert_eq!(summary, PollSummary::default());
    }

    #[tokio::test]
    async fn test_empty_result_still_written() {
        let dir = TempDir::new().unwrap();
        let (processor, _) = processor(&dir);
        processor.prepare().await.unwrap();

        let report = dir.path().join("inbox/jobs.csv");
        let mut job = row("job-1", "job-1");
        job[1] = "Job";
        job[4] = "job";
        std::fs::write(&report, report_csv(&[job])).unwrap();

        match processor.process_report(&report).await.unwrap() {
            BatchOutcome::Processed { output, report } => {
                assert_eq!(report.unsupported_kind_rows, 1);
                assert_eq!(report.output_rows, 0);
                let text = std::fs::read_to_string(output).unwrap();
                assert_eq!(text.lines().count(), 1);
            }
            other => panic!("expected processed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let (processor, _) = processor(&dir);
        processor.prepare().await.unwrap();

        let report = dir.path().join("inbox/usage.csv");
        std::fs::write(&report, report_csv(&[row("web-1", "web")])).unwrap();

        // a directory squatting on the output name makes the final rename fail
        let output = dir.path().join("outbox/usage.aggregated.csv");
        std::fs::create_dir(&output).unwrap();
        std::fs::write(output.join("keep"), "").unwrap();

        assert!(processor.process_report(&report).await.is_err());
        assert!(report.exists());
        assert!(output.is_dir());
        assert!(!dir.path().join("outbox/usage.aggregated.csv.tmp").exists());

        let health = processor.health.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.components["outbox"]
            .message
            .as_deref()
            .unwrap_or_default()
            .contains("usage.csv"));
        assert_eq!(health.batches.processed, 0);
    }

    #[tokio::test]
    async fn test_missing_inbox_marks_unhealthy() {
        let dir = TempDir::new().unwrap();
        let (processor, _) = processor(&dir);

        assert!(processor.poll_once().await.is_err());
        let health = processor.health.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let (processor, _) = processor(&dir);
        processor.prepare().await.unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(processor.run(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("processor did not stop")
            .unwrap();
    }
}
