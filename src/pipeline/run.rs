//! Pipeline scheduler
//!
//! Submits every job up front to a bounded pool, counts terminations, and
//! emits `Finished` exactly once after the last outcome.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use super::config::ConvertConfig;
use super::job::{run_job, CancelToken, ConversionJob, JobContext, OutputClaims};
use super::outcome::{ConversionEvent, ConversionOutcome, JobReport, RunSummary};
use crate::encoder::Encoder;
use crate::error::PreflightError;
use crate::selection::ImageCandidate;

/// Shared state of one batch
#[derive(Debug)]
pub struct PipelineRun {
    total: usize,
    completed: AtomicUsize,
    converted: AtomicUsize,
    skipped: AtomicUsize,
    cancelled: AtomicUsize,
    failed: AtomicUsize,
    delete_warnings: AtomicUsize,
    cancel: CancelToken,
    claims: OutputClaims,
}

impl PipelineRun {
    pub fn new(total: usize, cancel: CancelToken) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            converted: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            delete_warnings: AtomicUsize::new(0),
            cancel,
            claims: OutputClaims::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn claims(&self) -> &OutputClaims {
        &self.claims
    }

    /// Count one terminated job. Returns the new completed count; the
    /// caller that sees `total` owns the completion event.
    fn record(&self, report: &JobReport) -> usize {
        let counter = match report.outcome {
            ConversionOutcome::Converted(_) => &self.converted,
            ConversionOutcome::Skipped(_) => &self.skipped,
            ConversionOutcome::Cancelled => &self.cancelled,
            ConversionOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.delete_warnings.fetch_add(report.warnings.len(), Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.total,
            converted: self.converted.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            cancelled: self.cancelled.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            delete_warnings: self.delete_warnings.load(Ordering::SeqCst),
            was_cancelled: self.cancel.is_cancelled(),
        }
    }
}

/// A validated, ready-to-run pipeline
#[derive(Debug)]
pub struct Pipeline {
    ctx: Arc<JobContext>,
    workers: usize,
    // Removed with everything left in it when the pipeline is dropped
    _temp_dir: tempfile::TempDir,
}

impl Pipeline {
    /// Run the pre-flight checks and set up the private temp directory.
    /// Nothing is submitted if this fails.
    pub fn new(config: &ConvertConfig) -> Result<Self, PreflightError> {
        let encoder_path = config.validate()?;

        let temp_dir = tempfile::Builder::new()
            .prefix("astc-converter-")
            .tempdir()
            .map_err(|e| PreflightError::TempDir(e.to_string()))?;

        let ctx = JobContext {
            encoder: Encoder::new(encoder_path, config.timeout),
            quality: config.quality,
            scan: config.scan.clone(),
            temp_dir: temp_dir.path().to_path_buf(),
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            workers: config.workers.max(1),
            _temp_dir: temp_dir,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Jobs for the confirmed work set, in selection order
    pub fn jobs_for(candidates: &[ImageCandidate], config: &ConvertConfig) -> Vec<ConversionJob> {
        candidates
            .iter()
            .filter(|c| c.is_selected())
            .map(|c| ConversionJob::from_candidate(c, config.block))
            .collect()
    }

    /// Run every job and stream events to `events`.
    ///
    /// Each job sends exactly one `Outcome`; `Finished` follows the last one.
    /// Cancellation is cooperative: in-flight encoder runs finish, queued
    /// jobs resolve to `Cancelled`.
    pub async fn run(
        &self,
        jobs: Vec<ConversionJob>,
        cancel: CancelToken,
        events: UnboundedSender<ConversionEvent>,
    ) -> RunSummary {
        let run = Arc::new(PipelineRun::new(jobs.len(), cancel));
        info!("Converting {} images with {} workers", run.total(), self.workers);

        if run.total() == 0 {
            let summary = run.summary();
            let _ = events.send(ConversionEvent::Finished(summary));
            return summary;
        }

        stream::iter(jobs.into_iter().enumerate())
            .map(|(index, job)| {
                let ctx = Arc::clone(&self.ctx);
                let run = Arc::clone(&run);
                let events = events.clone();
                async move {
                    let report = run_job(&ctx, run.cancel_token(), run.claims(), index, job).await;
                    let completed = run.record(&report);
                    debug!("[{}/{}] {}", completed, run.total(), report.log_line());

                    let _ = events.send(ConversionEvent::Outcome {
                        report,
                        completed,
                        total: run.total(),
                    });

                    if completed == run.total() {
                        let _ = events.send(ConversionEvent::Finished(run.summary()));
                    }
                }
            })
            .buffer_unordered(self.workers)
            .for_each(|_| async {})
            .await;

        let summary = run.summary();
        info!("{}", summary.summary_line());
        summary
    }
}
