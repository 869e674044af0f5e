//! Conversion worker: one image through prepare, encode and clean-up
//!
//! Pending -> Preparing -> Encoding -> Finalizing -> terminal. Every path
//! out of `run_job` yields exactly one `JobReport`.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageReader;
use tempfile::TempPath;
use tracing::{debug, warn};

use super::outcome::{ConversionOutcome, DeleteWarning, JobReport, SkipReason};
use crate::encoder::{Encoder, Quality};
use crate::error::JobError;
use crate::paths;
use crate::scan::ScanOptions;
use crate::selection::ImageCandidate;
use crate::textures::{prepare_rgba, BlockChoice, BlockSize};

/// Latched cancellation flag shared by every job of a run
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; cannot be undone
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// `.astc` paths claimed by the jobs of one run.
///
/// Sources sharing a stem (`hero.png`, `hero.bmp`) map to the same output;
/// only the first job to claim it may encode.
#[derive(Debug, Default)]
pub struct OutputClaims(Mutex<HashSet<PathBuf>>);

impl OutputClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `output`; false if another job of this run already holds it
    pub fn claim(&self, output: &Path) -> bool {
        let mut claimed = self.0.lock().unwrap_or_else(|e| e.into_inner());
        claimed.insert(output.to_path_buf())
    }
}

/// Unit of work submitted to the pool
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub path: PathBuf,
    /// Size on disk at scan time, the advisor's reference size
    pub source_bytes: Option<u64>,
    pub block: BlockChoice,
}

impl ConversionJob {
    pub fn new(path: impl Into<PathBuf>, block: BlockChoice) -> Self {
        Self {
            path: path.into(),
            source_bytes: None,
            block,
        }
    }

    pub fn from_candidate(candidate: &ImageCandidate, block: BlockChoice) -> Self {
        Self {
            path: candidate.path.clone(),
            source_bytes: Some(candidate.file_size),
            block,
        }
    }
}

/// Run-wide parameters every job reads
#[derive(Debug)]
pub struct JobContext {
    pub encoder: Encoder,
    pub quality: Quality,
    /// Ignore rules, re-checked per job
    pub scan: ScanOptions,
    /// Private directory for intermediate PNGs
    pub temp_dir: PathBuf,
}

/// Drive one job to a terminal state
pub async fn run_job(
    ctx: &JobContext,
    cancel: &CancelToken,
    claims: &OutputClaims,
    index: usize,
    job: ConversionJob,
) -> JobReport {
    let mut warnings = Vec::new();
    let outcome = convert(ctx, cancel, claims, &job, &mut warnings).await;

    JobReport {
        index,
        path: job.path,
        outcome,
        warnings,
    }
}

async fn convert(
    ctx: &JobContext,
    cancel: &CancelToken,
    claims: &OutputClaims,
    job: &ConversionJob,
    warnings: &mut Vec<DeleteWarning>,
) -> ConversionOutcome {
    // Pending
    if cancel.is_cancelled() {
        return ConversionOutcome::Cancelled;
    }

    if ctx.scan.is_ignored(&job.path) {
        return ConversionOutcome::Skipped(SkipReason::Ignored);
    }

    // Claimed before the first await so submission order decides the winner
    let output = paths::output_path_for(&job.path);
    if !claims.claim(&output) {
        debug!("Output claimed by another job, skipping: {}", job.path.display());
        return ConversionOutcome::Skipped(SkipReason::DuplicateOutput);
    }

    if tokio::fs::try_exists(&output).await.unwrap_or(false) {
        debug!("Output exists, skipping: {}", output.display());
        return ConversionOutcome::Skipped(SkipReason::OutputExists);
    }

    let source_bytes = match tokio::fs::metadata(&job.path).await {
        Ok(meta) if meta.len() == 0 => {
            return ConversionOutcome::Failed(JobError::InvalidInput(format!(
                "empty file: {}",
                job.path.display()
            )))
        }
        Ok(meta) => job.source_bytes.unwrap_or(meta.len()),
        Err(_) => {
            return ConversionOutcome::Failed(JobError::InvalidInput(format!(
                "missing file: {}",
                job.path.display()
            )))
        }
    };

    // Preparing
    let source = job.path.clone();
    let temp_dir = ctx.temp_dir.clone();
    let choice = job.block;
    let prepared = tokio::task::spawn_blocking(move || prepare(&source, &temp_dir, choice, source_bytes)).await;

    let (block, temp) = match prepared {
        Ok(Ok(prepared)) => prepared,
        Ok(Err(e)) => return ConversionOutcome::Failed(e),
        Err(e) => return ConversionOutcome::Failed(JobError::DecodeError(format!("prepare task failed: {}", e))),
    };

    encode_prepared(ctx, cancel, job, &output, block, temp, warnings).await
}

/// Everything after Preparing: the cancellation checkpoint, the encoder
/// run, and clean-up. The temp file is removed on every path.
async fn encode_prepared(
    ctx: &JobContext,
    cancel: &CancelToken,
    job: &ConversionJob,
    output: &Path,
    block: BlockSize,
    temp: TempPath,
    warnings: &mut Vec<DeleteWarning>,
) -> ConversionOutcome {
    if cancel.is_cancelled() {
        remove_temp(temp, warnings).await;
        return ConversionOutcome::Cancelled;
    }

    // Encoding
    debug!("Encoding {} at {}", job.path.display(), block);
    let encoded = ctx.encoder.encode(&temp, output, block, ctx.quality).await;

    // Finalizing
    remove_temp(temp, warnings).await;

    if let Err(e) = encoded {
        warn!("Encoder failed for {}: {}", job.path.display(), e);
        return ConversionOutcome::Failed(e);
    }

    if let Err(e) = tokio::fs::remove_file(&job.path).await {
        warn!("Converted but could not delete source {}: {}", job.path.display(), e);
        warnings.push(DeleteWarning {
            path: job.path.clone(),
            error: e.to_string(),
        });
    }

    ConversionOutcome::Converted(block)
}

/// Decode, pick the footprint, pad, and write the lossless intermediate
fn prepare(source: &Path, temp_dir: &Path, choice: BlockChoice, source_bytes: u64) -> Result<(BlockSize, TempPath), JobError> {
    let decoded = ImageReader::open(source)
        .map_err(|e| JobError::DecodeError(format!("{}: {}", source.display(), e)))?
        .with_guessed_format()
        .map_err(|e| JobError::DecodeError(format!("{}: {}", source.display(), e)))?
        .decode()
        .map_err(|e| JobError::DecodeError(format!("{}: {}", source.display(), e)))?;

    let block = choice.resolve(decoded.width(), decoded.height(), source_bytes);
    let padded = prepare_rgba(decoded, block)?;

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());

    let temp = tempfile::Builder::new()
        .prefix(&format!("{}-", stem))
        .suffix(".png")
        .tempfile_in(temp_dir)
        .map_err(|e| JobError::TempWrite(e.to_string()))?;

    let (file, temp_path) = temp.into_parts();
    write_png(file, &padded).map_err(|e| JobError::TempWrite(format!("{}: {}", temp_path.display(), e)))?;

    Ok((block, temp_path))
}

/// Fast-compression PNG; the file is read once and deleted
fn write_png(file: File, image: &image::RgbaImage) -> image::ImageResult<()> {
    let encoder = PngEncoder::new_with_quality(BufWriter::new(file), CompressionType::Fast, FilterType::Adaptive);
    image.write_with_encoder(encoder)
}

/// Best-effort removal of the intermediate file
async fn remove_temp(temp: TempPath, warnings: &mut Vec<DeleteWarning>) {
    let path = temp.to_path_buf();
    let closed = match tokio::task::spawn_blocking(move || temp.close()).await {
        Ok(closed) => closed,
        Err(e) => Err(std::io::Error::other(e.to_string())),
    };
    if let Err(e) = closed {
        warn!("Could not delete temporary file {}: {}", path.display(), e);
        warnings.push(DeleteWarning {
            path,
            error: e.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::write_image;
    use std::time::Duration;
    use tempfile::TempDir;

    fn context(temp: &TempDir, encoder: &str) -> JobContext {
        let temp_dir = temp.path().join("work");
        std::fs::create_dir_all(&temp_dir).unwrap();
        JobContext {
            encoder: Encoder::new(encoder, Duration::from_secs(5)),
            quality: Quality::Fast,
            scan: ScanOptions::default(),
            temp_dir,
        }
    }

    #[test]
    fn test_cancel_token_latches() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_output_claims() {
        let claims = OutputClaims::new();
        assert!(claims.claim(Path::new("/assets/hero.astc")));
        assert!(!claims.claim(Path::new("/assets/hero.astc")));
        assert!(claims.claim(Path::new("/assets/villain.astc")));
    }

    #[tokio::test]
    async fn test_shared_output_skips_second_job() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("hero.png");
        write_image(&source, 8, 8);

        let ctx = context(&temp, "/nonexistent/encoder");
        let claims = OutputClaims::new();
        assert!(claims.claim(&temp.path().join("hero.astc")));

        let report = run_job(&ctx, &CancelToken::new(), &claims, 0, ConversionJob::new(&source, BlockChoice::Auto)).await;
        assert!(matches!(report.outcome, ConversionOutcome::Skipped(SkipReason::DuplicateOutput)));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_cancel_after_prepare_removes_temp() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("hero.png");
        write_image(&source, 30, 17);

        // A missing encoder would fail the job if it got as far as Encoding
        let ctx = context(&temp, "/nonexistent/encoder");
        let job = ConversionJob::new(&source, BlockChoice::Fixed(BlockSize::new(8, 8)));
        let (block, temp_path) = prepare(&source, &ctx.temp_dir, job.block, 1000).unwrap();
        assert_eq!(std::fs::read_dir(&ctx.temp_dir).unwrap().count(), 1);

        let cancel = CancelToken::new();
        cancel.cancel();

        let mut warnings = Vec::new();
        let output = paths::output_path_for(&source);
        let outcome = encode_prepared(&ctx, &cancel, &job, &output, block, temp_path, &mut warnings).await;

        assert!(matches!(outcome, ConversionOutcome::Cancelled));
        assert!(warnings.is_empty());
        assert_eq!(std::fs::read_dir(&ctx.temp_dir).unwrap().count(), 0);
        assert!(source.exists());
        assert!(!output.exists());
    }

    #[test]
    fn test_prepare_pads_and_writes_png() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("hero.png");
        write_image(&source, 30, 17);

        let choice = BlockChoice::Fixed(BlockSize::new(8, 6));
        let (block, temp_path) = prepare(&source, temp.path(), choice, 1000).unwrap();
        assert_eq!(block, BlockSize::new(8, 6));

        let written = image::open(&temp_path).unwrap();
        assert_eq!((written.width(), written.height()), (32, 18));
        assert!(paths::base_name(&temp_path).starts_with("hero-"));

        let path = temp_path.to_path_buf();
        temp_path.close().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("hero.png");
        write_image(&source, 8, 8);

        let ctx = context(&temp, "/nonexistent/encoder");
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = run_job(&ctx, &cancel, &OutputClaims::new(), 0, ConversionJob::new(&source, BlockChoice::Auto)).await;
        assert!(matches!(report.outcome, ConversionOutcome::Cancelled));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_output_exists_skips() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("hero.png");
        write_image(&source, 8, 8);
        std::fs::write(temp.path().join("hero.astc"), b"astc").unwrap();

        // Encoder does not exist: a skip must never reach it
        let ctx = context(&temp, "/nonexistent/encoder");
        let report = run_job(&ctx, &CancelToken::new(), &OutputClaims::new(), 0, ConversionJob::new(&source, BlockChoice::Auto)).await;
        assert!(matches!(report.outcome, ConversionOutcome::Skipped(SkipReason::OutputExists)));
        assert_eq!(report.log_line(), format!("Skipped (output exists): {}", source.display()));
    }

    #[tokio::test]
    async fn test_ignored_path_skips() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("images/freeplay/icons/bf.png");
        write_image(&source, 8, 8);

        let ctx = context(&temp, "/nonexistent/encoder");
        let report = run_job(&ctx, &CancelToken::new(), &OutputClaims::new(), 0, ConversionJob::new(&source, BlockChoice::Auto)).await;
        assert!(matches!(report.outcome, ConversionOutcome::Skipped(SkipReason::Ignored)));
    }

    #[tokio::test]
    async fn test_missing_and_empty_input() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, "/nonexistent/encoder");

        let missing = temp.path().join("missing.png");
        let report = run_job(&ctx, &CancelToken::new(), &OutputClaims::new(), 0, ConversionJob::new(&missing, BlockChoice::Auto)).await;
        assert!(matches!(report.outcome, ConversionOutcome::Failed(JobError::InvalidInput(_))));

        let empty = temp.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();
        let report = run_job(&ctx, &CancelToken::new(), &OutputClaims::new(), 1, ConversionJob::new(&empty, BlockChoice::Auto)).await;
        assert!(matches!(report.outcome, ConversionOutcome::Failed(JobError::InvalidInput(_))));
        assert_eq!(report.index, 1);
    }

    #[tokio::test]
    async fn test_undecodable_input() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("broken.png");
        std::fs::write(&source, b"definitely not a png").unwrap();

        let ctx = context(&temp, "/nonexistent/encoder");
        let report = run_job(&ctx, &CancelToken::new(), &OutputClaims::new(), 0, ConversionJob::new(&source, BlockChoice::Auto)).await;
        assert!(matches!(report.outcome, ConversionOutcome::Failed(JobError::DecodeError(_))));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_spawn_failure_cleans_temp() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("hero.png");
        write_image(&source, 8, 8);

        let ctx = context(&temp, "/nonexistent/encoder");
        let report = run_job(&ctx, &CancelToken::new(), &OutputClaims::new(), 0, ConversionJob::new(&source, BlockChoice::Auto)).await;
        assert!(matches!(report.outcome, ConversionOutcome::Failed(JobError::Spawn(_))));
        assert!(source.exists());
        assert_eq!(std::fs::read_dir(&ctx.temp_dir).unwrap().count(), 0);
    }
}
