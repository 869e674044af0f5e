//! Job outcomes, run events and the run summary

use std::fmt;
use std::path::PathBuf;

use crate::error::JobError;
use crate::paths;
use crate::textures::BlockSize;

/// Why a job was skipped without encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Path matches an ignore rule
    Ignored,
    /// `.astc` output already present
    OutputExists,
    /// Another source of this run maps to the same `.astc` output
    DuplicateOutput,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Ignored => f.write_str("matches ignore rule"),
            SkipReason::OutputExists => f.write_str("output exists"),
            SkipReason::DuplicateOutput => f.write_str("output shared with another image"),
        }
    }
}

/// Terminal state of one job
#[derive(Debug)]
pub enum ConversionOutcome {
    Converted(BlockSize),
    Skipped(SkipReason),
    Cancelled,
    Failed(JobError),
}

impl ConversionOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, ConversionOutcome::Converted(_))
    }
}

/// A file that could not be removed (non-fatal)
#[derive(Debug, Clone)]
pub struct DeleteWarning {
    pub path: PathBuf,
    pub error: String,
}

impl fmt::Display for DeleteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not delete {}: {}", self.path.display(), self.error)
    }
}

/// Everything the consumer learns about a finished job
#[derive(Debug)]
pub struct JobReport {
    /// Position of the job in submission order
    pub index: usize,
    pub path: PathBuf,
    pub outcome: ConversionOutcome,
    pub warnings: Vec<DeleteWarning>,
}

impl JobReport {
    /// The single human-readable line for this outcome
    pub fn log_line(&self) -> String {
        match &self.outcome {
            ConversionOutcome::Converted(block) => {
                format!("Converted ({}): {}", block, self.path.display())
            }
            ConversionOutcome::Skipped(reason) => {
                format!("Skipped ({}): {}", reason, self.path.display())
            }
            ConversionOutcome::Cancelled => format!("Cancelled: {}", self.path.display()),
            ConversionOutcome::Failed(err) => {
                format!("ERROR in {}: {}", paths::base_name(&self.path), err)
            }
        }
    }
}

/// Events emitted by a running pipeline, drained by one consumer
#[derive(Debug)]
pub enum ConversionEvent {
    /// One job reached a terminal state
    Outcome {
        report: JobReport,
        completed: usize,
        total: usize,
    },
    /// Emitted exactly once, after the last outcome
    Finished(RunSummary),
}

/// Aggregated counts for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub converted: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub failed: usize,
    pub delete_warnings: usize,
    /// Operator cancelled the run
    pub was_cancelled: bool,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.converted + self.skipped + self.cancelled + self.failed
    }

    /// Final summary line: completed vs cancelled by operator
    pub fn summary_line(&self) -> String {
        let head = if self.was_cancelled {
            "Conversion cancelled by operator"
        } else {
            "Conversion completed"
        };
        let mut line = format!(
            "{}: {} converted, {} skipped, {} cancelled, {} failed",
            head, self.converted, self.skipped, self.cancelled, self.failed
        );
        if self.delete_warnings > 0 {
            line.push_str(&format!(" ({} delete warnings)", self.delete_warnings));
        }
        line
    }
}
