//! Conversion pipeline
//!
//! Builds one job per confirmed candidate and runs them on a bounded pool:
//! - `config`: run configuration and pre-flight checks
//! - `job`: the per-image worker (prepare, encode, clean up)
//! - `run`: the scheduler and shared run state
//! - `outcome`: outcomes, events and the run summary

mod config;
mod job;
mod outcome;
mod run;

#[cfg(test)]
mod test_support;

pub use config::{default_workers, ConvertConfig, MAX_DEFAULT_WORKERS};
pub use job::{run_job, CancelToken, ConversionJob, JobContext, OutputClaims};
pub use outcome::{ConversionEvent, ConversionOutcome, DeleteWarning, JobReport, RunSummary, SkipReason};
pub use run::{Pipeline, PipelineRun};
