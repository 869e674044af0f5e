//! Error types
//!
//! Pre-flight and scan errors abort a run before any job is submitted.
//! `JobError` never escapes a job: the worker turns it into a failed outcome.

use std::path::PathBuf;
use std::time::Duration;

/// Scanner errors
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Input folder not found or not a directory: {0}")]
    DirectoryNotFound(PathBuf),
}

/// Checks run before any job is submitted
#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error("Input folder not found or not a directory: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Encoder executable not found: {0}")]
    EncoderNotFound(PathBuf),

    #[error("Failed to create temporary directory: {0}")]
    TempDir(String),
}

impl From<ScanError> for PreflightError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::DirectoryNotFound(path) => PreflightError::DirectoryNotFound(path),
        }
    }
}

/// Block size / quality token parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid block size '{0}' (expected 'auto' or one of 4x4 .. 12x12)")]
    BlockSize(String),

    #[error("Invalid quality '{0}' (expected -fast, -medium, -thorough or -exhaustive)")]
    Quality(String),
}

/// Per-job failures, caught at the job boundary
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Failed to write intermediate file: {0}")]
    TempWrite(String),

    #[error("Failed to start encoder: {0}")]
    Spawn(String),

    #[error("Encoder timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Encoder error: {0}")]
    EncoderError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_messages() {
        let err = JobError::EncoderError("bad block size".into());
        assert_eq!(err.to_string(), "Encoder error: bad block size");

        let err = JobError::Timeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "Encoder timed out after 300s");
    }

    #[test]
    fn test_scan_error_converts_to_preflight() {
        let err: PreflightError = ScanError::DirectoryNotFound(PathBuf::from("/nope")).into();
        assert!(matches!(err, PreflightError::DirectoryNotFound(p) if p == PathBuf::from("/nope")));
    }
}
