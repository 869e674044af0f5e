//! Run configuration
//!
//! Everything a conversion run reads, passed in explicitly at run start.

use std::path::PathBuf;
use std::time::Duration;

use crate::encoder::{self, Quality, DEFAULT_TIMEOUT};
use crate::error::PreflightError;
use crate::scan::ScanOptions;
use crate::selection::SelectionThresholds;
use crate::textures::BlockChoice;

/// Upper bound on the default worker count
pub const MAX_DEFAULT_WORKERS: usize = 4;

/// Default pool size: available parallelism, capped
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_WORKERS)
}

/// Configuration for one conversion run
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Root folder to scan
    pub input_folder: PathBuf,

    /// Encoder executable (path or bare name on PATH)
    pub encoder_path: PathBuf,

    /// `auto` or a fixed footprint
    pub block: BlockChoice,

    /// Encoder effort level
    pub quality: Quality,

    /// Worker pool size
    pub workers: usize,

    /// Bound on a single encoder run
    pub timeout: Duration,

    /// Scanner rules (also re-checked by each job)
    pub scan: ScanOptions,

    /// Classifier thresholds
    pub thresholds: SelectionThresholds,
}

impl ConvertConfig {
    pub fn new(input_folder: impl Into<PathBuf>, encoder_path: impl Into<PathBuf>) -> Self {
        Self {
            input_folder: input_folder.into(),
            encoder_path: encoder_path.into(),
            block: BlockChoice::Auto,
            quality: Quality::Fast,
            workers: default_workers(),
            timeout: DEFAULT_TIMEOUT,
            scan: ScanOptions::default(),
            thresholds: SelectionThresholds::default(),
        }
    }

    /// Pre-flight checks: the input folder must be a directory and the
    /// encoder must resolve to an existing file. Returns the resolved encoder.
    pub fn validate(&self) -> Result<PathBuf, PreflightError> {
        if !self.input_folder.is_dir() {
            return Err(PreflightError::DirectoryNotFound(self.input_folder.clone()));
        }

        encoder::resolve_encoder(&self.encoder_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_workers_capped() {
        let workers = default_workers();
        assert!(workers >= 1);
        assert!(workers <= MAX_DEFAULT_WORKERS);
    }

    #[test]
    fn test_validate_missing_folder() {
        let encoder = NamedTempFile::new().unwrap();
        let config = ConvertConfig::new("/nonexistent/folder", encoder.path());
        assert!(matches!(config.validate(), Err(PreflightError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_validate_missing_encoder() {
        let temp = TempDir::new().unwrap();
        let config = ConvertConfig::new(temp.path(), temp.path().join("astcenc"));
        assert!(matches!(config.validate(), Err(PreflightError::EncoderNotFound(_))));

        // A directory is not an encoder
        let config = ConvertConfig::new(temp.path(), temp.path());
        assert!(matches!(config.validate(), Err(PreflightError::EncoderNotFound(_))));
    }

    #[test]
    fn test_validate_ok() {
        let temp = TempDir::new().unwrap();
        let encoder = NamedTempFile::new().unwrap();
        let config = ConvertConfig::new(temp.path(), encoder.path());
        assert_eq!(config.validate().unwrap(), encoder.path());
    }
}
