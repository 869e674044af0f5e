//! Directory scanner
//!
//! Walks an input folder and yields every supported image, minus the paths
//! that match an ignore rule or sit directly inside an excluded folder.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::paths;

/// Default ignore rule (freeplay icon atlases)
pub const DEFAULT_IGNORE_PATH: &str = "images/freeplay/icons";

/// Default excluded folder names (pixel-art stages)
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &["pixel", "week6"];

/// Scanner rules
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Substrings matched against the normalized path
    pub ignore_substrings: Vec<String>,
    /// Folder base names whose direct children are skipped
    pub excluded_dirs: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            ignore_substrings: vec![DEFAULT_IGNORE_PATH.to_string()],
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ScanOptions {
    /// Rules in normalized form (lowercase, forward slashes)
    pub fn normalized(&self) -> ScanOptions {
        ScanOptions {
            ignore_substrings: self
                .ignore_substrings
                .iter()
                .map(|s| paths::normalize_for_lookup(s))
                .filter(|s| !s.is_empty())
                .collect(),
            excluded_dirs: self.excluded_dirs.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Check whether a path hits an ignore rule
    pub fn is_ignored(&self, path: &Path) -> bool {
        paths::matches_any_rule(path, &self.normalized().ignore_substrings)
    }

    fn in_excluded_dir(&self, path: &Path) -> bool {
        match paths::parent_dir_name(path) {
            Some(dir) => self.excluded_dirs.iter().any(|d| *d == dir),
            None => false,
        }
    }
}

/// Scan `root` for convertible images
///
/// Returns an empty list (not an error) when nothing matches. Results are
/// sorted by path so repeated scans list candidates in the same order.
pub fn scan_images(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::DirectoryNotFound(root.to_path_buf()));
    }

    let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    let rules = options.normalized();

    let mut found = Vec::new();
    let mut ignored = 0usize;

    for entry in WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !paths::is_supported_image(path) {
            continue;
        }

        if rules.in_excluded_dir(path) || paths::matches_any_rule(path, &rules.ignore_substrings) {
            debug!("Ignored: {}", path.display());
            ignored += 1;
            continue;
        }

        found.push(path.to_path_buf());
    }

    info!(
        "Scanned {}: {} images, {} ignored",
        root.display(),
        found.len(),
        ignored
    );

    Ok(found)
}
