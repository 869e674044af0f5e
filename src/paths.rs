//! Path helpers shared by the scanner and the conversion worker
//!
//! Source folders often come from Windows machines, so ignore rules are
//! matched against a normalized form:
//! - Converting `\` to `/`
//! - Case-folding (`Images\Freeplay` and `images/freeplay` are the same rule)
//! - Deriving the `.astc` output path next to each source image

use std::path::{Path, PathBuf};

/// Extensions the scanner accepts (compared lowercase, without the dot)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tga", "tif", "tiff", "webp"];

/// Extension of the encoder's output artifact
pub const OUTPUT_EXTENSION: &str = "astc";

/// Convert Windows path separators to forward slashes
/// `images\freeplay\icons` -> `images/freeplay/icons`
pub fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Normalize a path for substring rules (lowercase, forward slashes)
pub fn normalize_for_lookup(path: &str) -> String {
    to_forward_slashes(&path.to_lowercase())
}

/// Normalize a `Path` for substring rules
pub fn normalize_path(path: &Path) -> String {
    normalize_for_lookup(&path.to_string_lossy())
}

/// Check whether `path` contains any of the (already normalized) rules
pub fn matches_any_rule(path: &Path, rules: &[String]) -> bool {
    if rules.is_empty() {
        return false;
    }
    let normalized = normalize_path(path);
    rules.iter().any(|rule| !rule.is_empty() && normalized.contains(rule.as_str()))
}

/// Get the filename from a path (handles both / and \)
pub fn file_name(path: &str) -> &str {
    path.rfind(['\\', '/'])
        .map(|idx| &path[idx + 1..])
        .unwrap_or(path)
}

/// Base name of a `Path` as a lossy string
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name(&path.to_string_lossy()).to_string())
}

/// Check whether a file has one of the supported image extensions
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Output artifact for a source image: same path, `.astc` extension
/// `textures/hero.png` -> `textures/hero.astc`
pub fn output_path_for(source: &Path) -> PathBuf {
    source.with_extension(OUTPUT_EXTENSION)
}

/// Directory base name (lowercase) of a file's parent
pub fn parent_dir_name(path: &Path) -> Option<String> {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_lowercase())
}
