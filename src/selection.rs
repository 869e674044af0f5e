//! Candidate classification and selection
//!
//! Each scanned image gets its pixel dimensions (header only) and a default
//! membership. The operator can then filter by name, flip single candidates,
//! or select/deselect everything in the current view before confirming.

use std::path::{Path, PathBuf};

use image::ImageReader;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::paths;

/// Tri-state membership of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Selected,
    Excluded,
    Unclassified,
}

/// Informational size tier (does not affect selection)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTier {
    /// Below the large threshold in both dimensions
    Pixel,
    /// At or above the large threshold in either dimension
    Large,
}

impl SizeTier {
    pub fn name(&self) -> &'static str {
        match self {
            SizeTier::Pixel => "pixel",
            SizeTier::Large => "large",
        }
    }
}

/// Which candidates a view shows (the All / Selected / Excluded tabs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionView {
    #[default]
    All,
    Selected,
    Excluded,
}

impl SelectionView {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(SelectionView::All),
            "selected" => Some(SelectionView::Selected),
            "excluded" => Some(SelectionView::Excluded),
            _ => None,
        }
    }

    fn admits(self, membership: Membership) -> bool {
        match self {
            SelectionView::All => true,
            SelectionView::Selected => membership == Membership::Selected,
            SelectionView::Excluded => membership == Membership::Excluded,
        }
    }
}

/// Classifier thresholds
#[derive(Debug, Clone, Copy)]
pub struct SelectionThresholds {
    /// Candidates strictly smaller in both dimensions start excluded
    pub min_select: (u32, u32),
    /// Informational tier boundary
    pub large_tier: (u32, u32),
}

impl Default for SelectionThresholds {
    fn default() -> Self {
        Self {
            min_select: (256, 256),
            large_tier: (10240, 10240),
        }
    }
}

/// One discovered image
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Size on disk at scan time
    pub file_size: u64,
    membership: Membership,
}

impl ImageCandidate {
    pub fn new(path: PathBuf, width: u32, height: u32, file_size: u64) -> Self {
        Self {
            path,
            width,
            height,
            file_size,
            membership: Membership::Unclassified,
        }
    }

    /// Read dimensions from the image header and the size from metadata
    pub fn probe(path: &Path) -> Option<Self> {
        let dims = ImageReader::open(path)
            .ok()?
            .with_guessed_format()
            .ok()?
            .into_dimensions();

        match dims {
            Ok((width, height)) => {
                let file_size = std::fs::metadata(path).ok()?.len();
                Some(Self::new(path.to_path_buf(), width, height, file_size))
            }
            Err(e) => {
                debug!("Dropping unreadable image {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn membership(&self) -> Membership {
        self.membership
    }

    pub fn is_selected(&self) -> bool {
        self.membership == Membership::Selected
    }

    pub fn is_excluded(&self) -> bool {
        self.membership == Membership::Excluded
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.membership = if selected {
            Membership::Selected
        } else {
            Membership::Excluded
        };
    }

    /// Flip selection; an unclassified candidate becomes selected
    pub fn toggle(&mut self) {
        let selected = self.is_selected();
        self.set_selected(!selected);
    }

    /// Apply the default rule: tiny in both dimensions means excluded
    pub fn apply_default(&mut self, thresholds: &SelectionThresholds) {
        let (min_w, min_h) = thresholds.min_select;
        self.set_selected(!(self.width < min_w && self.height < min_h));
    }

    pub fn tier(&self, thresholds: &SelectionThresholds) -> SizeTier {
        let (large_w, large_h) = thresholds.large_tier;
        if self.width < large_w && self.height < large_h {
            SizeTier::Pixel
        } else {
            SizeTier::Large
        }
    }

    pub fn file_name(&self) -> String {
        paths::base_name(&self.path)
    }
}

/// Counter line for the selection browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionCounts {
    pub total: usize,
    pub filtered: usize,
    pub selected: usize,
}

/// Ordered candidates plus the active name filter
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    candidates: Vec<ImageCandidate>,
    filter: String,
}

impl SelectionSet {
    /// Wrap candidates as-is (memberships untouched)
    pub fn from_candidates(candidates: Vec<ImageCandidate>) -> Self {
        Self {
            candidates,
            filter: String::new(),
        }
    }

    /// Probe every scanned path and apply the default selection rule.
    /// Unreadable images are dropped; scan order is preserved.
    pub fn classify(scanned: &[PathBuf], thresholds: &SelectionThresholds) -> Self {
        let mut candidates: Vec<ImageCandidate> = scanned
            .par_iter()
            .filter_map(|path| ImageCandidate::probe(path))
            .collect();

        for candidate in &mut candidates {
            candidate.apply_default(thresholds);
        }

        let set = Self::from_candidates(candidates);
        let counts = set.counts();
        info!(
            "Classified {} images: {} selected, {} excluded, {} unreadable",
            counts.total,
            counts.selected,
            counts.total - counts.selected,
            scanned.len() - counts.total
        );
        set
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[ImageCandidate] {
        &self.candidates
    }

    pub fn get(&self, index: usize) -> Option<&ImageCandidate> {
        self.candidates.get(index)
    }

    /// Active filter term
    pub fn filter_term(&self) -> &str {
        &self.filter
    }

    /// Change the active filter; never touches memberships
    pub fn set_filter(&mut self, term: &str) {
        self.filter = term.to_string();
    }

    /// Indices whose base name contains `term` (case-insensitive), in order.
    /// An empty term matches everything.
    pub fn filter(&self, term: &str) -> Vec<usize> {
        let needle = term.to_lowercase();
        self.candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| needle.is_empty() || c.file_name().to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect()
    }

    /// Active filter applied, then narrowed to one tab
    pub fn view(&self, view: SelectionView) -> Vec<usize> {
        self.filter(&self.filter)
            .into_iter()
            .filter(|&i| view.admits(self.candidates[i].membership))
            .collect()
    }

    /// Select every candidate in `view`; others keep their state
    pub fn select_all(&mut self, view: &[usize]) {
        self.set_many(view, true);
    }

    /// Exclude every candidate in `view`; others keep their state
    pub fn deselect_all(&mut self, view: &[usize]) {
        self.set_many(view, false);
    }

    fn set_many(&mut self, view: &[usize], selected: bool) {
        for &i in view {
            if let Some(candidate) = self.candidates.get_mut(i) {
                candidate.set_selected(selected);
            }
        }
    }

    /// Flip one candidate. Returns the new selected state.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let candidate = self.candidates.get_mut(index)?;
        candidate.toggle();
        Some(candidate.is_selected())
    }

    pub fn counts(&self) -> SelectionCounts {
        SelectionCounts {
            total: self.candidates.len(),
            filtered: self.filter(&self.filter).len(),
            selected: self.candidates.iter().filter(|c| c.is_selected()).count(),
        }
    }

    /// The confirmed work set
    pub fn selected(&self) -> Vec<ImageCandidate> {
        self.candidates.iter().filter(|c| c.is_selected()).cloned().collect()
    }
}
