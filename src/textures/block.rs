//! ASTC block footprints and the block-size advisor
//!
//! Every ASTC block is 16 bytes regardless of footprint, so the footprint
//! alone decides the bitrate: 4x4 is 8 bpp, 12x12 is 0.89 bpp.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Compressed payload of a single ASTC block
pub const BLOCK_BYTES: u64 = 16;

/// Block footprint (texels per block)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockSize {
    pub width: u32,
    pub height: u32,
}

impl BlockSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of blocks needed to cover `w`x`h` texels
    pub fn block_count(self, w: u32, h: u32) -> u64 {
        w.div_ceil(self.width) as u64 * h.div_ceil(self.height) as u64
    }

    /// Compressed size of a `w`x`h` image at this footprint (no header)
    pub fn estimated_bytes(self, w: u32, h: u32) -> u64 {
        self.block_count(w, h).saturating_mul(BLOCK_BYTES)
    }

    /// Smallest block-aligned dimensions covering `w`x`h`.
    /// Widened to `u64`: aligning a header near `u32::MAX` can overflow `u32`.
    pub fn aligned_dims(self, w: u32, h: u32) -> (u64, u64) {
        (
            w.div_ceil(self.width) as u64 * self.width as u64,
            h.div_ceil(self.height) as u64 * self.height as u64,
        )
    }

    /// Token passed to the encoder (`8x8`)
    pub fn token(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for BlockSize {
    type Err = ParseError;

    /// Parse `"{bx}x{by}"`; only the supported 2D footprints are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseError::BlockSize(s.to_string());
        let lower = s.trim().to_lowercase();
        let (w, h) = lower.split_once('x').ok_or_else(err)?;
        let block = BlockSize::new(w.trim().parse().map_err(|_| err())?, h.trim().parse().map_err(|_| err())?);

        if BLOCK_SIZES.contains(&block) {
            Ok(block)
        } else {
            Err(err())
        }
    }
}

/// Supported 2D footprints, in tie-break order
pub const BLOCK_SIZES: [BlockSize; 14] = [
    BlockSize::new(4, 4),
    BlockSize::new(5, 4),
    BlockSize::new(5, 5),
    BlockSize::new(6, 5),
    BlockSize::new(6, 6),
    BlockSize::new(8, 5),
    BlockSize::new(8, 6),
    BlockSize::new(8, 8),
    BlockSize::new(10, 5),
    BlockSize::new(10, 6),
    BlockSize::new(10, 8),
    BlockSize::new(10, 10),
    BlockSize::new(12, 10),
    BlockSize::new(12, 12),
];

/// Operator's block size setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockChoice {
    /// Let the advisor pick per image
    #[default]
    Auto,
    /// Use this footprint for every image
    Fixed(BlockSize),
}

impl BlockChoice {
    /// Resolve the footprint for one image
    pub fn resolve(self, width: u32, height: u32, file_bytes: u64) -> BlockSize {
        match self {
            BlockChoice::Auto => choose_block(width, height, file_bytes),
            BlockChoice::Fixed(block) => block,
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, BlockChoice::Auto)
    }
}

impl fmt::Display for BlockChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockChoice::Auto => write!(f, "auto"),
            BlockChoice::Fixed(block) => write!(f, "{}", block),
        }
    }
}

impl FromStr for BlockChoice {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(BlockChoice::Auto)
        } else {
            s.parse().map(BlockChoice::Fixed)
        }
    }
}

/// Auto mode: pick the footprint whose compressed size is closest to the
/// source file's size on disk. Ties keep the earlier entry of `BLOCK_SIZES`.
pub fn choose_block(width: u32, height: u32, file_bytes: u64) -> BlockSize {
    let mut best = BLOCK_SIZES[0];
    let mut best_diff = u64::MAX;

    for block in BLOCK_SIZES {
        let diff = block.estimated_bytes(width, height).abs_diff(file_bytes);
        if diff < best_diff {
            best_diff = diff;
            best = block;
        }
    }

    best
}

/// Padding-minimizing alternative: pick the footprint that wastes the fewest
/// texels on alignment. Not used by the pipeline; `advise` reports it next to
/// the size-matching choice for comparison.
pub fn choose_block_min_padding(width: u32, height: u32) -> BlockSize {
    let mut best = BLOCK_SIZES[0];
    let mut best_pad = u64::MAX;

    for block in BLOCK_SIZES {
        let (aw, ah) = block.aligned_dims(width, height);
        let pad = (aw - width as u64) * block.height as u64 + (ah - height as u64) * block.width as u64;
        if pad < best_pad {
            best_pad = pad;
            best = block;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sizes_table() {
        assert_eq!(BLOCK_SIZES.len(), 14);
        assert_eq!(BLOCK_SIZES[0], BlockSize::new(4, 4));
        assert_eq!(BLOCK_SIZES[13], BlockSize::new(12, 12));
    }

    #[test]
    fn test_parse_block_size() {
        assert_eq!("8x8".parse::<BlockSize>(), Ok(BlockSize::new(8, 8)));
        assert_eq!(" 10X6 ".parse::<BlockSize>(), Ok(BlockSize::new(10, 6)));
        assert!("7x7".parse::<BlockSize>().is_err());
        assert!("8".parse::<BlockSize>().is_err());
        assert!("axb".parse::<BlockSize>().is_err());
    }

    #[test]
    fn test_parse_block_choice() {
        assert_eq!("auto".parse::<BlockChoice>(), Ok(BlockChoice::Auto));
        assert_eq!("Auto".parse::<BlockChoice>(), Ok(BlockChoice::Auto));
        assert_eq!("6x5".parse::<BlockChoice>(), Ok(BlockChoice::Fixed(BlockSize::new(6, 5))));
        assert_eq!(BlockChoice::Fixed(BlockSize::new(12, 10)).to_string(), "12x10");
        assert_eq!(BlockChoice::Auto.to_string(), "auto");
    }

    #[test]
    fn test_estimated_bytes() {
        // 300/8 -> 38 blocks, 38*38*16
        assert_eq!(BlockSize::new(8, 8).estimated_bytes(300, 300), 38 * 38 * 16);
        assert_eq!(BlockSize::new(4, 4).estimated_bytes(4, 4), 16);
        assert_eq!(BlockSize::new(12, 12).aligned_dims(13, 1), (24, 12));
    }

    #[test]
    fn test_choose_block_deterministic() {
        let first = choose_block(300, 300, 20_000);
        for _ in 0..10 {
            assert_eq!(choose_block(300, 300, 20_000), first);
        }
        // 10x10 -> 30*30*16 = 14400 (diff 5600); 8x8 -> 23104 (diff 3104);
        // 10x8 -> 30*38*16 = 18240 (diff 1760); 8x10 is not a footprint
        assert_eq!(first, BlockSize::new(10, 8));
    }

    #[test]
    fn test_choose_block_extremes() {
        // Huge source file: densest footprint wins
        assert_eq!(choose_block(64, 64, u64::MAX), BlockSize::new(4, 4));
        // Empty source file: sparsest footprint wins
        assert_eq!(choose_block(1024, 1024, 0), BlockSize::new(12, 12));
    }

    #[test]
    fn test_huge_header_dims_do_not_overflow() {
        let max = u32::MAX;
        assert_eq!(BlockSize::new(12, 12).aligned_dims(max, max), (4_294_967_304, 4_294_967_304));
        assert_eq!(BlockSize::new(4, 4).estimated_bytes(max, max), u64::MAX);

        // u32::MAX = 3 * 5 * 17 * 257 * 65537: 5x5 aligns exactly
        assert_eq!(choose_block_min_padding(max, max), BlockSize::new(5, 5));
        assert_eq!(choose_block(max, max, u64::MAX), BlockSize::new(4, 4));
    }

    #[test]
    fn test_choose_block_tie_keeps_first() {
        // A 1x1 image is one block at every footprint: all diffs tie
        assert_eq!(choose_block(1, 1, 0), BlockSize::new(4, 4));
    }

    #[test]
    fn test_block_choice_resolve() {
        let fixed = BlockChoice::Fixed(BlockSize::new(6, 6));
        assert_eq!(fixed.resolve(300, 300, 20_000), BlockSize::new(6, 6));
        assert_eq!(BlockChoice::Auto.resolve(300, 300, 20_000), choose_block(300, 300, 20_000));
    }

    #[test]
    fn test_choose_block_min_padding() {
        // 4x4 divides 64x64 exactly: zero padding, first in order
        assert_eq!(choose_block_min_padding(64, 64), BlockSize::new(4, 4));
        // 100x100: 4x4 and 5x5 both align; 4x4 comes first
        assert_eq!(choose_block_min_padding(100, 100), BlockSize::new(4, 4));
        // 30x30: 4x4 pads 2+2 -> 2*4+2*4 = 16; 5x5 pads 0
        assert_eq!(choose_block_min_padding(30, 30), BlockSize::new(5, 5));
    }
}
