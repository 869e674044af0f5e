//! Block-grid padding
//!
//! The encoder needs no padding itself, but padding up front keeps the
//! partial edge blocks transparent instead of smeared edge texels.

use image::{imageops, DynamicImage, RgbaImage};

use super::block::BlockSize;
use crate::error::JobError;

/// Block-aligned dimensions as image dimensions; fails when they no longer fit `u32`
fn grid_dims(block: BlockSize, w: u32, h: u32) -> Result<(u32, u32), JobError> {
    let (nw, nh) = block.aligned_dims(w, h);
    match (u32::try_from(nw), u32::try_from(nh)) {
        (Ok(nw), Ok(nh)) => Ok((nw, nh)),
        _ => Err(JobError::InvalidInput(format!(
            "{}x{} cannot be padded to {} blocks",
            w, h, block
        ))),
    }
}

/// Pad an RGBA image so both dimensions are multiples of the block footprint.
///
/// Already-aligned images are returned as-is (moved, not copied). Otherwise a
/// transparent canvas is allocated and the source is copied to its top-left
/// corner, so padding only ever grows the right and bottom edges.
pub fn pad_to_block_grid(image: RgbaImage, block: BlockSize) -> Result<RgbaImage, JobError> {
    let (w, h) = image.dimensions();
    let (nw, nh) = grid_dims(block, w, h)?;
    if (nw, nh) == (w, h) {
        return Ok(image);
    }

    let mut padded = RgbaImage::new(nw, nh);
    imageops::replace(&mut padded, &image, 0, 0);
    Ok(padded)
}

/// Force a decoded image to four channels, then pad it
pub fn prepare_rgba(image: DynamicImage, block: BlockSize) -> Result<RgbaImage, JobError> {
    pad_to_block_grid(image.into_rgba8(), block)
}
