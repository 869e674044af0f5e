//! ASTC texture preparation
//!
//! Block footprint selection and block-grid padding. The compression itself
//! is done by the external encoder (see `crate::encoder`).

mod block;
mod padding;

pub use block::{
    choose_block, choose_block_min_padding, BlockChoice, BlockSize, BLOCK_BYTES, BLOCK_SIZES,
};
pub use padding::{pad_to_block_grid, prepare_rgba};
