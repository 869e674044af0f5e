//! astc-converter - batch ASTC texture conversion
//!
//! Scans a folder of raster images, lets the operator confirm a selection,
//! and drives an external astcenc binary over it on a bounded worker pool.

pub mod encoder;
pub mod error;
pub mod paths;
pub mod pipeline;
pub mod scan;
pub mod selection;
pub mod settings;
pub mod textures;
