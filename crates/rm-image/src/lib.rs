//! `rm-image` - n-dimensional image container and scan framework for region-measure.
//!
//! This crate provides:
//! - A dense row-major `Image` type with typed storage and tensor elements
//! - Physical units, quantities, and per-dimension pixel sizes
//! - A single-threaded raster scan framework feeding line buffers
//! - Object-label enumeration over label images

pub mod dtype;
pub mod error;
pub mod image;
pub mod labels;
pub mod scan;
pub mod storage;
pub mod units;

// Re-export primary types at the crate root for convenience.
pub use dtype::DType;
pub use error::{ImageError, Result};
pub use image::Image;
pub use labels::get_object_labels;
pub use scan::{scan_lines, ScanLine};
pub use storage::Storage;
pub use units::{PhysicalQuantity, PixelSize, Units};
