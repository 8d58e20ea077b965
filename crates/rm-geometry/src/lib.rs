//! `rm-geometry` - boundary geometry for region-measure.
//!
//! This crate provides:
//! - Freeman chain codes and their extraction from 2-D label images
//! - Pixel-edge-midpoint polygons with simplification, smoothing, fitting
//! - Convex hulls (Melkman) with rotating-callipers Feret diameters
//! - A local-configuration surface-area estimator for 3-D label images

pub mod chain;
pub mod error;
pub mod extract;
pub mod hull;
pub mod polygon;
pub mod surface;

pub use chain::{ChainCode, Code, Connectivity, FeretValues, DELTAS4, DELTAS8};
pub use error::{GeometryError, Result};
pub use extract::{get_image_chain_codes, get_single_chain_code};
pub use hull::ConvexHull;
pub use polygon::{CircleParameters, EllipseParameters, Polygon, RadiusValues};
pub use surface::surface_area;
