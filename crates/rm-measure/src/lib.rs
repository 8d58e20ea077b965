//! `rm-measure` - region measurement engine for n-dimensional label images.
//!
//! This crate provides:
//! - A polymorphic feature taxonomy (line, image, chain-code, polygon,
//!   convex-hull, and composite features) and a name registry
//! - A dependency-resolving planner and single-scan evaluation driver
//! - The dense `Measurement` result container with row/column views,
//!   outer-join merge, table formatting, and CSV export
//! - Label maps for selecting objects by feature value
//! - The built-in catalogue of ~40 features

pub mod driver;
pub mod error;
pub mod export;
pub mod feature;
pub mod features;
pub mod labelmap;
pub mod measurement;
pub mod registry;
pub mod remap;
pub mod stats;

#[cfg(test)]
mod tests;

pub use rm_geometry::Connectivity;

pub use driver::MeasurementTool;
pub use error::{MeasureError, Result};
pub use feature::{
    ChainCodeBasedFeature, CompositeFeature, ConvexHullBasedFeature, DependencyValues,
    FeatureInfo, FeatureKind, ImageBasedFeature, LineBasedFeature, ObjectIdToIndexMap,
    ValueInformation,
};
pub use labelmap::LabelMap;
pub use measurement::{FeatureColumn, FeatureInformation, Measurement, ObjectRow};
pub use registry::FeatureRegistry;
pub use remap::object_to_measurement;
pub use stats::{
    maximum, maximum_and_minimum, mean, minimum, object_maximum, object_minimum, percentile,
    sample_statistics,
};
