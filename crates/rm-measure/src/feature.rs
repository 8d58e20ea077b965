use std::collections::HashMap;

use rm_geometry::{ChainCode, ConvexHull, Polygon};
use rm_image::{Image, ScanLine, Units};

use crate::error::Result;

/// Name and units of one scalar slot a feature produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueInformation {
    pub name: String,
    pub units: Units,
}

impl ValueInformation {
    pub fn new(name: impl Into<String>, units: Units) -> ValueInformation {
        ValueInformation {
            name: name.into(),
            units,
        }
    }
}

/// Maps object ids to result row indices. Pixels whose label is absent are
/// skipped by the line scanners, which is what allows measuring a subset of
/// the objects in an image.
pub type ObjectIdToIndexMap = HashMap<u32, usize>;

/// Contract shared by every feature kind.
///
/// `initialize` is called once per `measure` call, before any evaluation
/// pass, and publishes the feature's value-information array; per-object
/// scratch is allocated here and released in `cleanup`.
pub trait FeatureInfo {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Whether the feature reads the grey image. Features with this flag set
    /// are rejected when no grey image is supplied.
    fn needs_grey(&self) -> bool {
        false
    }

    fn initialize(
        &mut self,
        label: &Image,
        grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>>;

    fn cleanup(&mut self) {}
}

/// A feature fed by the single raster scan over the label (and grey) image.
pub trait LineBasedFeature: FeatureInfo {
    /// Consume one scan line. Objects not present in the map are skipped.
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap);

    /// Materialise the values of one object into its result span.
    fn finish(&mut self, object_index: usize, output: &mut [f64]);

    /// Optional post-pass: per-value multipliers applied to the whole
    /// column after every `finish`.
    fn scale_values(&self) -> Option<Vec<f64>> {
        None
    }
}

/// A feature that consumes the whole image and fills its column directly.
///
/// `output` is the dense per-object buffer for this feature,
/// `n_objects × n_values` row-major, in the order of `object_ids`.
pub trait ImageBasedFeature: FeatureInfo {
    fn measure(
        &mut self,
        label: &Image,
        grey: Option<&Image>,
        object_ids: &[u32],
        output: &mut [f64],
    );
}

/// A feature computed from one object's chain code.
pub trait ChainCodeBasedFeature: FeatureInfo {
    fn measure(&mut self, chain: &ChainCode, output: &mut [f64]);
}

/// A feature computed from one object's boundary polygon.
pub trait PolygonBasedFeature: FeatureInfo {
    fn measure(&mut self, polygon: &Polygon, output: &mut [f64]);
}

/// A feature computed from one object's convex hull.
pub trait ConvexHullBasedFeature: FeatureInfo {
    fn measure(&mut self, hull: &ConvexHull, output: &mut [f64]);
}

/// Read access to the already-computed values of one object's row, used by
/// composite features to read their dependencies.
pub struct DependencyValues<'a> {
    row: &'a [f64],
    spans: &'a HashMap<String, (usize, usize)>,
}

impl<'a> DependencyValues<'a> {
    pub(crate) fn new(row: &'a [f64], spans: &'a HashMap<String, (usize, usize)>) -> Self {
        DependencyValues { row, spans }
    }

    /// The value span of a dependency for the current object.
    ///
    /// # Panics
    /// Panics when `feature` was not declared; the planner guarantees every
    /// declared dependency is present.
    pub fn values(&self, feature: &str) -> &'a [f64] {
        let &(start, len) = self
            .spans
            .get(feature)
            .unwrap_or_else(|| panic!("dependency '{feature}' not declared"));
        &self.row[start..start + len]
    }
}

/// A feature whose value is a closed-form function of other features'
/// values for the same object.
///
/// `dependencies` is queried after `initialize`, so the dependency list may
/// depend on the image (dimensionality, calibration).
pub trait CompositeFeature: FeatureInfo {
    fn dependencies(&self) -> Vec<String>;

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]);
}

/// The five evaluation modalities plus composites, as a tagged variant; the
/// driver's pass dispatch is a match on this tag.
pub enum FeatureKind {
    Line(Box<dyn LineBasedFeature>),
    Image(Box<dyn ImageBasedFeature>),
    ChainCode(Box<dyn ChainCodeBasedFeature>),
    Polygon(Box<dyn PolygonBasedFeature>),
    ConvexHull(Box<dyn ConvexHullBasedFeature>),
    Composite(Box<dyn CompositeFeature>),
}

impl FeatureKind {
    pub fn info(&self) -> &dyn FeatureInfo {
        match self {
            FeatureKind::Line(f) => f.as_ref(),
            FeatureKind::Image(f) => f.as_ref(),
            FeatureKind::ChainCode(f) => f.as_ref(),
            FeatureKind::Polygon(f) => f.as_ref(),
            FeatureKind::ConvexHull(f) => f.as_ref(),
            FeatureKind::Composite(f) => f.as_ref(),
        }
    }

    pub fn info_mut(&mut self) -> &mut dyn FeatureInfo {
        match self {
            FeatureKind::Line(f) => f.as_mut(),
            FeatureKind::Image(f) => f.as_mut(),
            FeatureKind::ChainCode(f) => f.as_mut(),
            FeatureKind::Polygon(f) => f.as_mut(),
            FeatureKind::ConvexHull(f) => f.as_mut(),
            FeatureKind::Composite(f) => f.as_mut(),
        }
    }

    /// True for the kinds evaluated in the chain-code/polygon/convex-hull
    /// pass.
    pub fn is_geometric(&self) -> bool {
        matches!(
            self,
            FeatureKind::ChainCode(_) | FeatureKind::Polygon(_) | FeatureKind::ConvexHull(_)
        )
    }
}
