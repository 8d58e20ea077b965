//! The built-in feature catalogue.

pub mod grey_moments;
pub mod intensity;
pub mod moments;
pub mod shape;
pub mod size;

use rm_image::{Image, ScanLine, Units};

use crate::feature::{FeatureKind, ObjectIdToIndexMap};
use crate::registry::FeatureRegistry;

/// Per-axis coordinate scale, axis order x first (x is the fastest-varying
/// image dimension).
///
/// Physically calibrated images with dimensionally consistent pitches get
/// their per-axis magnitudes expressed in the x axis' units; anything else
/// falls back to pixel units with unit factors.
pub(crate) struct SpatialScale {
    pub factors: Vec<f64>,
    pub units: Units,
}

pub(crate) fn spatial_scale(label: &Image) -> SpatialScale {
    let ps = label.pixel_size();
    let ndim = label.dimensionality();
    let pitches: Vec<_> = (0..ndim).map(|axis| ps.get(ndim - 1 - axis)).collect();
    let reference = pitches[0].units;
    let physical = ps.is_physical()
        && pitches.iter().all(|p| p.units.same_dimension(&reference));
    if !physical {
        return SpatialScale {
            factors: vec![1.0; ndim],
            units: Units::pixel(),
        };
    }
    let (ref_factor, _) = reference.strip_prefix();
    let factors = pitches
        .iter()
        .map(|p| {
            let (f, _) = p.units.strip_prefix();
            p.magnitude * f / ref_factor
        })
        .collect();
    SpatialScale {
        factors,
        units: reference,
    }
}

/// Scalar scale for 2-D boundary features: the isotropic pixel pitch when
/// the image is calibrated isotropic, else one pixel.
pub(crate) fn isotropic_scale(label: &Image) -> (f64, Units) {
    let ps = label.pixel_size();
    if ps.is_isotropic() && ps.is_physical() {
        let p = ps.get(0);
        (p.magnitude, p.units)
    } else {
        (1.0, Units::pixel())
    }
}

pub(crate) fn axis_name(axis: usize) -> String {
    match axis {
        0 => "x".to_string(),
        1 => "y".to_string(),
        2 => "z".to_string(),
        k => format!("a{k}"),
    }
}

/// Visit the pixels of a scan line that belong to a requested object,
/// resolving the id → row index map once per label transition.
pub(crate) fn for_each_pixel(
    line: &ScanLine<'_>,
    objects: &ObjectIdToIndexMap,
    mut visit: impl FnMut(usize, usize),
) {
    let mut prev_label = 0u32;
    let mut cached: Option<usize> = None;
    for (i, &label) in line.labels.iter().enumerate() {
        if label != prev_label {
            cached = objects.get(&label).copied();
            prev_label = label;
        }
        if let Some(row) = cached {
            visit(row, i);
        }
    }
}

/// Coordinates of pixel `i` of a scan line, axis order x first, scaled by
/// the per-axis factors.
pub(crate) fn scaled_position(
    line: &ScanLine<'_>,
    i: usize,
    factors: &[f64],
    out: &mut [f64],
) {
    let ndim = line.start.len();
    out[0] = (line.start[line.dim] + i) as f64 * factors[0];
    for (axis, value) in out.iter_mut().enumerate().skip(1) {
        *value = line.start[ndim - 1 - axis] as f64 * factors[axis];
    }
}

/// Populate a registry with the built-in catalogue.
pub fn register_defaults(registry: &mut FeatureRegistry) {
    registry.register(|| FeatureKind::Line(Box::new(size::Size::default())));
    registry.register(|| FeatureKind::Line(Box::new(size::Minimum::default())));
    registry.register(|| FeatureKind::Line(Box::new(size::Maximum::default())));
    registry.register(|| FeatureKind::Line(Box::new(size::CartesianBox::default())));
    registry.register(|| FeatureKind::ChainCode(Box::new(size::Perimeter::default())));
    registry.register(|| FeatureKind::Image(Box::new(size::SurfaceArea::default())));
    registry.register(|| FeatureKind::ChainCode(Box::new(size::Feret::default())));
    registry.register(|| FeatureKind::Polygon(Box::new(size::SolidArea::default())));
    registry.register(|| FeatureKind::ConvexHull(Box::new(size::ConvexArea::default())));
    registry.register(|| FeatureKind::ConvexHull(Box::new(size::ConvexPerimeter::default())));

    registry.register(|| FeatureKind::Composite(Box::new(shape::AspectRatioFeret::default())));
    registry.register(|| FeatureKind::Composite(Box::new(shape::P2A::default())));
    registry.register(|| FeatureKind::Composite(Box::new(shape::Roundness::default())));
    registry.register(|| FeatureKind::Composite(Box::new(shape::Circularity::default())));
    registry.register(|| FeatureKind::Composite(Box::new(shape::Convexity::default())));
    registry.register(|| FeatureKind::Composite(Box::new(shape::PodczeckShapes::default())));
    registry.register(|| FeatureKind::Polygon(Box::new(shape::EllipseVariance::default())));
    registry.register(|| FeatureKind::ChainCode(Box::new(shape::BendingEnergy::default())));
    registry.register(|| FeatureKind::ChainCode(Box::new(shape::Radius::default())));

    registry.register(|| FeatureKind::Line(Box::new(moments::Center::default())));
    registry.register(|| FeatureKind::Line(Box::new(moments::Mu::default())));
    registry.register(|| FeatureKind::Composite(Box::new(moments::Inertia::default())));
    registry.register(|| FeatureKind::Composite(Box::new(moments::MajorAxes::default())));
    registry.register(|| FeatureKind::Composite(Box::new(moments::DimensionsCube::default())));
    registry
        .register(|| FeatureKind::Composite(Box::new(moments::DimensionsEllipsoid::default())));

    registry.register(|| FeatureKind::Line(Box::new(grey_moments::Gravity::default())));
    registry.register(|| FeatureKind::Line(Box::new(grey_moments::GreyMu::default())));
    registry.register(|| FeatureKind::Composite(Box::new(grey_moments::GreyInertia::default())));
    registry
        .register(|| FeatureKind::Composite(Box::new(grey_moments::GreyMajorAxes::default())));
    registry.register(|| {
        FeatureKind::Composite(Box::new(grey_moments::GreyDimensionsCube::default()))
    });
    registry.register(|| {
        FeatureKind::Composite(Box::new(grey_moments::GreyDimensionsEllipsoid::default()))
    });

    registry.register(|| FeatureKind::Line(Box::new(intensity::Mass::default())));
    registry.register(|| FeatureKind::Line(Box::new(intensity::Mean::default())));
    registry.register(|| FeatureKind::Line(Box::new(intensity::StandardDeviation::default())));
    registry.register(|| FeatureKind::Line(Box::new(intensity::Statistics::default())));
    registry
        .register(|| FeatureKind::Line(Box::new(intensity::DirectionalStatistics::default())));
    registry.register(|| FeatureKind::Line(Box::new(intensity::MaxVal::default())));
    registry.register(|| FeatureKind::Line(Box::new(intensity::MinVal::default())));
    registry.register(|| FeatureKind::Line(Box::new(intensity::MaxPos::default())));
    registry.register(|| FeatureKind::Line(Box::new(intensity::MinPos::default())));
}
