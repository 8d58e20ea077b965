use rm_geometry::{ChainCode, Polygon};
use rm_image::{Image, Units};

use super::isotropic_scale;
use super::size::require_dimensionality;
use crate::error::Result;
use crate::feature::{
    ChainCodeBasedFeature, CompositeFeature, DependencyValues, FeatureInfo,
    PolygonBasedFeature, ValueInformation,
};

/// Ratio of the maximum to the minimum Feret diameter.
#[derive(Default)]
pub struct AspectRatioFeret;

impl FeatureInfo for AspectRatioFeret {
    fn name(&self) -> &'static str {
        "AspectRatioFeret"
    }

    fn description(&self) -> &'static str {
        "Maximum over minimum Feret diameter"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("AspectRatioFeret", label, 2)?;
        Ok(vec![ValueInformation::new("", Units::none())])
    }
}

impl CompositeFeature for AspectRatioFeret {
    fn dependencies(&self) -> Vec<String> {
        vec!["Feret".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        let feret = dependencies.values("Feret");
        output[0] = if feret[1] == 0.0 {
            f64::NAN
        } else {
            feret[0] / feret[1]
        };
    }
}

/// Circularity `P²/(4πA)` in 2-D, `S^1.5/(6√π V)` in 3-D.
#[derive(Default)]
pub struct P2A {
    three_d: bool,
}

impl FeatureInfo for P2A {
    fn name(&self) -> &'static str {
        "P2A"
    }

    fn description(&self) -> &'static str {
        "Perimeter-to-area circularity measure"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        match label.dimensionality() {
            2 => self.three_d = false,
            3 => self.three_d = true,
            _ => {
                return Err(crate::error::MeasureError::InvalidInput(
                    "P2A requires a 2- or 3-dimensional label image".to_string(),
                ))
            }
        }
        Ok(vec![ValueInformation::new("", Units::none())])
    }
}

impl CompositeFeature for P2A {
    fn dependencies(&self) -> Vec<String> {
        if self.three_d {
            vec!["SurfaceArea".to_string(), "Size".to_string()]
        } else {
            vec!["Perimeter".to_string(), "Size".to_string()]
        }
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        let size = dependencies.values("Size")[0];
        output[0] = if self.three_d {
            let s = dependencies.values("SurfaceArea")[0];
            if size == 0.0 {
                f64::NAN
            } else {
                s.powf(1.5) / (6.0 * std::f64::consts::PI.sqrt() * size)
            }
        } else {
            let p = dependencies.values("Perimeter")[0];
            if size == 0.0 {
                f64::NAN
            } else {
                p * p / (4.0 * std::f64::consts::PI * size)
            }
        };
    }
}

/// `4πA/P²`, clamped to [0, 1].
#[derive(Default)]
pub struct Roundness;

impl FeatureInfo for Roundness {
    fn name(&self) -> &'static str {
        "Roundness"
    }

    fn description(&self) -> &'static str {
        "Area-to-perimeter roundness, 1 for a disk"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("Roundness", label, 2)?;
        Ok(vec![ValueInformation::new("", Units::none())])
    }
}

impl CompositeFeature for Roundness {
    fn dependencies(&self) -> Vec<String> {
        vec!["Size".to_string(), "Perimeter".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        let size = dependencies.values("Size")[0];
        let p = dependencies.values("Perimeter")[0];
        output[0] = if p == 0.0 {
            f64::NAN
        } else {
            (4.0 * std::f64::consts::PI * size / (p * p)).clamp(0.0, 1.0)
        };
    }
}

/// Coefficient of variation of the boundary radius, 0 for a disk.
#[derive(Default)]
pub struct Circularity;

impl FeatureInfo for Circularity {
    fn name(&self) -> &'static str {
        "Circularity"
    }

    fn description(&self) -> &'static str {
        "Spread of the boundary radius around its mean"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("Circularity", label, 2)?;
        Ok(vec![ValueInformation::new("", Units::none())])
    }
}

impl CompositeFeature for Circularity {
    fn dependencies(&self) -> Vec<String> {
        vec!["Radius".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        // Radius publishes [Max, Mean, Min, Var].
        let radius = dependencies.values("Radius");
        let mean = radius[1];
        output[0] = if mean == 0.0 {
            f64::NAN
        } else {
            radius[3].sqrt() / mean
        };
    }
}

/// `Size / ConvexArea`, clamped to [0, 1].
#[derive(Default)]
pub struct Convexity;

impl FeatureInfo for Convexity {
    fn name(&self) -> &'static str {
        "Convexity"
    }

    fn description(&self) -> &'static str {
        "Object area relative to its convex hull area"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("Convexity", label, 2)?;
        Ok(vec![ValueInformation::new("", Units::none())])
    }
}

impl CompositeFeature for Convexity {
    fn dependencies(&self) -> Vec<String> {
        vec!["Size".to_string(), "ConvexArea".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        let size = dependencies.values("Size")[0];
        let convex = dependencies.values("ConvexArea")[0];
        output[0] = if convex == 0.0 {
            f64::NAN
        } else {
            (size / convex).clamp(0.0, 1.0)
        };
    }
}

/// Podczeck's shape descriptors: the object area compared against reference
/// shapes spanned by the Feret widths, plus the elongation.
#[derive(Default)]
pub struct PodczeckShapes;

impl FeatureInfo for PodczeckShapes {
    fn name(&self) -> &'static str {
        "PodczeckShapes"
    }

    fn description(&self) -> &'static str {
        "Similarity of the object to square, circle, triangle, and ellipse"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("PodczeckShapes", label, 2)?;
        Ok(vec![
            ValueInformation::new("Square", Units::none()),
            ValueInformation::new("Circle", Units::none()),
            ValueInformation::new("Triangle", Units::none()),
            ValueInformation::new("Ellipse", Units::none()),
            ValueInformation::new("Elongation", Units::none()),
        ])
    }
}

impl CompositeFeature for PodczeckShapes {
    fn dependencies(&self) -> Vec<String> {
        vec!["Size".to_string(), "Feret".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        let size = dependencies.values("Size")[0];
        let feret = dependencies.values("Feret");
        let (max, width, height) = (feret[0], feret[1], feret[2]);
        let box_area = width * height;
        if box_area == 0.0 || width == 0.0 {
            output.fill(f64::NAN);
            return;
        }
        output[0] = size / box_area;
        output[1] = size / (0.25 * std::f64::consts::PI * width * width);
        output[2] = size / (0.5 * box_area);
        output[3] = size / (0.25 * std::f64::consts::PI * box_area);
        output[4] = max / width;
    }
}

/// Radial spread of the boundary polygon around its fitted ellipse.
#[derive(Default)]
pub struct EllipseVariance;

impl FeatureInfo for EllipseVariance {
    fn name(&self) -> &'static str {
        "EllipseVariance"
    }

    fn description(&self) -> &'static str {
        "Spread of the boundary around the covariance-fit ellipse"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("EllipseVariance", label, 2)?;
        Ok(vec![ValueInformation::new("", Units::none())])
    }
}

impl PolygonBasedFeature for EllipseVariance {
    fn measure(&mut self, polygon: &Polygon, output: &mut [f64]) {
        output[0] = polygon.ellipse_variance();
    }
}

/// Integral of the squared boundary curvature.
#[derive(Default)]
pub struct BendingEnergy {
    scale: f64,
}

impl FeatureInfo for BendingEnergy {
    fn name(&self) -> &'static str {
        "BendingEnergy"
    }

    fn description(&self) -> &'static str {
        "Integral of squared curvature along the boundary"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("BendingEnergy", label, 2)?;
        let (scale, units) = isotropic_scale(label);
        self.scale = scale;
        Ok(vec![ValueInformation::new("", units.pow(-1))])
    }
}

impl ChainCodeBasedFeature for BendingEnergy {
    fn measure(&mut self, chain: &ChainCode, output: &mut [f64]) {
        output[0] = chain.bending_energy() / self.scale;
    }
}

/// Distance statistics from the boundary pixels to their centroid.
#[derive(Default)]
pub struct Radius {
    scale: f64,
}

impl FeatureInfo for Radius {
    fn name(&self) -> &'static str {
        "Radius"
    }

    fn description(&self) -> &'static str {
        "Statistics of the boundary-to-centroid distance"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("Radius", label, 2)?;
        let (scale, units) = isotropic_scale(label);
        self.scale = scale;
        Ok(vec![
            ValueInformation::new("Max", units),
            ValueInformation::new("Mean", units),
            ValueInformation::new("Min", units),
            ValueInformation::new("Var", units.pow(2)),
        ])
    }
}

impl ChainCodeBasedFeature for Radius {
    fn measure(&mut self, chain: &ChainCode, output: &mut [f64]) {
        let polygon = Polygon::new(chain.vertices());
        let stats = polygon.radius_statistics(polygon.centroid());
        output[0] = stats.max * self.scale;
        output[1] = stats.mean * self.scale;
        output[2] = stats.min * self.scale;
        output[3] = stats.var * self.scale * self.scale;
    }
}
