use rm_geometry::{surface_area, ChainCode, ConvexHull, Polygon};
use rm_image::{Image, ScanLine, Units};

use super::{for_each_pixel, isotropic_scale, spatial_scale, axis_name};
use crate::error::{MeasureError, Result};
use crate::feature::{
    ChainCodeBasedFeature, ConvexHullBasedFeature, FeatureInfo, ImageBasedFeature,
    LineBasedFeature, ObjectIdToIndexMap, PolygonBasedFeature, ValueInformation,
};

pub(crate) fn require_dimensionality(
    feature: &'static str,
    label: &Image,
    ndim: usize,
) -> Result<()> {
    if label.dimensionality() != ndim {
        return Err(MeasureError::InvalidInput(format!(
            "{feature} requires a {ndim}-dimensional label image"
        )));
    }
    Ok(())
}

/// Number of pixels of the object, scaled to the physical pixel volume.
#[derive(Default)]
pub struct Size {
    counts: Vec<f64>,
    scale: f64,
}

impl FeatureInfo for Size {
    fn name(&self) -> &'static str {
        "Size"
    }

    fn description(&self) -> &'static str {
        "Number of object pixels, as an area or volume"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.counts = vec![0.0; n_objects];
        let volume = label.pixel_size().product(label.dimensionality());
        let units = if volume.is_physical() {
            self.scale = volume.magnitude;
            volume.units
        } else {
            self.scale = 1.0;
            Units::pixel().pow(label.dimensionality() as i8)
        };
        Ok(vec![ValueInformation::new("", units)])
    }

    fn cleanup(&mut self) {
        self.counts = Vec::new();
    }
}

impl LineBasedFeature for Size {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        for_each_pixel(line, objects, |row, _| self.counts[row] += 1.0);
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        output[0] = self.counts[object_index];
    }

    fn scale_values(&self) -> Option<Vec<f64>> {
        Some(vec![self.scale])
    }
}

/// Per-axis minimum coordinate of the object's bounding box.
#[derive(Default)]
pub struct Minimum {
    mins: Vec<f64>,
    ndim: usize,
    factors: Vec<f64>,
}

/// Per-axis maximum coordinate of the object's bounding box.
#[derive(Default)]
pub struct Maximum {
    maxs: Vec<f64>,
    ndim: usize,
    factors: Vec<f64>,
}

/// Per-axis extent of the object's bounding box, `max − min + 1` pixels.
#[derive(Default)]
pub struct CartesianBox {
    mins: Vec<f64>,
    maxs: Vec<f64>,
    ndim: usize,
    factors: Vec<f64>,
}

fn axis_values(label: &Image) -> Vec<ValueInformation> {
    let scale = spatial_scale(label);
    (0..label.dimensionality())
        .map(|axis| ValueInformation::new(axis_name(axis), scale.units))
        .collect()
}

impl FeatureInfo for Minimum {
    fn name(&self) -> &'static str {
        "Minimum"
    }

    fn description(&self) -> &'static str {
        "Per-axis minimum coordinate of the object"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.ndim = label.dimensionality();
        self.factors = spatial_scale(label).factors;
        self.mins = vec![f64::INFINITY; n_objects * self.ndim];
        Ok(axis_values(label))
    }

    fn cleanup(&mut self) {
        self.mins = Vec::new();
    }
}

impl LineBasedFeature for Minimum {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        let ndim = self.ndim;
        let mins = &mut self.mins;
        for_each_pixel(line, objects, |row, i| {
            let base = row * ndim;
            let x = (line.start[line.dim] + i) as f64;
            if x < mins[base] {
                mins[base] = x;
            }
            for axis in 1..ndim {
                let c = line.start[ndim - 1 - axis] as f64;
                if c < mins[base + axis] {
                    mins[base + axis] = c;
                }
            }
        });
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        for axis in 0..self.ndim {
            let v = self.mins[object_index * self.ndim + axis];
            output[axis] = if v.is_finite() { v } else { f64::NAN };
        }
    }

    fn scale_values(&self) -> Option<Vec<f64>> {
        Some(self.factors.clone())
    }
}

impl FeatureInfo for Maximum {
    fn name(&self) -> &'static str {
        "Maximum"
    }

    fn description(&self) -> &'static str {
        "Per-axis maximum coordinate of the object"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.ndim = label.dimensionality();
        self.factors = spatial_scale(label).factors;
        self.maxs = vec![f64::NEG_INFINITY; n_objects * self.ndim];
        Ok(axis_values(label))
    }

    fn cleanup(&mut self) {
        self.maxs = Vec::new();
    }
}

impl LineBasedFeature for Maximum {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        let ndim = self.ndim;
        let maxs = &mut self.maxs;
        for_each_pixel(line, objects, |row, i| {
            let base = row * ndim;
            let x = (line.start[line.dim] + i) as f64;
            if x > maxs[base] {
                maxs[base] = x;
            }
            for axis in 1..ndim {
                let c = line.start[ndim - 1 - axis] as f64;
                if c > maxs[base + axis] {
                    maxs[base + axis] = c;
                }
            }
        });
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        for axis in 0..self.ndim {
            let v = self.maxs[object_index * self.ndim + axis];
            output[axis] = if v.is_finite() { v } else { f64::NAN };
        }
    }

    fn scale_values(&self) -> Option<Vec<f64>> {
        Some(self.factors.clone())
    }
}

impl FeatureInfo for CartesianBox {
    fn name(&self) -> &'static str {
        "CartesianBox"
    }

    fn description(&self) -> &'static str {
        "Per-axis extent of the object's axis-aligned bounding box"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.ndim = label.dimensionality();
        self.factors = spatial_scale(label).factors;
        self.mins = vec![f64::INFINITY; n_objects * self.ndim];
        self.maxs = vec![f64::NEG_INFINITY; n_objects * self.ndim];
        Ok(axis_values(label))
    }

    fn cleanup(&mut self) {
        self.mins = Vec::new();
        self.maxs = Vec::new();
    }
}

impl LineBasedFeature for CartesianBox {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        let ndim = self.ndim;
        let mins = &mut self.mins;
        let maxs = &mut self.maxs;
        for_each_pixel(line, objects, |row, i| {
            let base = row * ndim;
            let x = (line.start[line.dim] + i) as f64;
            mins[base] = mins[base].min(x);
            maxs[base] = maxs[base].max(x);
            for axis in 1..ndim {
                let c = line.start[ndim - 1 - axis] as f64;
                mins[base + axis] = mins[base + axis].min(c);
                maxs[base + axis] = maxs[base + axis].max(c);
            }
        });
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        for axis in 0..self.ndim {
            let min = self.mins[object_index * self.ndim + axis];
            let max = self.maxs[object_index * self.ndim + axis];
            output[axis] = if min.is_finite() {
                max - min + 1.0
            } else {
                f64::NAN
            };
        }
    }

    fn scale_values(&self) -> Option<Vec<f64>> {
        Some(self.factors.clone())
    }
}

/// Boundary length of the object: the corrected chain-code length plus π.
#[derive(Default)]
pub struct Perimeter {
    scale: f64,
}

impl FeatureInfo for Perimeter {
    fn name(&self) -> &'static str {
        "Perimeter"
    }

    fn description(&self) -> &'static str {
        "Length of the object boundary"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("Perimeter", label, 2)?;
        let (scale, units) = isotropic_scale(label);
        self.scale = scale;
        Ok(vec![ValueInformation::new("", units)])
    }
}

impl ChainCodeBasedFeature for Perimeter {
    fn measure(&mut self, chain: &ChainCode, output: &mut [f64]) {
        output[0] = (chain.length() + std::f64::consts::PI) * self.scale;
    }
}

/// Surface area of the object estimated from local 2×2×2 configurations.
#[derive(Default)]
pub struct SurfaceArea {
    scale: f64,
}

impl FeatureInfo for SurfaceArea {
    fn name(&self) -> &'static str {
        "SurfaceArea"
    }

    fn description(&self) -> &'static str {
        "Surface area of the object"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("SurfaceArea", label, 3)?;
        let (scale, units) = isotropic_scale(label);
        self.scale = scale * scale;
        Ok(vec![ValueInformation::new("", units.pow(2))])
    }
}

impl ImageBasedFeature for SurfaceArea {
    fn measure(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        object_ids: &[u32],
        output: &mut [f64],
    ) {
        match surface_area(label, object_ids) {
            Ok(areas) => {
                for (out, area) in output.iter_mut().zip(areas) {
                    *out = area * self.scale;
                }
            }
            Err(_) => output.fill(f64::NAN),
        }
    }
}

/// Feret diameters from rotating projections of the boundary pixels.
#[derive(Default)]
pub struct Feret {
    scale: f64,
}

/// Angular step of the projection sweep.
const FERET_ANGLE_STEP: f64 = 2.5e-3;

impl FeatureInfo for Feret {
    fn name(&self) -> &'static str {
        "Feret"
    }

    fn description(&self) -> &'static str {
        "Extremal projection diameters and their angles"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("Feret", label, 2)?;
        let (scale, units) = isotropic_scale(label);
        self.scale = scale;
        Ok(vec![
            ValueInformation::new("Max", units),
            ValueInformation::new("Min", units),
            ValueInformation::new("PerpMin", units),
            ValueInformation::new("MaxAng", Units::none()),
            ValueInformation::new("MinAng", Units::none()),
        ])
    }
}

impl ChainCodeBasedFeature for Feret {
    fn measure(&mut self, chain: &ChainCode, output: &mut [f64]) {
        let f = chain.feret(FERET_ANGLE_STEP);
        output[0] = f.max_diameter * self.scale;
        output[1] = f.min_diameter * self.scale;
        output[2] = f.max_perpendicular * self.scale;
        output[3] = f.max_angle;
        output[4] = f.min_angle;
    }
}

/// Area of the boundary polygon.
#[derive(Default)]
pub struct SolidArea {
    scale: f64,
}

impl FeatureInfo for SolidArea {
    fn name(&self) -> &'static str {
        "SolidArea"
    }

    fn description(&self) -> &'static str {
        "Area of the object's boundary polygon"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("SolidArea", label, 2)?;
        let (scale, units) = isotropic_scale(label);
        self.scale = scale * scale;
        Ok(vec![ValueInformation::new("", units.pow(2))])
    }
}

impl PolygonBasedFeature for SolidArea {
    fn measure(&mut self, polygon: &Polygon, output: &mut [f64]) {
        output[0] = polygon.area() * self.scale;
    }
}

/// Area of the convex hull.
#[derive(Default)]
pub struct ConvexArea {
    scale: f64,
}

impl FeatureInfo for ConvexArea {
    fn name(&self) -> &'static str {
        "ConvexArea"
    }

    fn description(&self) -> &'static str {
        "Area of the object's convex hull"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("ConvexArea", label, 2)?;
        let (scale, units) = isotropic_scale(label);
        self.scale = scale * scale;
        Ok(vec![ValueInformation::new("", units.pow(2))])
    }
}

impl ConvexHullBasedFeature for ConvexArea {
    fn measure(&mut self, hull: &ConvexHull, output: &mut [f64]) {
        output[0] = hull.area() * self.scale;
    }
}

/// Perimeter of the convex hull.
#[derive(Default)]
pub struct ConvexPerimeter {
    scale: f64,
}

impl FeatureInfo for ConvexPerimeter {
    fn name(&self) -> &'static str {
        "ConvexPerimeter"
    }

    fn description(&self) -> &'static str {
        "Perimeter of the object's convex hull"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_dimensionality("ConvexPerimeter", label, 2)?;
        let (scale, units) = isotropic_scale(label);
        self.scale = scale;
        Ok(vec![ValueInformation::new("", units)])
    }
}

impl ConvexHullBasedFeature for ConvexPerimeter {
    fn measure(&mut self, hull: &ConvexHull, output: &mut [f64]) {
        output[0] = hull.perimeter() * self.scale;
    }
}
