use rm_image::{Image, ScanLine, Units};

use super::moments::{
    dimensions_from_inertia, eigen_packed, tensor_value_names, MomentScratch,
};
use super::{axis_name, spatial_scale};
use crate::error::{MeasureError, Result};
use crate::feature::{
    CompositeFeature, DependencyValues, FeatureInfo, LineBasedFeature, ObjectIdToIndexMap,
    ValueInformation,
};

fn require_scalar_grey(feature: &'static str, grey: Option<&Image>) -> Result<()> {
    match grey {
        Some(g) if !g.is_scalar() => Err(MeasureError::InvalidInput(format!(
            "{feature} requires a scalar grey image"
        ))),
        _ => Ok(()),
    }
}

fn require_2d_or_3d(feature: &'static str, label: &Image) -> Result<usize> {
    match label.dimensionality() {
        d @ (2 | 3) => Ok(d),
        _ => Err(MeasureError::InvalidInput(format!(
            "{feature} requires a 2- or 3-dimensional label image"
        ))),
    }
}

/// Grey-weighted centroid of the object.
#[derive(Default)]
pub struct Gravity {
    scratch: MomentScratch,
}

impl FeatureInfo for Gravity {
    fn name(&self) -> &'static str {
        "Gravity"
    }

    fn description(&self) -> &'static str {
        "Grey-weighted centroid of the object"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        label: &Image,
        grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_scalar_grey("Gravity", grey)?;
        self.scratch.initialize(label, n_objects);
        Ok((0..self.scratch.ndim)
            .map(|axis| ValueInformation::new(axis_name(axis), self.scratch.units))
            .collect())
    }

    fn cleanup(&mut self) {
        self.scratch.release();
    }
}

impl LineBasedFeature for Gravity {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        self.scratch.scan_grey(line, objects);
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        match self.scratch.accumulator(object_index).first_order() {
            Some(center) => output.copy_from_slice(&center),
            None => output.fill(f64::NAN),
        }
    }
}

/// Grey-weighted second-order central tensor (inertia form).
#[derive(Default)]
pub struct GreyMu {
    scratch: MomentScratch,
}

impl FeatureInfo for GreyMu {
    fn name(&self) -> &'static str {
        "GreyMu"
    }

    fn description(&self) -> &'static str {
        "Grey-weighted second-order central moment tensor"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        label: &Image,
        grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        require_scalar_grey("GreyMu", grey)?;
        self.scratch.initialize(label, n_objects);
        let units = self.scratch.units.pow(2);
        Ok(tensor_value_names(self.scratch.ndim)
            .into_iter()
            .map(|n| ValueInformation::new(n, units))
            .collect())
    }

    fn cleanup(&mut self) {
        self.scratch.release();
    }
}

impl LineBasedFeature for GreyMu {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        self.scratch.scan_grey(line, objects);
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        match self.scratch.accumulator(object_index).second_order() {
            Some(tensor) => output.copy_from_slice(&tensor),
            None => output.fill(f64::NAN),
        }
    }
}

/// Eigenvalues of the GreyMu tensor, descending.
#[derive(Default)]
pub struct GreyInertia {
    ndim: usize,
}

impl FeatureInfo for GreyInertia {
    fn name(&self) -> &'static str {
        "GreyInertia"
    }

    fn description(&self) -> &'static str {
        "Grey-weighted moments of inertia"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.ndim = require_2d_or_3d("GreyInertia", label)?;
        let units = spatial_scale(label).units.pow(2);
        Ok((0..self.ndim)
            .map(|i| ValueInformation::new(format!("l{i}"), units))
            .collect())
    }
}

impl CompositeFeature for GreyInertia {
    fn dependencies(&self) -> Vec<String> {
        vec!["GreyMu".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        match eigen_packed(self.ndim, dependencies.values("GreyMu")) {
            Some((values, _)) => output.copy_from_slice(&values),
            None => output.fill(f64::NAN),
        }
    }
}

/// Eigenvectors of the GreyMu tensor, one row per eigenvalue.
#[derive(Default)]
pub struct GreyMajorAxes {
    ndim: usize,
}

impl FeatureInfo for GreyMajorAxes {
    fn name(&self) -> &'static str {
        "GreyMajorAxes"
    }

    fn description(&self) -> &'static str {
        "Grey-weighted principal axes"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.ndim = require_2d_or_3d("GreyMajorAxes", label)?;
        let mut values = Vec::with_capacity(self.ndim * self.ndim);
        for i in 0..self.ndim {
            for axis in 0..self.ndim {
                values.push(ValueInformation::new(
                    format!("v{i}{}", axis_name(axis)),
                    Units::none(),
                ));
            }
        }
        Ok(values)
    }
}

impl CompositeFeature for GreyMajorAxes {
    fn dependencies(&self) -> Vec<String> {
        vec!["GreyMu".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        match eigen_packed(self.ndim, dependencies.values("GreyMu")) {
            Some((_, vectors)) => {
                for (i, vector) in vectors.iter().enumerate() {
                    output[i * self.ndim..(i + 1) * self.ndim].copy_from_slice(vector);
                }
            }
            None => output.fill(f64::NAN),
        }
    }
}

/// Extents of the cube with the grey-weighted moments of inertia.
#[derive(Default)]
pub struct GreyDimensionsCube {
    ndim: usize,
}

impl FeatureInfo for GreyDimensionsCube {
    fn name(&self) -> &'static str {
        "GreyDimensionsCube"
    }

    fn description(&self) -> &'static str {
        "Extents of the cube with the grey-weighted moments of inertia"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.ndim = require_2d_or_3d("GreyDimensionsCube", label)?;
        let units = spatial_scale(label).units;
        Ok((0..self.ndim)
            .map(|i| ValueInformation::new(format!("d{i}"), units))
            .collect())
    }
}

impl CompositeFeature for GreyDimensionsCube {
    fn dependencies(&self) -> Vec<String> {
        vec!["GreyInertia".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        dimensions_from_inertia(dependencies.values("GreyInertia"), true, output);
    }
}

/// Axes of the ellipsoid with the grey-weighted moments of inertia.
#[derive(Default)]
pub struct GreyDimensionsEllipsoid {
    ndim: usize,
}

impl FeatureInfo for GreyDimensionsEllipsoid {
    fn name(&self) -> &'static str {
        "GreyDimensionsEllipsoid"
    }

    fn description(&self) -> &'static str {
        "Axes of the ellipsoid with the grey-weighted moments of inertia"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.ndim = require_2d_or_3d("GreyDimensionsEllipsoid", label)?;
        let units = spatial_scale(label).units;
        Ok((0..self.ndim)
            .map(|i| ValueInformation::new(format!("d{i}"), units))
            .collect())
    }
}

impl CompositeFeature for GreyDimensionsEllipsoid {
    fn dependencies(&self) -> Vec<String> {
        vec!["GreyInertia".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        dimensions_from_inertia(dependencies.values("GreyInertia"), false, output);
    }
}
