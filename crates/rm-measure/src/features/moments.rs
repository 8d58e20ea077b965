use nalgebra::{Matrix2, Matrix3, SymmetricEigen};
use rm_accum::MomentAccumulator;
use rm_image::{Image, ScanLine, Units};

use super::{axis_name, for_each_pixel, scaled_position, spatial_scale};
use crate::error::{MeasureError, Result};
use crate::feature::{
    CompositeFeature, DependencyValues, FeatureInfo, LineBasedFeature, ObjectIdToIndexMap,
    ValueInformation,
};

/// Per-object moment accumulation over physical coordinates, shared by the
/// binary and grey moment features.
#[derive(Default)]
pub(crate) struct MomentScratch {
    accs: Vec<MomentAccumulator>,
    factors: Vec<f64>,
    pos: Vec<f64>,
    pub units: Units,
    pub ndim: usize,
}

impl MomentScratch {
    pub fn initialize(&mut self, label: &Image, n_objects: usize) {
        let scale = spatial_scale(label);
        self.ndim = label.dimensionality();
        self.factors = scale.factors;
        self.units = scale.units;
        self.pos = vec![0.0; self.ndim];
        self.accs = vec![MomentAccumulator::new(self.ndim); n_objects];
    }

    pub fn release(&mut self) {
        self.accs = Vec::new();
    }

    /// Accumulate unit weights (binary moments).
    pub fn scan_binary(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        let (accs, pos, factors) = (&mut self.accs, &mut self.pos, &self.factors);
        for_each_pixel(line, objects, |row, i| {
            scaled_position(line, i, factors, pos);
            accs[row].push(pos, 1.0);
        });
    }

    /// Accumulate grey-value weights (channel 0).
    pub fn scan_grey(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        let (accs, pos, factors) = (&mut self.accs, &mut self.pos, &self.factors);
        let grey = line.grey.expect("grey-weighted feature scans with grey");
        let k = line.tensor_elements;
        for_each_pixel(line, objects, |row, i| {
            scaled_position(line, i, factors, pos);
            accs[row].push(pos, grey[i * k]);
        });
    }

    pub fn accumulator(&self, object_index: usize) -> &MomentAccumulator {
        &self.accs[object_index]
    }
}

/// Value names of the packed second-order tensor, diagonal first.
pub(crate) fn tensor_value_names(ndim: usize) -> Vec<String> {
    let mut names: Vec<String> = (0..ndim)
        .map(|i| format!("{0}{0}", axis_name(i)))
        .collect();
    for i in 0..ndim {
        for j in i + 1..ndim {
            names.push(format!("{}{}", axis_name(i), axis_name(j)));
        }
    }
    names
}

/// Eigen-decomposition of a packed symmetric tensor (diagonal first).
///
/// Returns eigenvalues in descending order with their eigenvectors; None
/// when the input contains non-finite entries or the dimensionality is not
/// 2 or 3.
pub(crate) fn eigen_packed(ndim: usize, packed: &[f64]) -> Option<(Vec<f64>, Vec<Vec<f64>>)> {
    if packed.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let (mut values, mut vectors): (Vec<f64>, Vec<Vec<f64>>) = match ndim {
        2 => {
            let m = Matrix2::new(packed[0], packed[2], packed[2], packed[1]);
            let eig = SymmetricEigen::new(m);
            (
                eig.eigenvalues.iter().copied().collect(),
                (0..2)
                    .map(|c| eig.eigenvectors.column(c).iter().copied().collect())
                    .collect(),
            )
        }
        3 => {
            let m = Matrix3::new(
                packed[0], packed[3], packed[4], packed[3], packed[1], packed[5], packed[4],
                packed[5], packed[2],
            );
            let eig = SymmetricEigen::new(m);
            (
                eig.eigenvalues.iter().copied().collect(),
                (0..3)
                    .map(|c| eig.eigenvectors.column(c).iter().copied().collect())
                    .collect(),
            )
        }
        _ => return None,
    };
    // Sort descending by eigenvalue.
    let mut order: Vec<usize> = (0..ndim).collect();
    order.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(std::cmp::Ordering::Equal));
    values = order.iter().map(|&i| values[i]).collect();
    vectors = order.iter().map(|&i| vectors[i].clone()).collect();
    Some((values, vectors))
}

fn require_2d_or_3d(feature: &'static str, label: &Image) -> Result<usize> {
    match label.dimensionality() {
        d @ (2 | 3) => Ok(d),
        _ => Err(MeasureError::InvalidInput(format!(
            "{feature} requires a 2- or 3-dimensional label image"
        ))),
    }
}

/// Centroid of the object.
#[derive(Default)]
pub struct Center {
    scratch: MomentScratch,
}

impl FeatureInfo for Center {
    fn name(&self) -> &'static str {
        "Center"
    }

    fn description(&self) -> &'static str {
        "Centroid of the object"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.scratch.initialize(label, n_objects);
        Ok((0..self.scratch.ndim)
            .map(|axis| ValueInformation::new(axis_name(axis), self.scratch.units))
            .collect())
    }

    fn cleanup(&mut self) {
        self.scratch.release();
    }
}

impl LineBasedFeature for Center {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        self.scratch.scan_binary(line, objects);
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        match self.scratch.accumulator(object_index).first_order() {
            Some(center) => output.copy_from_slice(&center),
            None => output.fill(f64::NAN),
        }
    }
}

/// Elements of the second-order central tensor (inertia form), packed
/// diagonal first.
#[derive(Default)]
pub struct Mu {
    scratch: MomentScratch,
}

impl FeatureInfo for Mu {
    fn name(&self) -> &'static str {
        "Mu"
    }

    fn description(&self) -> &'static str {
        "Second-order central moment tensor of the object"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
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

impl LineBasedFeature for Mu {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        self.scratch.scan_binary(line, objects);
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        match self.scratch.accumulator(object_index).second_order() {
            Some(tensor) => output.copy_from_slice(&tensor),
            None => output.fill(f64::NAN),
        }
    }
}

/// Eigenvalues of the Mu tensor, descending.
#[derive(Default)]
pub struct Inertia {
    ndim: usize,
}

impl FeatureInfo for Inertia {
    fn name(&self) -> &'static str {
        "Inertia"
    }

    fn description(&self) -> &'static str {
        "Moments of inertia of the object"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.ndim = require_2d_or_3d("Inertia", label)?;
        let units = spatial_scale(label).units.pow(2);
        Ok((0..self.ndim)
            .map(|i| ValueInformation::new(format!("l{i}"), units))
            .collect())
    }
}

impl CompositeFeature for Inertia {
    fn dependencies(&self) -> Vec<String> {
        vec!["Mu".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        match eigen_packed(self.ndim, dependencies.values("Mu")) {
            Some((values, _)) => output.copy_from_slice(&values),
            None => output.fill(f64::NAN),
        }
    }
}

/// Eigenvectors of the Mu tensor, one row per eigenvalue (descending).
#[derive(Default)]
pub struct MajorAxes {
    ndim: usize,
}

impl FeatureInfo for MajorAxes {
    fn name(&self) -> &'static str {
        "MajorAxes"
    }

    fn description(&self) -> &'static str {
        "Principal axes of the object"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.ndim = require_2d_or_3d("MajorAxes", label)?;
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

impl CompositeFeature for MajorAxes {
    fn dependencies(&self) -> Vec<String> {
        vec!["Mu".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        match eigen_packed(self.ndim, dependencies.values("Mu")) {
            Some((_, vectors)) => {
                for (i, vector) in vectors.iter().enumerate() {
                    output[i * self.ndim..(i + 1) * self.ndim].copy_from_slice(vector);
                }
            }
            None => output.fill(f64::NAN),
        }
    }
}

/// Extents of the axis-aligned cube with the same moments of inertia.
#[derive(Default)]
pub struct DimensionsCube {
    ndim: usize,
}

/// Convert inertia eigenvalues (descending) into linear extents.
pub(crate) fn dimensions_from_inertia(
    inertia: &[f64],
    cube: bool,
    output: &mut [f64],
) {
    let ndim = inertia.len();
    if inertia.iter().any(|v| !v.is_finite()) {
        output.fill(f64::NAN);
        return;
    }
    match ndim {
        2 => {
            let factor = if cube { 12.0 } else { 16.0 };
            for (out, &l) in output.iter_mut().zip(inertia) {
                *out = if l >= 0.0 { (factor * l).sqrt() } else { f64::NAN };
            }
        }
        _ => {
            let factor = if cube { 6.0 } else { 10.0 };
            let total: f64 = inertia.iter().sum();
            for (out, &l) in output.iter_mut().zip(inertia) {
                let v = factor * (total - 2.0 * l);
                *out = if v >= 0.0 { v.sqrt() } else { f64::NAN };
            }
        }
    }
}

impl FeatureInfo for DimensionsCube {
    fn name(&self) -> &'static str {
        "DimensionsCube"
    }

    fn description(&self) -> &'static str {
        "Extents of the cube with the object's moments of inertia"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.ndim = require_2d_or_3d("DimensionsCube", label)?;
        let units = spatial_scale(label).units;
        Ok((0..self.ndim)
            .map(|i| ValueInformation::new(format!("d{i}"), units))
            .collect())
    }
}

impl CompositeFeature for DimensionsCube {
    fn dependencies(&self) -> Vec<String> {
        vec!["Inertia".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        dimensions_from_inertia(dependencies.values("Inertia"), true, output);
    }
}

/// Axes of the ellipsoid with the same moments of inertia.
#[derive(Default)]
pub struct DimensionsEllipsoid {
    ndim: usize,
}

impl FeatureInfo for DimensionsEllipsoid {
    fn name(&self) -> &'static str {
        "DimensionsEllipsoid"
    }

    fn description(&self) -> &'static str {
        "Axes of the ellipsoid with the object's moments of inertia"
    }

    fn initialize(
        &mut self,
        label: &Image,
        _grey: Option<&Image>,
        _n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.ndim = require_2d_or_3d("DimensionsEllipsoid", label)?;
        let units = spatial_scale(label).units;
        Ok((0..self.ndim)
            .map(|i| ValueInformation::new(format!("d{i}"), units))
            .collect())
    }
}

impl CompositeFeature for DimensionsEllipsoid {
    fn dependencies(&self) -> Vec<String> {
        vec!["Inertia".to_string()]
    }

    fn compose(&mut self, dependencies: &DependencyValues<'_>, output: &mut [f64]) {
        dimensions_from_inertia(dependencies.values("Inertia"), false, output);
    }
}
