use rm_accum::{
    DirectionalStatisticsAccumulator, MinMaxAccumulator, PositionAccumulator,
    StatisticsAccumulator, VarianceAccumulator,
};
use rm_image::{Image, ScanLine, Units};

use super::{axis_name, for_each_pixel, scaled_position, spatial_scale};
use crate::error::Result;
use crate::feature::{
    FeatureInfo, LineBasedFeature, ObjectIdToIndexMap, ValueInformation,
};

/// One value name per grey tensor element.
fn element_names(base: &str, k: usize) -> Vec<String> {
    if k == 1 {
        return vec![base.to_string()];
    }
    (0..k)
        .map(|e| {
            if base.is_empty() {
                format!("ch{e}")
            } else {
                format!("{base}_{e}")
            }
        })
        .collect()
}

fn tensor_elements(grey: Option<&Image>) -> usize {
    grey.map_or(1, Image::tensor_elements)
}

/// Sum of the grey values over the object, per tensor element.
#[derive(Default)]
pub struct Mass {
    sums: Vec<f64>,
    k: usize,
}

impl FeatureInfo for Mass {
    fn name(&self) -> &'static str {
        "Mass"
    }

    fn description(&self) -> &'static str {
        "Sum of the grey values of the object"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        _label: &Image,
        grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.k = tensor_elements(grey);
        self.sums = vec![0.0; n_objects * self.k];
        Ok(element_names("", self.k)
            .into_iter()
            .map(|n| ValueInformation::new(n, Units::none()))
            .collect())
    }

    fn cleanup(&mut self) {
        self.sums = Vec::new();
    }
}

impl LineBasedFeature for Mass {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        let grey = line.grey.expect("intensity feature scans with grey");
        let k = self.k;
        let sums = &mut self.sums;
        for_each_pixel(line, objects, |row, i| {
            for e in 0..k {
                sums[row * k + e] += grey[i * k + e];
            }
        });
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        output.copy_from_slice(&self.sums[object_index * self.k..(object_index + 1) * self.k]);
    }
}

/// Mean grey value, per tensor element.
#[derive(Default)]
pub struct Mean {
    accs: Vec<VarianceAccumulator>,
    k: usize,
}

/// Sample standard deviation of the grey values, per tensor element.
#[derive(Default)]
pub struct StandardDeviation {
    accs: Vec<VarianceAccumulator>,
    k: usize,
}

fn scan_variance(
    accs: &mut [VarianceAccumulator],
    k: usize,
    line: &ScanLine<'_>,
    objects: &ObjectIdToIndexMap,
) {
    let grey = line.grey.expect("intensity feature scans with grey");
    for_each_pixel(line, objects, |row, i| {
        for e in 0..k {
            accs[row * k + e].push(grey[i * k + e]);
        }
    });
}

impl FeatureInfo for Mean {
    fn name(&self) -> &'static str {
        "Mean"
    }

    fn description(&self) -> &'static str {
        "Mean grey value of the object"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        _label: &Image,
        grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.k = tensor_elements(grey);
        self.accs = vec![VarianceAccumulator::default(); n_objects * self.k];
        Ok(element_names("", self.k)
            .into_iter()
            .map(|n| ValueInformation::new(n, Units::none()))
            .collect())
    }

    fn cleanup(&mut self) {
        self.accs = Vec::new();
    }
}

impl LineBasedFeature for Mean {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        scan_variance(&mut self.accs, self.k, line, objects);
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        for e in 0..self.k {
            output[e] = self.accs[object_index * self.k + e].mean();
        }
    }
}

impl FeatureInfo for StandardDeviation {
    fn name(&self) -> &'static str {
        "StandardDeviation"
    }

    fn description(&self) -> &'static str {
        "Standard deviation of the grey values of the object"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        _label: &Image,
        grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.k = tensor_elements(grey);
        self.accs = vec![VarianceAccumulator::default(); n_objects * self.k];
        Ok(element_names("", self.k)
            .into_iter()
            .map(|n| ValueInformation::new(n, Units::none()))
            .collect())
    }

    fn cleanup(&mut self) {
        self.accs = Vec::new();
    }
}

impl LineBasedFeature for StandardDeviation {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        scan_variance(&mut self.accs, self.k, line, objects);
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        for e in 0..self.k {
            output[e] = self.accs[object_index * self.k + e].standard_deviation();
        }
    }
}

/// Mean, standard deviation, skewness, and excess kurtosis of the grey
/// values, per tensor element.
#[derive(Default)]
pub struct Statistics {
    accs: Vec<StatisticsAccumulator>,
    k: usize,
}

impl FeatureInfo for Statistics {
    fn name(&self) -> &'static str {
        "Statistics"
    }

    fn description(&self) -> &'static str {
        "First four moments of the grey-value distribution"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        _label: &Image,
        grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.k = tensor_elements(grey);
        self.accs = vec![StatisticsAccumulator::default(); n_objects * self.k];
        let mut values = Vec::with_capacity(4 * self.k);
        for e in 0..self.k {
            for base in ["Mean", "StandardDeviation", "Skewness", "ExcessKurtosis"] {
                let name = if self.k == 1 {
                    base.to_string()
                } else {
                    format!("{base}_{e}")
                };
                values.push(ValueInformation::new(name, Units::none()));
            }
        }
        Ok(values)
    }

    fn cleanup(&mut self) {
        self.accs = Vec::new();
    }
}

impl LineBasedFeature for Statistics {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        let grey = line.grey.expect("intensity feature scans with grey");
        let k = self.k;
        let accs = &mut self.accs;
        for_each_pixel(line, objects, |row, i| {
            for e in 0..k {
                accs[row * k + e].push(grey[i * k + e]);
            }
        });
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        for e in 0..self.k {
            let acc = &self.accs[object_index * self.k + e];
            output[4 * e] = acc.mean();
            output[4 * e + 1] = acc.standard_deviation();
            output[4 * e + 2] = acc.skewness();
            output[4 * e + 3] = acc.excess_kurtosis();
        }
    }
}

/// Circular mean and standard deviation of angular grey data, per tensor
/// element.
#[derive(Default)]
pub struct DirectionalStatistics {
    accs: Vec<DirectionalStatisticsAccumulator>,
    k: usize,
}

impl FeatureInfo for DirectionalStatistics {
    fn name(&self) -> &'static str {
        "DirectionalStatistics"
    }

    fn description(&self) -> &'static str {
        "Circular statistics of angular grey values"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        _label: &Image,
        grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        self.k = tensor_elements(grey);
        self.accs = vec![DirectionalStatisticsAccumulator::default(); n_objects * self.k];
        let mut values = Vec::with_capacity(2 * self.k);
        for e in 0..self.k {
            for base in ["Mean", "StandardDeviation"] {
                let name = if self.k == 1 {
                    base.to_string()
                } else {
                    format!("{base}_{e}")
                };
                values.push(ValueInformation::new(name, Units::none()));
            }
        }
        Ok(values)
    }

    fn cleanup(&mut self) {
        self.accs = Vec::new();
    }
}

impl LineBasedFeature for DirectionalStatistics {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        let grey = line.grey.expect("intensity feature scans with grey");
        let k = self.k;
        let accs = &mut self.accs;
        for_each_pixel(line, objects, |row, i| {
            for e in 0..k {
                accs[row * k + e].push(grey[i * k + e]);
            }
        });
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        for e in 0..self.k {
            let acc = &self.accs[object_index * self.k + e];
            output[2 * e] = acc.mean();
            output[2 * e + 1] = acc.standard_deviation();
        }
    }
}

/// Largest grey value of the object, per tensor element.
#[derive(Default)]
pub struct MaxVal {
    accs: Vec<MinMaxAccumulator>,
    k: usize,
}

/// Smallest grey value of the object, per tensor element.
#[derive(Default)]
pub struct MinVal {
    accs: Vec<MinMaxAccumulator>,
    k: usize,
}

fn minmax_initialize(
    grey: Option<&Image>,
    n_objects: usize,
) -> (usize, Vec<MinMaxAccumulator>, Vec<ValueInformation>) {
    let k = tensor_elements(grey);
    let accs = vec![MinMaxAccumulator::default(); n_objects * k];
    let values = element_names("", k)
        .into_iter()
        .map(|n| ValueInformation::new(n, Units::none()))
        .collect();
    (k, accs, values)
}

fn scan_minmax(
    accs: &mut [MinMaxAccumulator],
    k: usize,
    line: &ScanLine<'_>,
    objects: &ObjectIdToIndexMap,
) {
    let grey = line.grey.expect("intensity feature scans with grey");
    for_each_pixel(line, objects, |row, i| {
        for e in 0..k {
            accs[row * k + e].push(grey[i * k + e]);
        }
    });
}

impl FeatureInfo for MaxVal {
    fn name(&self) -> &'static str {
        "MaxVal"
    }

    fn description(&self) -> &'static str {
        "Largest grey value of the object"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        _label: &Image,
        grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        let (k, accs, values) = minmax_initialize(grey, n_objects);
        self.k = k;
        self.accs = accs;
        Ok(values)
    }

    fn cleanup(&mut self) {
        self.accs = Vec::new();
    }
}

impl LineBasedFeature for MaxVal {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        scan_minmax(&mut self.accs, self.k, line, objects);
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        for e in 0..self.k {
            output[e] = self.accs[object_index * self.k + e].maximum();
        }
    }
}

impl FeatureInfo for MinVal {
    fn name(&self) -> &'static str {
        "MinVal"
    }

    fn description(&self) -> &'static str {
        "Smallest grey value of the object"
    }

    fn needs_grey(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        _label: &Image,
        grey: Option<&Image>,
        n_objects: usize,
    ) -> Result<Vec<ValueInformation>> {
        let (k, accs, values) = minmax_initialize(grey, n_objects);
        self.k = k;
        self.accs = accs;
        Ok(values)
    }

    fn cleanup(&mut self) {
        self.accs = Vec::new();
    }
}

impl LineBasedFeature for MinVal {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        scan_minmax(&mut self.accs, self.k, line, objects);
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        for e in 0..self.k {
            output[e] = self.accs[object_index * self.k + e].minimum();
        }
    }
}

/// Coordinates of the first pixel carrying the largest grey value
/// (channel 0 for tensor grey).
pub struct MaxPos {
    accs: Vec<PositionAccumulator>,
    factors: Vec<f64>,
    pos: Vec<f64>,
    k: usize,
}

impl Default for MaxPos {
    fn default() -> Self {
        MaxPos {
            accs: Vec::new(),
            factors: Vec::new(),
            pos: Vec::new(),
            k: 1,
        }
    }
}

/// Coordinates of the first pixel carrying the smallest grey value
/// (channel 0 for tensor grey).
pub struct MinPos {
    accs: Vec<PositionAccumulator>,
    factors: Vec<f64>,
    pos: Vec<f64>,
    k: usize,
}

impl Default for MinPos {
    fn default() -> Self {
        MinPos {
            accs: Vec::new(),
            factors: Vec::new(),
            pos: Vec::new(),
            k: 1,
        }
    }
}

fn position_values(label: &Image) -> Vec<ValueInformation> {
    let scale = spatial_scale(label);
    (0..label.dimensionality())
        .map(|axis| ValueInformation::new(axis_name(axis), scale.units))
        .collect()
}

fn scan_position(
    accs: &mut [PositionAccumulator],
    factors: &[f64],
    pos: &mut [f64],
    k: usize,
    line: &ScanLine<'_>,
    objects: &ObjectIdToIndexMap,
) {
    let grey = line.grey.expect("intensity feature scans with grey");
    for_each_pixel(line, objects, |row, i| {
        scaled_position(line, i, factors, pos);
        accs[row].push(grey[i * k], pos);
    });
}

impl FeatureInfo for MaxPos {
    fn name(&self) -> &'static str {
        "MaxPos"
    }

    fn description(&self) -> &'static str {
        "Position of the largest grey value of the object"
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
        let scale = spatial_scale(label);
        self.k = tensor_elements(grey);
        self.factors = scale.factors;
        self.pos = vec![0.0; label.dimensionality()];
        self.accs = vec![PositionAccumulator::new_maximum(); n_objects];
        Ok(position_values(label))
    }

    fn cleanup(&mut self) {
        self.accs = Vec::new();
    }
}

impl LineBasedFeature for MaxPos {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        scan_position(&mut self.accs, &self.factors, &mut self.pos, self.k, line, objects);
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        let acc = &self.accs[object_index];
        if acc.number() == 0 {
            output.fill(f64::NAN);
        } else {
            output.copy_from_slice(acc.coordinates());
        }
    }
}

impl FeatureInfo for MinPos {
    fn name(&self) -> &'static str {
        "MinPos"
    }

    fn description(&self) -> &'static str {
        "Position of the smallest grey value of the object"
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
        let scale = spatial_scale(label);
        self.k = tensor_elements(grey);
        self.factors = scale.factors;
        self.pos = vec![0.0; label.dimensionality()];
        self.accs = vec![PositionAccumulator::new_minimum(); n_objects];
        Ok(position_values(label))
    }

    fn cleanup(&mut self) {
        self.accs = Vec::new();
    }
}

impl LineBasedFeature for MinPos {
    fn scan_line(&mut self, line: &ScanLine<'_>, objects: &ObjectIdToIndexMap) {
        scan_position(&mut self.accs, &self.factors, &mut self.pos, self.k, line, objects);
    }

    fn finish(&mut self, object_index: usize, output: &mut [f64]) {
        let acc = &self.accs[object_index];
        if acc.number() == 0 {
            output.fill(f64::NAN);
        } else {
            output.copy_from_slice(acc.coordinates());
        }
    }
}
