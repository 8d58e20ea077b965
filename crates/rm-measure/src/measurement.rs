use std::collections::HashMap;
use std::ops::Index;

use crate::error::{MeasureError, Result};
use crate::feature::ValueInformation;

/// Location of one feature's value span within the result matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInformation {
    pub name: String,
    pub start_column: usize,
    pub number_values: usize,
}

/// Dense (object × value) result table.
///
/// The container has two lifecycle phases. Before `forge` the feature and
/// object structure is mutable and no data storage exists; `forge` is a
/// one-shot transition that freezes the structure and allocates the
/// row-major data buffer. Features occupy contiguous, non-overlapping value
/// spans; rows follow object insertion order.
#[derive(Clone, Default)]
pub struct Measurement {
    features: Vec<FeatureInformation>,
    values: Vec<ValueInformation>,
    feature_index: HashMap<String, usize>,
    objects: Vec<u32>,
    object_index: HashMap<u32, usize>,
    data: Vec<f64>,
    forged: bool,
}

impl Measurement {
    pub fn new() -> Measurement {
        Measurement::default()
    }

    /// Append a feature with its value-information array.
    ///
    /// Fails on a forged container, a duplicate name, or an empty value
    /// array.
    pub fn add_feature(
        &mut self,
        name: impl Into<String>,
        values: Vec<ValueInformation>,
    ) -> Result<()> {
        let name = name.into();
        if self.forged {
            return Err(MeasureError::InvalidInput(
                "cannot add features to a forged measurement".to_string(),
            ));
        }
        if values.is_empty() {
            return Err(MeasureError::InvalidInput(format!(
                "feature '{name}' declares no values"
            )));
        }
        if self.feature_index.contains_key(&name) {
            return Err(MeasureError::InvalidInput(format!(
                "feature '{name}' already present"
            )));
        }
        self.feature_index.insert(name.clone(), self.features.len());
        self.features.push(FeatureInformation {
            name,
            start_column: self.values.len(),
            number_values: values.len(),
        });
        self.values.extend(values);
        Ok(())
    }

    /// Append object ids; duplicates and the background id 0 are ignored.
    pub fn add_object_ids(&mut self, ids: &[u32]) -> Result<()> {
        if self.forged {
            return Err(MeasureError::InvalidInput(
                "cannot add objects to a forged measurement".to_string(),
            ));
        }
        for &id in ids {
            if id == 0 || self.object_index.contains_key(&id) {
                continue;
            }
            self.object_index.insert(id, self.objects.len());
            self.objects.push(id);
        }
        Ok(())
    }

    /// Replace the object list.
    pub fn set_object_ids(&mut self, ids: &[u32]) -> Result<()> {
        if self.forged {
            return Err(MeasureError::InvalidInput(
                "cannot replace objects of a forged measurement".to_string(),
            ));
        }
        self.objects.clear();
        self.object_index.clear();
        self.add_object_ids(ids)
    }

    /// Allocate the data matrix and freeze the structure. NaN-filled, so a
    /// cell never written reads as missing.
    pub fn forge(&mut self) -> Result<()> {
        if self.forged {
            return Err(MeasureError::InvalidInput(
                "measurement is already forged".to_string(),
            ));
        }
        self.data = vec![f64::NAN; self.objects.len() * self.values.len()];
        self.forged = true;
        Ok(())
    }

    pub fn is_forged(&self) -> bool {
        self.forged
    }

    pub fn number_of_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn number_of_features(&self) -> usize {
        self.features.len()
    }

    /// Total number of value columns.
    pub fn number_of_values(&self) -> usize {
        self.values.len()
    }

    pub fn feature_exists(&self, name: &str) -> bool {
        self.feature_index.contains_key(name)
    }

    pub fn object_exists(&self, id: u32) -> bool {
        self.object_index.contains_key(&id)
    }

    pub fn features(&self) -> &[FeatureInformation] {
        &self.features
    }

    pub fn feature_information(&self, name: &str) -> Option<&FeatureInformation> {
        self.feature_index.get(name).map(|&i| &self.features[i])
    }

    /// Start column of a feature's value span.
    pub fn value_index(&self, name: &str) -> Option<usize> {
        self.feature_information(name).map(|f| f.start_column)
    }

    pub fn number_of_values_of(&self, name: &str) -> Option<usize> {
        self.feature_information(name).map(|f| f.number_values)
    }

    pub fn values(&self) -> &[ValueInformation] {
        &self.values
    }

    pub fn values_of(&self, name: &str) -> Option<&[ValueInformation]> {
        let info = self.feature_information(name)?;
        Some(&self.values[info.start_column..info.start_column + info.number_values])
    }

    pub fn objects(&self) -> &[u32] {
        &self.objects
    }

    pub fn object_index(&self, id: u32) -> Option<usize> {
        self.object_index.get(&id).copied()
    }

    /// The raw row-major data buffer. Empty before forging.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub(crate) fn row_slice(&self, row: usize) -> &[f64] {
        let w = self.values.len();
        &self.data[row * w..(row + 1) * w]
    }

    /// Mutable value span of one feature on one object row.
    pub(crate) fn span_mut(&mut self, row: usize, feature: usize) -> &mut [f64] {
        let info = &self.features[feature];
        let (start, len) = (info.start_column, info.number_values);
        let w = self.values.len();
        &mut self.data[row * w + start..row * w + start + len]
    }

    /// Feature-name → (start, len) spans, for composite dependency reads.
    pub(crate) fn spans(&self) -> HashMap<String, (usize, usize)> {
        self.features
            .iter()
            .map(|f| (f.name.clone(), (f.start_column, f.number_values)))
            .collect()
    }

    /// Per-object row views, in insertion order. Empty before forging.
    pub fn rows(&self) -> impl Iterator<Item = ObjectRow<'_>> {
        let n = if self.forged { self.objects.len() } else { 0 };
        (0..n).map(move |row| ObjectRow {
            measurement: self,
            row,
        })
    }

    /// Row view of one object.
    pub fn row(&self, id: u32) -> Option<ObjectRow<'_>> {
        if !self.forged {
            return None;
        }
        self.object_index(id).map(|row| ObjectRow {
            measurement: self,
            row,
        })
    }

    /// Per-feature column views, in declaration order. Empty before forging.
    pub fn columns(&self) -> impl Iterator<Item = FeatureColumn<'_>> {
        let n = if self.forged { self.features.len() } else { 0 };
        (0..n).map(move |feature| FeatureColumn {
            measurement: self,
            feature,
        })
    }

    /// Column view of one feature.
    pub fn column(&self, name: &str) -> Option<FeatureColumn<'_>> {
        if !self.forged {
            return None;
        }
        self.feature_index.get(name).map(|&feature| FeatureColumn {
            measurement: self,
            feature,
        })
    }

    /// Outer join over the union of objects and features.
    ///
    /// Objects and features of `a` come first, then the ones only in `b`.
    /// Cells present in both operands take `a`'s value; cells present in
    /// neither stay NaN. A feature named in both operands with different
    /// value counts fails with `FeatureArityMismatch`.
    pub fn merge(a: &Measurement, b: &Measurement) -> Result<Measurement> {
        let mut out = Measurement::new();
        for f in &a.features {
            out.add_feature(f.name.clone(), a.values_of(&f.name).unwrap().to_vec())?;
        }
        for f in &b.features {
            if let Some(in_a) = a.feature_information(&f.name) {
                if in_a.number_values != f.number_values {
                    return Err(MeasureError::FeatureArityMismatch {
                        name: f.name.clone(),
                        a: in_a.number_values,
                        b: f.number_values,
                    });
                }
                continue;
            }
            out.add_feature(f.name.clone(), b.values_of(&f.name).unwrap().to_vec())?;
        }
        out.add_object_ids(&a.objects)?;
        out.add_object_ids(&b.objects)?;
        out.forge()?;
        let spans_out = out.spans();
        let w = out.values.len();
        for f in &a.features {
            let (start_out, len) = spans_out[&f.name];
            for (row_src, &id) in a.objects.iter().enumerate() {
                let row_out = out.object_index(id).expect("object added above");
                let src = &a.row_slice(row_src)[f.start_column..f.start_column + f.number_values];
                out.data[row_out * w + start_out..row_out * w + start_out + len]
                    .copy_from_slice(src);
            }
        }
        for f in &b.features {
            let (start_out, len) = spans_out[&f.name];
            let feature_in_a = a.feature_exists(&f.name);
            for (row_src, &id) in b.objects.iter().enumerate() {
                // Cells present in both operands take A's value.
                if feature_in_a && a.object_exists(id) {
                    continue;
                }
                let row_out = out.object_index(id).expect("object added above");
                let src = &b.row_slice(row_src)[f.start_column..f.start_column + f.number_values];
                out.data[row_out * w + start_out..row_out * w + start_out + len]
                    .copy_from_slice(src);
            }
        }
        Ok(out)
    }
}

/// View of one object's row; `row["Feature"]` yields the feature's value
/// span for this object.
#[derive(Clone, Copy)]
pub struct ObjectRow<'a> {
    measurement: &'a Measurement,
    row: usize,
}

impl<'a> ObjectRow<'a> {
    pub fn object_id(&self) -> u32 {
        self.measurement.objects[self.row]
    }

    pub fn values(&self, feature: &str) -> Option<&'a [f64]> {
        let info = self.measurement.feature_information(feature)?;
        Some(
            &self.measurement.row_slice(self.row)
                [info.start_column..info.start_column + info.number_values],
        )
    }

    pub fn all_values(&self) -> &'a [f64] {
        self.measurement.row_slice(self.row)
    }
}

impl<'a> Index<&str> for ObjectRow<'a> {
    type Output = [f64];

    fn index(&self, feature: &str) -> &[f64] {
        self.values(feature)
            .unwrap_or_else(|| panic!("no feature named '{feature}'"))
    }
}

/// View of one feature's column; `column[id]` yields the object's value
/// span for this feature.
#[derive(Clone, Copy)]
pub struct FeatureColumn<'a> {
    measurement: &'a Measurement,
    feature: usize,
}

impl<'a> FeatureColumn<'a> {
    pub fn name(&self) -> &'a str {
        &self.measurement.features[self.feature].name
    }

    pub fn number_values(&self) -> usize {
        self.measurement.features[self.feature].number_values
    }

    pub fn value_information(&self) -> &'a [ValueInformation] {
        let info = &self.measurement.features[self.feature];
        &self.measurement.values[info.start_column..info.start_column + info.number_values]
    }

    pub fn measurement(&self) -> &'a Measurement {
        self.measurement
    }

    pub fn values(&self, id: u32) -> Option<&'a [f64]> {
        let row = self.measurement.object_index(id)?;
        let info = &self.measurement.features[self.feature];
        Some(
            &self.measurement.row_slice(row)
                [info.start_column..info.start_column + info.number_values],
        )
    }

    /// Iterate `(object_id, value span)` in row order.
    pub fn iter(self) -> impl Iterator<Item = (u32, &'a [f64])> {
        let measurement = self.measurement;
        let info = &measurement.features[self.feature];
        measurement.objects.iter().enumerate().map(move |(row, &id)| {
            (
                id,
                &measurement.row_slice(row)
                    [info.start_column..info.start_column + info.number_values],
            )
        })
    }
}

impl<'a> Index<u32> for FeatureColumn<'a> {
    type Output = [f64];

    fn index(&self, id: u32) -> &[f64] {
        self.values(id)
            .unwrap_or_else(|| panic!("no object with id {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rm_image::Units;

    fn value(name: &str) -> ValueInformation {
        ValueInformation::new(name, Units::none())
    }

    fn forged_2x3() -> Measurement {
        let mut m = Measurement::new();
        m.add_feature("F1", vec![value("")]).unwrap();
        m.add_feature("F2", vec![value("a"), value("b")]).unwrap();
        m.set_object_ids(&[10, 20]).unwrap();
        m.forge().unwrap();
        for (i, v) in m.data_mut().iter_mut().enumerate() {
            *v = i as f64;
        }
        m
    }

    #[test]
    fn test_structure_invariants() {
        let m = forged_2x3();
        assert_eq!(m.number_of_objects(), 2);
        assert_eq!(m.number_of_features(), 2);
        assert_eq!(m.number_of_values(), 3);
        assert_eq!(
            m.data().len(),
            m.number_of_objects() * m.number_of_values()
        );
        assert_eq!(m.value_index("F1"), Some(0));
        assert_eq!(m.value_index("F2"), Some(1));
        assert_eq!(
            m.value_index("F2").unwrap() + m.number_of_values_of("F2").unwrap(),
            m.number_of_values()
        );
        assert!(m.feature_exists("F1"));
        assert!(!m.feature_exists("f1")); // case sensitive
        assert!(m.object_exists(20));
        assert_eq!(m.objects()[m.object_index(20).unwrap()], 20);
    }

    #[test]
    fn test_forge_is_one_shot() {
        let mut m = Measurement::new();
        m.add_feature("F", vec![value("")]).unwrap();
        m.set_object_ids(&[1]).unwrap();
        m.forge().unwrap();
        assert!(m.forge().is_err());
        assert!(m.add_feature("G", vec![value("")]).is_err());
        assert!(m.add_object_ids(&[2]).is_err());
    }

    #[test]
    fn test_duplicate_feature_rejected() {
        let mut m = Measurement::new();
        m.add_feature("F", vec![value("")]).unwrap();
        assert!(m.add_feature("F", vec![value("")]).is_err());
    }

    #[test]
    fn test_duplicate_and_zero_objects_ignored() {
        let mut m = Measurement::new();
        m.add_object_ids(&[3, 0, 1, 3, 2, 1]).unwrap();
        assert_eq!(m.objects(), &[3, 1, 2]);
    }

    #[test]
    fn test_row_and_column_views() {
        let m = forged_2x3();
        let rows: Vec<u32> = m.rows().map(|r| r.object_id()).collect();
        assert_eq!(rows, vec![10, 20]);
        let row = m.row(20).unwrap();
        assert_eq!(&row["F1"], &[3.0]);
        assert_eq!(&row["F2"], &[4.0, 5.0]);
        let col = m.column("F2").unwrap();
        assert_eq!(&col[10], &[1.0, 2.0]);
        assert_eq!(&col[20], &[4.0, 5.0]);
        let ids: Vec<u32> = col.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![10, 20]);
    }

    #[test]
    fn test_unforged_iterators_empty() {
        let mut m = Measurement::new();
        m.add_feature("F", vec![value("")]).unwrap();
        m.set_object_ids(&[1]).unwrap();
        assert_eq!(m.rows().count(), 0);
        assert_eq!(m.columns().count(), 0);
        assert!(m.column("F").is_none());
    }

    #[test]
    fn test_merge_outer_join() {
        // A: F1(1), F2(1) over objects 10..19; B: F1(1), F3(3) over 15..24.
        let mut a = Measurement::new();
        a.add_feature("F1", vec![value("")]).unwrap();
        a.add_feature("F2", vec![value("")]).unwrap();
        let ids_a: Vec<u32> = (10..20).collect();
        a.set_object_ids(&ids_a).unwrap();
        a.forge().unwrap();
        for v in a.data_mut().iter_mut() {
            *v = 1.0;
        }

        let mut b = Measurement::new();
        b.add_feature("F1", vec![value("")]).unwrap();
        b.add_feature("F3", vec![value("a"), value("b"), value("c")])
            .unwrap();
        let ids_b: Vec<u32> = (15..25).collect();
        b.set_object_ids(&ids_b).unwrap();
        b.forge().unwrap();
        for v in b.data_mut().iter_mut() {
            *v = 2.0;
        }

        let m = Measurement::merge(&a, &b).unwrap();
        assert_eq!(m.number_of_features(), 3);
        assert_eq!(m.number_of_objects(), 15);
        assert_eq!(m.number_of_values(), 5);
        let expected: Vec<u32> = (10..25).collect();
        assert_eq!(m.objects(), expected.as_slice());

        // Objects 10..14 have no F3 cells; 20..24 no F2 cells.
        assert!(m.row(12).unwrap()["F3"].iter().all(|v| v.is_nan()));
        assert!(m.row(22).unwrap()["F2"][0].is_nan());
        // Overlap prefers A.
        for id in 15..20 {
            assert_eq!(m.row(id).unwrap()["F1"], [1.0]);
        }
        for id in 20..25 {
            assert_eq!(m.row(id).unwrap()["F1"], [2.0]);
        }
    }

    #[test]
    fn test_merge_arity_mismatch() {
        let mut a = Measurement::new();
        a.add_feature("F", vec![value("")]).unwrap();
        a.set_object_ids(&[1]).unwrap();
        a.forge().unwrap();
        let mut b = Measurement::new();
        b.add_feature("F", vec![value("a"), value("b")]).unwrap();
        b.set_object_ids(&[1]).unwrap();
        b.forge().unwrap();
        match Measurement::merge(&a, &b) {
            Err(MeasureError::FeatureArityMismatch { .. }) => {}
            other => panic!("expected arity mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_empty_measurement() {
        let mut m = Measurement::new();
        m.forge().unwrap();
        assert_eq!(m.number_of_objects(), 0);
        assert_eq!(m.data().len(), 0);
        assert_eq!(m.rows().count(), 0);
    }
}
