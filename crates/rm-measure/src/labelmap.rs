use std::collections::HashMap;

use crate::measurement::{FeatureColumn, Measurement};

/// Mapping from object id to a target id: 0 deselects the object, any other
/// value keeps (and possibly renumbers) it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    ids: Vec<u32>,
    targets: HashMap<u32, u32>,
}

impl LabelMap {
    fn from_predicate(column: &FeatureColumn<'_>, predicate: impl Fn(f64) -> bool) -> LabelMap {
        let mut ids = Vec::new();
        let mut targets = HashMap::new();
        for (id, values) in column.iter() {
            let keep = predicate(values[0]);
            ids.push(id);
            targets.insert(id, if keep { id } else { 0 });
        }
        LabelMap { ids, targets }
    }

    /// Target id for `id`; unknown ids map to 0.
    pub fn get(&self, id: u32) -> u32 {
        self.targets.get(&id).copied().unwrap_or(0)
    }

    /// Ids covered by the map, in insertion order.
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Number of selected (nonzero-mapped) objects.
    pub fn count(&self) -> usize {
        self.ids.iter().filter(|&&id| self.get(id) != 0).count()
    }

    /// Renumber the selected objects contiguously from 1, in insertion
    /// order.
    pub fn relabel(&mut self) {
        let mut next = 0u32;
        for &id in &self.ids {
            if self.targets[&id] != 0 {
                next += 1;
                self.targets.insert(id, next);
            }
        }
    }

    /// Row-filter a measurement: the result keeps only the rows whose id
    /// maps to nonzero, re-identified through the map.
    pub fn apply(&self, measurement: &Measurement) -> Measurement {
        let mut out = Measurement::new();
        for f in measurement.features() {
            out.add_feature(f.name.clone(), measurement.values_of(&f.name).unwrap().to_vec())
                .expect("unforged copy accepts source schema");
        }
        let selected: Vec<u32> = measurement
            .objects()
            .iter()
            .copied()
            .filter(|&id| self.get(id) != 0)
            .collect();
        let mapped: Vec<u32> = selected.iter().map(|&id| self.get(id)).collect();
        out.set_object_ids(&mapped).expect("unforged");
        out.forge().expect("freshly built");
        let width = measurement.number_of_values();
        for (row_out, &id) in selected.iter().enumerate() {
            let row = measurement.row(id).expect("selected from source");
            out.data_mut()[row_out * width..(row_out + 1) * width]
                .copy_from_slice(row.all_values());
        }
        out
    }
}

impl<'a> FeatureColumn<'a> {
    /// The comparison selectors read the first value of the feature for
    /// each object; a true predicate maps the id to itself, false to 0.
    pub fn equal(&self, value: f64) -> LabelMap {
        LabelMap::from_predicate(self, |v| v == value)
    }

    pub fn not_equal(&self, value: f64) -> LabelMap {
        LabelMap::from_predicate(self, |v| v != value)
    }

    pub fn less_than(&self, value: f64) -> LabelMap {
        LabelMap::from_predicate(self, |v| v < value)
    }

    pub fn less_or_equal(&self, value: f64) -> LabelMap {
        LabelMap::from_predicate(self, |v| v <= value)
    }

    pub fn greater_than(&self, value: f64) -> LabelMap {
        LabelMap::from_predicate(self, |v| v > value)
    }

    pub fn greater_or_equal(&self, value: f64) -> LabelMap {
        LabelMap::from_predicate(self, |v| v >= value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::ValueInformation;
    use rm_image::Units;

    fn sample() -> Measurement {
        let mut m = Measurement::new();
        m.add_feature("Size", vec![ValueInformation::new("", Units::pixel().pow(2))])
            .unwrap();
        m.set_object_ids(&[5, 7, 9]).unwrap();
        m.forge().unwrap();
        m.data_mut().copy_from_slice(&[4.0, 9.0, 16.0]);
        m
    }

    #[test]
    fn test_comparison_selectors() {
        let m = sample();
        let col = m.column("Size").unwrap();
        let map = col.greater_than(5.0);
        assert_eq!(map.get(5), 0);
        assert_eq!(map.get(7), 7);
        assert_eq!(map.get(9), 9);
        assert_eq!(map.count(), 2);
        assert_eq!(col.less_or_equal(4.0).count(), 1);
        assert_eq!(col.equal(9.0).count(), 1);
        assert_eq!(col.not_equal(9.0).count(), 2);
    }

    #[test]
    fn test_relabel() {
        let m = sample();
        let mut map = m.column("Size").unwrap().greater_than(5.0);
        map.relabel();
        assert_eq!(map.get(5), 0);
        assert_eq!(map.get(7), 1);
        assert_eq!(map.get(9), 2);
    }

    #[test]
    fn test_apply_filters_rows() {
        let m = sample();
        let map = m.column("Size").unwrap().greater_than(5.0);
        let filtered = map.apply(&m);
        assert_eq!(filtered.objects(), &[7, 9]);
        assert_eq!(filtered.row(7).unwrap()["Size"], [9.0]);
        assert_eq!(filtered.row(9).unwrap()["Size"], [16.0]);
    }

    #[test]
    fn test_apply_with_relabel() {
        let m = sample();
        let mut map = m.column("Size").unwrap().greater_than(5.0);
        map.relabel();
        let filtered = map.apply(&m);
        assert_eq!(filtered.objects(), &[1, 2]);
        assert_eq!(filtered.row(1).unwrap()["Size"], [9.0]);
    }

    #[test]
    fn test_unknown_id_maps_to_zero() {
        let m = sample();
        let map = m.column("Size").unwrap().greater_than(0.0);
        assert_eq!(map.get(1234), 0);
    }
}
