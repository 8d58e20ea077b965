use rm_accum::{MinMaxAccumulator, StatisticsAccumulator};

use crate::measurement::FeatureColumn;

/// Reducers over one feature column. All read the feature's first value per
/// object and skip NaN cells.
fn finite_values<'a>(column: &FeatureColumn<'a>) -> impl Iterator<Item = f64> + 'a {
    column
        .iter()
        .map(|(_, values)| values[0])
        .filter(|v| !v.is_nan())
}

pub fn minimum(column: &FeatureColumn<'_>) -> f64 {
    maximum_and_minimum(column).minimum()
}

pub fn maximum(column: &FeatureColumn<'_>) -> f64 {
    maximum_and_minimum(column).maximum()
}

pub fn maximum_and_minimum(column: &FeatureColumn<'_>) -> MinMaxAccumulator {
    let mut acc = MinMaxAccumulator::default();
    for v in finite_values(column) {
        acc.push(v);
    }
    acc
}

pub fn mean(column: &FeatureColumn<'_>) -> f64 {
    sample_statistics(column).mean()
}

pub fn sample_statistics(column: &FeatureColumn<'_>) -> StatisticsAccumulator {
    let mut acc = StatisticsAccumulator::default();
    for v in finite_values(column) {
        acc.push(v);
    }
    acc
}

/// Nearest-rank percentile over the finite values; NaN when none.
pub fn percentile(column: &FeatureColumn<'_>, p: f64) -> f64 {
    let mut values: Vec<f64> = finite_values(column).collect();
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (p.clamp(0.0, 100.0) / 100.0 * (values.len() - 1) as f64).round() as usize;
    values[rank]
}

/// Id of the object with the smallest value; 0 when the column has no
/// finite cell.
pub fn object_minimum(column: &FeatureColumn<'_>) -> u32 {
    extremal_object(column, |v, best| v < best)
}

/// Id of the object with the largest value; 0 when the column has no finite
/// cell.
pub fn object_maximum(column: &FeatureColumn<'_>) -> u32 {
    extremal_object(column, |v, best| v > best)
}

fn extremal_object(column: &FeatureColumn<'_>, better: impl Fn(f64, f64) -> bool) -> u32 {
    let mut best_id = 0u32;
    let mut best = f64::NAN;
    for (id, values) in column.iter() {
        let v = values[0];
        if v.is_nan() {
            continue;
        }
        if best_id == 0 || better(v, best) {
            best_id = id;
            best = v;
        }
    }
    best_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::ValueInformation;
    use crate::measurement::Measurement;
    use approx::assert_relative_eq;
    use rm_image::Units;

    fn sample() -> Measurement {
        let mut m = Measurement::new();
        m.add_feature("F", vec![ValueInformation::new("", Units::none())])
            .unwrap();
        m.set_object_ids(&[1, 2, 3, 4, 5]).unwrap();
        m.forge().unwrap();
        m.data_mut().copy_from_slice(&[3.0, f64::NAN, 1.0, 7.0, 5.0]);
        m
    }

    #[test]
    fn test_min_max_mean() {
        let m = sample();
        let col = m.column("F").unwrap();
        assert_eq!(minimum(&col), 1.0);
        assert_eq!(maximum(&col), 7.0);
        assert_relative_eq!(mean(&col), 4.0);
        let mm = maximum_and_minimum(&col);
        assert_eq!(mm.number(), 4); // NaN skipped
    }

    #[test]
    fn test_percentile() {
        let m = sample();
        let col = m.column("F").unwrap();
        assert_eq!(percentile(&col, 0.0), 1.0);
        assert_eq!(percentile(&col, 100.0), 7.0);
        assert_eq!(percentile(&col, 50.0), 3.0);
    }

    #[test]
    fn test_object_extrema() {
        let m = sample();
        let col = m.column("F").unwrap();
        assert_eq!(object_minimum(&col), 3);
        assert_eq!(object_maximum(&col), 4);
    }

    #[test]
    fn test_sample_statistics() {
        let m = sample();
        let col = m.column("F").unwrap();
        let stats = sample_statistics(&col);
        assert_eq!(stats.number(), 4);
        assert_relative_eq!(stats.mean(), 4.0);
    }
}
