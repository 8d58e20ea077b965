use std::collections::HashMap;

use rm_image::Image;

use crate::error::{MeasureError, Result};
use crate::measurement::FeatureColumn;

/// Paint a feature column back over its label image.
///
/// Produces an f64 image of the label's sizes with one tensor element per
/// feature value; every pixel carries the feature values of the object
/// covering it, via lookup-table substitution. Background and unmeasured
/// labels map to zero.
pub fn object_to_measurement(label: &Image, column: &FeatureColumn<'_>) -> Result<Image> {
    if !label.is_scalar() || !label.data_type().is_unsigned_int() {
        return Err(MeasureError::InvalidInput(
            "label image must be a scalar unsigned-integer image".to_string(),
        ));
    }
    let k = column.number_values();
    let lut: HashMap<u32, &[f64]> = column.iter().collect();
    let mut out = Image::new_f64(label.sizes().to_vec(), k);
    let n = label.number_of_pixels();
    {
        let samples = out.samples_f64_mut().expect("f64 image");
        let mut coords = vec![0usize; label.dimensionality()];
        for i in 0..n {
            // Decompose the linear index into coordinates.
            let mut rest = i;
            for d in (0..label.dimensionality()).rev() {
                coords[d] = rest % label.sizes()[d];
                rest /= label.sizes()[d];
            }
            let id = label.label_at(&coords)?;
            if let Some(values) = lut.get(&id) {
                samples[i * k..(i + 1) * k].copy_from_slice(values);
            }
        }
    }
    Ok(out.with_pixel_size(label.pixel_size().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::ValueInformation;
    use crate::measurement::Measurement;
    use rm_image::Units;

    #[test]
    fn test_lookup_substitution() {
        let label = Image::from_u8(vec![2, 2], vec![1, 0, 2, 1]).unwrap();
        let mut m = Measurement::new();
        m.add_feature("F", vec![ValueInformation::new("", Units::none())])
            .unwrap();
        m.set_object_ids(&[1, 2]).unwrap();
        m.forge().unwrap();
        m.data_mut().copy_from_slice(&[10.0, 20.0]);
        let out = object_to_measurement(&label, &m.column("F").unwrap()).unwrap();
        assert_eq!(out.at(&[0, 0]).unwrap(), 10.0);
        assert_eq!(out.at(&[0, 1]).unwrap(), 0.0); // background
        assert_eq!(out.at(&[1, 0]).unwrap(), 20.0);
        assert_eq!(out.at(&[1, 1]).unwrap(), 10.0);
    }

    #[test]
    fn test_tensor_output() {
        let label = Image::from_u8(vec![1, 2], vec![1, 0]).unwrap();
        let mut m = Measurement::new();
        m.add_feature(
            "F",
            vec![
                ValueInformation::new("a", Units::none()),
                ValueInformation::new("b", Units::none()),
            ],
        )
        .unwrap();
        m.set_object_ids(&[1]).unwrap();
        m.forge().unwrap();
        m.data_mut().copy_from_slice(&[3.0, 4.0]);
        let out = object_to_measurement(&label, &m.column("F").unwrap()).unwrap();
        assert_eq!(out.tensor_elements(), 2);
        assert_eq!(out.at_channel(&[0, 0], 1).unwrap(), 4.0);
        assert_eq!(out.at_channel(&[0, 1], 0).unwrap(), 0.0);
    }

    #[test]
    fn test_rejects_float_label() {
        let label = Image::from_f32(vec![1, 1], vec![0.0]).unwrap();
        let mut m = Measurement::new();
        m.add_feature("F", vec![ValueInformation::new("", Units::none())])
            .unwrap();
        m.set_object_ids(&[1]).unwrap();
        m.forge().unwrap();
        assert!(object_to_measurement(&label, &m.column("F").unwrap()).is_err());
    }
}
