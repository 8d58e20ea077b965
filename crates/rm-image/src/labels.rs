use std::collections::BTreeSet;

use crate::error::{ImageError, Result};
use crate::image::Image;

/// Enumerate the object labels present in a label image, ascending.
///
/// The image must be a scalar unsigned-integer image. When `exclude_zero`
/// is set, the background label 0 is left out.
pub fn get_object_labels(label: &Image, exclude_zero: bool) -> Result<Vec<u32>> {
    if !label.is_scalar() {
        return Err(ImageError::NotScalar(label.tensor_elements()));
    }
    if !label.data_type().is_unsigned_int() {
        return Err(ImageError::DTypeMismatch {
            expected: "unsigned integer".to_string(),
            got: label.data_type().to_string(),
        });
    }
    let storage = label.storage();
    let mut set = BTreeSet::new();
    for i in 0..label.number_of_pixels() {
        set.insert(storage.get_label(i));
    }
    if exclude_zero {
        set.remove(&0);
    }
    Ok(set.into_iter().collect())
}
