use crate::error::{ImageError, Result};
use crate::image::Image;

/// One line of a raster traversal.
///
/// `labels` holds the object ids along the line; `grey`, when present, holds
/// `labels.len() × tensor_elements` interleaved samples widened to f64.
pub struct ScanLine<'a> {
    /// Coordinates of the first pixel of the line.
    pub start: &'a [usize],
    /// The dimension being iterated (always the last, fastest-stride one).
    pub dim: usize,
    pub labels: &'a [u32],
    pub grey: Option<&'a [f64]>,
    pub tensor_elements: usize,
}

/// Drive a single-threaded raster traversal over a label image and an
/// optional co-registered grey image, visiting every pixel exactly once.
///
/// Line-based measurement accumulators hold per-object scratch that they
/// update in place as pixels stream by, so the traversal is strictly
/// sequential; there is no parallel variant.
pub fn scan_lines<F>(label: &Image, grey: Option<&Image>, mut functor: F) -> Result<()>
where
    F: FnMut(&ScanLine<'_>),
{
    if let Some(grey) = grey {
        if grey.sizes() != label.sizes() {
            return Err(ImageError::SizeMismatch {
                expected: label.sizes().to_vec(),
                got: grey.sizes().to_vec(),
            });
        }
    }
    let ndim = label.dimensionality();
    if ndim == 0 || label.number_of_pixels() == 0 {
        return Ok(());
    }
    let dim = ndim - 1;
    let line_length = label.sizes()[dim];
    let n_lines = label.number_of_pixels() / line_length;
    let tensor = grey.map_or(1, Image::tensor_elements);

    let mut coords = vec![0usize; ndim];
    let mut label_buf = vec![0u32; line_length];
    let mut grey_buf = vec![0f64; if grey.is_some() { line_length * tensor } else { 0 }];

    let label_storage = label.storage();
    for line in 0..n_lines {
        // Decompose the line index into the leading coordinates.
        let mut rest = line;
        for d in (0..dim).rev() {
            coords[d] = rest % label.sizes()[d];
            rest /= label.sizes()[d];
        }
        coords[dim] = 0;
        let offset = line * line_length;
        for i in 0..line_length {
            label_buf[i] = label_storage.get_label(offset + i);
        }
        if let Some(grey) = grey {
            let storage = grey.storage();
            for i in 0..line_length * tensor {
                grey_buf[i] = storage.get_f64(offset * tensor + i);
            }
        }
        functor(&ScanLine {
            start: &coords,
            dim,
            labels: &label_buf,
            grey: grey.map(|_| grey_buf.as_slice()),
            tensor_elements: tensor,
        });
    }
    Ok(())
}
