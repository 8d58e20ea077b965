use half::f16;

use crate::dtype::DType;
use crate::error::{ImageError, Result};
use crate::storage::Storage;
use crate::units::PixelSize;

/// A dense n-dimensional image.
///
/// Samples are stored row-major with the last dimension fastest, tensor
/// elements interleaved (channel stride 1). Dimension 0 is the slowest
/// spatial stride; the raster scan framework iterates the last dimension.
#[derive(Debug, Clone)]
pub struct Image {
    storage: Storage,
    sizes: Vec<usize>,
    tensor_elements: usize,
    pixel_size: PixelSize,
}

fn check_len(len: usize, sizes: &[usize], tensor: usize) -> Result<()> {
    let expected: usize = sizes.iter().product::<usize>() * tensor;
    if len != expected {
        return Err(ImageError::DataLengthMismatch {
            got: len,
            sizes: sizes.to_vec(),
            tensor,
        });
    }
    Ok(())
}

impl Image {
    fn from_storage(storage: Storage, sizes: Vec<usize>, tensor_elements: usize) -> Result<Image> {
        check_len(storage.len(), &sizes, tensor_elements)?;
        let ndim = sizes.len();
        Ok(Image {
            storage,
            sizes,
            tensor_elements,
            pixel_size: PixelSize::uncalibrated(ndim),
        })
    }

    /// Create a scalar u8 image from row-major data.
    pub fn from_u8(sizes: Vec<usize>, data: Vec<u8>) -> Result<Image> {
        Image::from_storage(Storage::U8(data), sizes, 1)
    }

    /// Create a scalar u16 image from row-major data.
    pub fn from_u16(sizes: Vec<usize>, data: Vec<u16>) -> Result<Image> {
        Image::from_storage(Storage::U16(data), sizes, 1)
    }

    /// Create a scalar u32 image from row-major data.
    pub fn from_u32(sizes: Vec<usize>, data: Vec<u32>) -> Result<Image> {
        Image::from_storage(Storage::U32(data), sizes, 1)
    }

    /// Create a scalar f16 image from row-major data.
    pub fn from_f16(sizes: Vec<usize>, data: Vec<f16>) -> Result<Image> {
        Image::from_storage(Storage::F16(data), sizes, 1)
    }

    /// Create a scalar f32 image from row-major data.
    pub fn from_f32(sizes: Vec<usize>, data: Vec<f32>) -> Result<Image> {
        Image::from_storage(Storage::F32(data), sizes, 1)
    }

    /// Create a scalar f64 image from row-major data.
    pub fn from_f64(sizes: Vec<usize>, data: Vec<f64>) -> Result<Image> {
        Image::from_storage(Storage::F64(data), sizes, 1)
    }

    /// Create a tensor-valued f64 image from interleaved row-major data.
    pub fn from_f64_tensor(
        sizes: Vec<usize>,
        tensor_elements: usize,
        data: Vec<f64>,
    ) -> Result<Image> {
        Image::from_storage(Storage::F64(data), sizes, tensor_elements)
    }

    /// Create a zero-filled f64 image with the given tensor elements.
    pub fn new_f64(sizes: Vec<usize>, tensor_elements: usize) -> Image {
        let n: usize = sizes.iter().product::<usize>() * tensor_elements;
        let ndim = sizes.len();
        Image {
            storage: Storage::F64(vec![0.0; n]),
            sizes,
            tensor_elements,
            pixel_size: PixelSize::uncalibrated(ndim),
        }
    }

    /// Attach a pixel size; returns self for builder-style usage.
    pub fn with_pixel_size(mut self, pixel_size: PixelSize) -> Image {
        self.pixel_size = pixel_size;
        self
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn dimensionality(&self) -> usize {
        self.sizes.len()
    }

    /// Total number of pixels (not samples).
    pub fn number_of_pixels(&self) -> usize {
        self.sizes.iter().product()
    }

    /// Spatial stride of dimension `dim`, in pixels.
    pub fn stride(&self, dim: usize) -> usize {
        self.sizes[dim + 1..].iter().product()
    }

    pub fn data_type(&self) -> DType {
        self.storage.dtype()
    }

    pub fn pixel_size(&self) -> &PixelSize {
        &self.pixel_size
    }

    /// True when all dimensions share the same pixel pitch.
    pub fn is_isotropic(&self) -> bool {
        self.pixel_size.is_isotropic()
    }

    pub fn tensor_elements(&self) -> usize {
        self.tensor_elements
    }

    pub fn is_scalar(&self) -> bool {
        self.tensor_elements == 1
    }

    /// True when storage is allocated. Images built through the constructors
    /// are always forged; the flag mirrors the container protocol.
    pub fn is_forged(&self) -> bool {
        !self.storage.is_empty() || self.number_of_pixels() == 0
    }

    fn pixel_offset(&self, coords: &[usize]) -> Result<usize> {
        if coords.len() != self.sizes.len() {
            return Err(ImageError::InvalidDimensionality {
                expected: self.sizes.len(),
                got: coords.len(),
            });
        }
        let mut offset = 0usize;
        for (dim, (&c, &size)) in coords.iter().zip(&self.sizes).enumerate() {
            if c >= size {
                return Err(ImageError::CoordsOutOfBounds {
                    coords: coords.to_vec(),
                    sizes: self.sizes.clone(),
                });
            }
            offset += c * self.stride(dim);
        }
        Ok(offset)
    }

    /// Sample at `coords`, channel 0, widened to f64.
    pub fn at(&self, coords: &[usize]) -> Result<f64> {
        self.at_channel(coords, 0)
    }

    /// Sample at `coords` for tensor element `channel`, widened to f64.
    pub fn at_channel(&self, coords: &[usize], channel: usize) -> Result<f64> {
        let offset = self.pixel_offset(coords)?;
        Ok(self
            .storage
            .get_f64(offset * self.tensor_elements + channel))
    }

    /// Label at `coords` (unsigned integer images only).
    pub fn label_at(&self, coords: &[usize]) -> Result<u32> {
        if !self.data_type().is_unsigned_int() {
            return Err(ImageError::DTypeMismatch {
                expected: "unsigned integer".to_string(),
                got: self.data_type().to_string(),
            });
        }
        let offset = self.pixel_offset(coords)?;
        Ok(self.storage.get_label(offset))
    }

    /// Label at signed `coords`; None when out of bounds. Used by boundary
    /// walkers that probe neighbours beyond the image edge.
    pub fn label_at_signed(&self, coords: &[i64]) -> Option<u32> {
        let mut offset = 0usize;
        for (dim, (&c, &size)) in coords.iter().zip(&self.sizes).enumerate() {
            if c < 0 || c as usize >= size {
                return None;
            }
            offset += c as usize * self.stride(dim);
        }
        Some(self.storage.get_label(offset))
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Mutable access to f64 sample data (interleaved).
    pub fn samples_f64_mut(&mut self) -> Option<&mut [f64]> {
        self.storage.as_f64_slice_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::PhysicalQuantity;

    #[test]
    fn test_strides_row_major() {
        let img = Image::from_u8(vec![2, 3, 4], vec![0; 24]).unwrap();
        assert_eq!(img.stride(0), 12);
        assert_eq!(img.stride(1), 4);
        assert_eq!(img.stride(2), 1);
        assert_eq!(img.dimensionality(), 3);
        assert_eq!(img.number_of_pixels(), 24);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(Image::from_u8(vec![2, 2], vec![0; 3]).is_err());
    }

    #[test]
    fn test_at_and_label_at() {
        let img = Image::from_u32(vec![2, 3], vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(img.label_at(&[1, 2]).unwrap(), 5);
        assert_eq!(img.at(&[0, 1]).unwrap(), 1.0);
        assert!(img.at(&[2, 0]).is_err());
        assert_eq!(img.label_at_signed(&[-1, 0]), None);
        assert_eq!(img.label_at_signed(&[1, 0]), Some(3));
    }

    #[test]
    fn test_tensor_channels() {
        let img =
            Image::from_f64_tensor(vec![1, 2], 2, vec![1.0, 10.0, 2.0, 20.0]).unwrap();
        assert!(!img.is_scalar());
        assert_eq!(img.at_channel(&[0, 1], 0).unwrap(), 2.0);
        assert_eq!(img.at_channel(&[0, 1], 1).unwrap(), 20.0);
    }

    #[test]
    fn test_pixel_size_builder() {
        let img = Image::from_u8(vec![2, 2], vec![0; 4])
            .unwrap()
            .with_pixel_size(PixelSize::isotropic(2, PhysicalQuantity::micrometres(0.5)));
        assert!(img.is_isotropic());
        assert_eq!(img.pixel_size().get(0).magnitude, 0.5);
    }

    #[test]
    fn test_forged_empty() {
        let img = Image::from_u8(vec![0, 4], vec![]).unwrap();
        assert!(img.is_forged());
        assert_eq!(img.number_of_pixels(), 0);
    }
}
