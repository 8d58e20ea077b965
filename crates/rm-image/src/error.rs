use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("data length {got} does not match sizes {sizes:?} with {tensor} tensor elements")]
    DataLengthMismatch {
        got: usize,
        sizes: Vec<usize>,
        tensor: usize,
    },
    #[error("image sizes mismatch: expected {expected:?}, got {got:?}")]
    SizeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: String, got: String },
    #[error("invalid dimensionality {got}, expected {expected}")]
    InvalidDimensionality { expected: usize, got: usize },
    #[error("expected a scalar image, got {0} tensor elements")]
    NotScalar(usize),
    #[error("coordinates {coords:?} out of bounds for sizes {sizes:?}")]
    CoordsOutOfBounds {
        coords: Vec<usize>,
        sizes: Vec<usize>,
    },
    #[error("pixel size dimension {dim} out of range for {ndim}-dimensional image")]
    PixelSizeOutOfRange { dim: usize, ndim: usize },
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ImageError>;
