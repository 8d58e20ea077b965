use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeasureError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown feature: {0}")]
    UnknownFeature(String),
    #[error("feature '{0}' requires a grey image")]
    GreyRequired(String),
    #[error("feature '{name}' has {a} values in one operand and {b} in the other")]
    FeatureArityMismatch { name: String, a: usize, b: usize },
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("invalid flag: {0}")]
    InvalidFlag(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("geometry error: {0}")]
    Geometry(#[from] rm_geometry::GeometryError),
    #[error("image error: {0}")]
    Image(#[from] rm_image::ImageError),
}

pub type Result<T> = std::result::Result<T, MeasureError>;
