use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("polygon self-intersects: {0}")]
    SelfIntersecting(String),
    #[error("malformed chain code: {0}")]
    MalformedChainCode(String),
    #[error("{0} requires a {1}-dimensional image")]
    WrongDimensionality(&'static str, usize),
    #[error("image error: {0}")]
    Image(#[from] rm_image::ImageError),
}

pub type Result<T> = std::result::Result<T, GeometryError>;
