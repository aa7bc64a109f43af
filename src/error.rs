use thiserror::Error;

/// Errors raised by field, geometry and resource operations.
///
/// Domain errors signal caller misuse (wrong spectral state, missing index,
/// incompatible operands...). `NotImplemented` is kept apart so that callers
/// can tell "not allowed" from "not supported yet".
#[derive(Error, Debug)]
pub enum FieldError {
    #[error("{0}")]
    Domain(String),

    #[error("point (lon={lon}, lat={lat}) is out of field domain")]
    OutOfDomain { lon: f64, lat: f64 },

    #[error("point (i={i}, j={j}) is out of field domain")]
    OutOfDomainIj { i: usize, j: usize },

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Field has no data")]
    NoData,

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FieldError {
    pub fn domain(msg: impl Into<String>) -> Self {
        FieldError::Domain(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        FieldError::Shape(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        FieldError::NotImplemented(msg.into())
    }
}

impl From<ndarray::ShapeError> for FieldError {
    fn from(err: ndarray::ShapeError) -> Self {
        FieldError::Shape(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FieldError>;
