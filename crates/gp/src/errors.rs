use thiserror::Error;

/// A result type for GP regression algorithm
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when building or using a [`Gp`](crate::Gp) model
#[derive(Error, Debug)]
pub enum GpError {
    /// When a model component is given an invalid value
    #[error("InvalidParameter error: {0}")]
    InvalidParameter(String),
    /// When data or parameter shapes do not agree with the model dimension
    #[error("DimensionMismatch error: {0}")]
    DimensionMismatch(String),
    /// When linear algebra computation fails (ie covariance matrix not positive definite)
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
