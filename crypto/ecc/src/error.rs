use kestrel_math::MathError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EccError {
    #[error("point ({x}, {y}) is not on the curve")]
    NotOnCurve { x: String, y: String },

    #[error("scalar is outside of [1, {0})")]
    ScalarOutOfRange(String),

    #[error("{0} is not a generator of a group of order {1}")]
    InvalidGroup(String, String),

    #[error("invalid DER signature: {0}")]
    InvalidDer(&'static str),

    #[error("invalid SEC public key: {0}")]
    InvalidSec(&'static str),

    #[error("the point at infinity cannot be used as a public key")]
    InfinityPublicKey,

    #[error(transparent)]
    Math(#[from] MathError),
}
