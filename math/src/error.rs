use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("value {value} is not in the field range [0, {modulus})")]
    ValueOutOfRange { value: String, modulus: String },

    #[error("modulus {0} cannot define a field")]
    InvalidModulus(String),

    #[error("expected at most {expected} bytes for a field element, got {actual}")]
    ByteLength { expected: usize, actual: usize },
}
