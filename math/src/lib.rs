//! Finite field arithmetic used by the curve and signature crates.
//!
//! Every curve operation is written against the [`FieldElement`] capability, so the
//! same point code runs over the 256-bit secp256k1 base field ([`PrimeFieldElement`])
//! and over tiny textbook fields ([`SmallFieldElement`]) in tests.

pub mod error;
pub mod field;
pub mod prime;
pub mod small;

pub use error::MathError;
pub use field::FieldElement;
pub use prime::{PrimeField, PrimeFieldElement};
pub use small::SmallFieldElement;

#[doc(hidden)]
pub use num_bigint;
