//! Elliptic curve points over any [`kestrel_math::FieldElement`], ECDSA over any prime
//! order subgroup, and the secp256k1 key types built on top of them.

pub mod curve;
pub mod ecdsa;
pub mod error;
pub mod keys;
pub mod secp256k1;
pub mod signature;

pub use curve::{Affine, Curve, Point};
pub use ecdsa::Ecdsa;
pub use error::EccError;
pub use keys::{PrivateKey, PublicKey};
pub use secp256k1::S256Point;
pub use signature::Signature;
