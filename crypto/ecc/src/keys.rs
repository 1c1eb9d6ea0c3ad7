use crate::{EccError, Signature, secp256k1::{self, S256Point}};
use kestrel_hashes::Hash160;
use kestrel_math::FieldElement;
use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand::Rng;
use std::fmt::{self, Debug, Display, Formatter};

pub const COMPRESSED_SEC_SIZE: usize = 33;
pub const UNCOMPRESSED_SEC_SIZE: usize = 65;

const EVEN_PREFIX: u8 = 0x02;
const ODD_PREFIX: u8 = 0x03;
const UNCOMPRESSED_PREFIX: u8 = 0x04;

/// A secp256k1 secret scalar together with its public key.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    secret: BigUint,
    public: PublicKey,
}

impl PrivateKey {
    pub fn new(secret: BigUint) -> Result<Self, EccError> {
        secp256k1::group().check_secret(&secret)?;
        let public = PublicKey { point: secp256k1::group().public_point(&secret) };
        Ok(Self { secret, public })
    }

    pub fn from_bytes_be(bytes: &[u8]) -> Result<Self, EccError> {
        Self::new(BigUint::from_bytes_be(bytes))
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let secret = rng.gen_biguint_range(&BigUint::one(), secp256k1::order());
        let public = PublicKey { point: secp256k1::group().public_point(&secret) };
        Self { secret, public }
    }

    pub fn secret(&self) -> &BigUint {
        &self.secret
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Deterministic (RFC 6979) low-s signature of digest `z`.
    pub fn sign(&self, z: &BigUint) -> Signature {
        secp256k1::group().sign_unchecked(&self.secret, z)
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey").field("public", &self.public).finish_non_exhaustive()
    }
}

/// A finite secp256k1 point used to check signatures.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PublicKey {
    point: S256Point,
}

impl PublicKey {
    pub fn from_point(point: S256Point) -> Result<Self, EccError> {
        if point.is_infinity() {
            return Err(EccError::InfinityPublicKey);
        }
        if point.curve() != secp256k1::curve() {
            let (x, y) = point.coordinates().map(|(x, y)| (x.to_string(), y.to_string())).unwrap_or_default();
            return Err(EccError::NotOnCurve { x, y });
        }
        Ok(Self { point })
    }

    pub fn point(&self) -> &S256Point {
        &self.point
    }

    pub fn sec(&self, compressed: bool) -> Vec<u8> {
        let Some((x, y)) = self.point.coordinates() else {
            unreachable!("public keys are finite points")
        };
        if compressed {
            let mut out = Vec::with_capacity(COMPRESSED_SEC_SIZE);
            out.push(if y.is_even() { EVEN_PREFIX } else { ODD_PREFIX });
            out.extend(x.to_bytes_be());
            out
        } else {
            let mut out = Vec::with_capacity(UNCOMPRESSED_SEC_SIZE);
            out.push(UNCOMPRESSED_PREFIX);
            out.extend(x.to_bytes_be());
            out.extend(y.to_bytes_be());
            out
        }
    }

    /// Decodes a compressed (`02`/`03` prefix) or uncompressed (`04` prefix) key.
    pub fn from_sec(bytes: &[u8]) -> Result<Self, EccError> {
        let field = secp256k1::field();
        let curve = secp256k1::curve();
        let (&prefix, body) = bytes.split_first().ok_or(EccError::InvalidSec("empty key"))?;
        let point = match prefix {
            UNCOMPRESSED_PREFIX => {
                if bytes.len() != UNCOMPRESSED_SEC_SIZE {
                    return Err(EccError::InvalidSec("uncompressed key must be 65 bytes"));
                }
                let x = field.from_bytes_be(&body[..32])?;
                let y = field.from_bytes_be(&body[32..])?;
                curve.point(x, y)?
            }
            EVEN_PREFIX | ODD_PREFIX => {
                if bytes.len() != COMPRESSED_SEC_SIZE {
                    return Err(EccError::InvalidSec("compressed key must be 33 bytes"));
                }
                let x = field.from_bytes_be(body)?;
                let alpha = x.square().mul(&x).add(curve.b());
                let beta = alpha.sqrt().ok_or(EccError::InvalidSec("x coordinate is not on the curve"))?;
                let y = if beta.is_even() == (prefix == EVEN_PREFIX) { beta } else { beta.neg() };
                curve.point(x, y)?
            }
            _ => return Err(EccError::InvalidSec("unknown prefix")),
        };
        Ok(Self { point })
    }

    pub fn hash160(&self, compressed: bool) -> Hash160 {
        kestrel_hashes::hash160(&self.sec(compressed))
    }

    pub fn verify(&self, z: &BigUint, signature: &Signature) -> bool {
        secp256k1::group().verify(&self.point, z, signature)
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.sec(true)))
    }
}
