//! The secp256k1 parameter set: `y² = x³ + 7` over `F_p` with the standard generator.

use crate::{Curve, Ecdsa, Point};
use hex_literal::hex;
use kestrel_math::{PrimeField, PrimeFieldElement};
use num_bigint::BigUint;
use once_cell::sync::Lazy;

pub type S256Point = Point<PrimeFieldElement>;

const P: [u8; 32] = hex!("fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f");
const N: [u8; 32] = hex!("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141");
const GX: [u8; 32] = hex!("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798");
const GY: [u8; 32] = hex!("483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8");

static FIELD: Lazy<PrimeField> = Lazy::new(|| PrimeField::new(BigUint::from_bytes_be(&P)).expect("p is a valid modulus"));

static CURVE: Lazy<Curve<PrimeFieldElement>> = Lazy::new(|| Curve::new(FIELD.zero(), FIELD.from_u64(7)));

static GROUP: Lazy<Ecdsa<PrimeFieldElement>> = Lazy::new(|| {
    let x = FIELD.from_bytes_be(&GX).expect("Gx is a field element");
    let y = FIELD.from_bytes_be(&GY).expect("Gy is a field element");
    let generator = CURVE.point(x, y).expect("G is on the curve");
    Ecdsa::new(generator, BigUint::from_bytes_be(&N)).expect("G has order n")
});

pub fn field() -> &'static PrimeField {
    &FIELD
}

pub fn curve() -> &'static Curve<PrimeFieldElement> {
    &CURVE
}

pub fn group() -> &'static Ecdsa<PrimeFieldElement> {
    &GROUP
}

pub fn generator() -> &'static S256Point {
    GROUP.generator()
}

pub fn order() -> &'static BigUint {
    GROUP.order()
}
