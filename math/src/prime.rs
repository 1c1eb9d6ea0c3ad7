use crate::{FieldElement, MathError};
use num_bigint::BigUint;
use num_traits::Zero;
use std::fmt::{self, Debug, Display, Formatter};
use std::ops;
use std::sync::Arc;

/// A prime field `F_p` of arbitrary size, shared by all of its elements.
///
/// Primality of the modulus is not checked. Division relies on Fermat inversion and is
/// only meaningful when the modulus is prime.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PrimeField {
    modulus: Arc<BigUint>,
}

impl PrimeField {
    pub fn new(modulus: BigUint) -> Result<Self, MathError> {
        if modulus < BigUint::from(2u8) {
            return Err(MathError::InvalidModulus(modulus.to_string()));
        }
        Ok(Self { modulus: Arc::new(modulus) })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Number of bytes of the fixed width big-endian encoding of an element.
    pub fn byte_len(&self) -> usize {
        (self.modulus.bits() as usize).div_ceil(8)
    }

    /// Wraps `value`, which must already be reduced.
    pub fn element(&self, value: BigUint) -> Result<PrimeFieldElement, MathError> {
        if value >= *self.modulus {
            return Err(MathError::ValueOutOfRange { value: value.to_string(), modulus: self.modulus.to_string() });
        }
        Ok(PrimeFieldElement { value, field: self.clone() })
    }

    pub fn reduce(&self, value: &BigUint) -> PrimeFieldElement {
        PrimeFieldElement { value: value % self.modulus.as_ref(), field: self.clone() }
    }

    pub fn from_u64(&self, value: u64) -> PrimeFieldElement {
        self.reduce(&BigUint::from(value))
    }

    /// Decodes a big-endian integer of at most [`Self::byte_len`] bytes.
    pub fn from_bytes_be(&self, bytes: &[u8]) -> Result<PrimeFieldElement, MathError> {
        if bytes.len() > self.byte_len() {
            return Err(MathError::ByteLength { expected: self.byte_len(), actual: bytes.len() });
        }
        self.element(BigUint::from_bytes_be(bytes))
    }

    pub fn zero(&self) -> PrimeFieldElement {
        PrimeFieldElement { value: BigUint::zero(), field: self.clone() }
    }

    pub fn one(&self) -> PrimeFieldElement {
        self.from_u64(1)
    }
}

impl Debug for PrimeField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PrimeField({:#x})", self.modulus.as_ref())
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PrimeFieldElement {
    value: BigUint,
    field: PrimeField,
}

impl PrimeFieldElement {
    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.value
    }

    pub fn is_even(&self) -> bool {
        !self.value.bit(0)
    }

    /// Big-endian encoding left-padded to the field width.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let width = self.field.byte_len();
        let bytes = self.value.to_bytes_be();
        let mut out = vec![0u8; width - bytes.len()];
        out.extend_from_slice(&bytes);
        out
    }

    /// Square root for fields where `p ≡ 3 (mod 4)`. Returns `None` for non-residues
    /// and for fields of any other shape.
    pub fn sqrt(&self) -> Option<Self> {
        let p = self.field.modulus();
        if !(p.bit(0) && p.bit(1)) {
            return None;
        }
        let root = self.pow(&((p + 1u32) >> 2));
        (root.square() == *self).then_some(root)
    }

    #[inline]
    fn same_field(&self, rhs: &Self) -> &BigUint {
        assert!(
            Arc::ptr_eq(&self.field.modulus, &rhs.field.modulus) || self.field == rhs.field,
            "cannot combine elements of F_{} and F_{}",
            self.field.modulus,
            rhs.field.modulus
        );
        &self.field.modulus
    }

    #[inline]
    fn with_value(&self, value: BigUint) -> Self {
        Self { value, field: self.field.clone() }
    }
}

impl FieldElement for PrimeFieldElement {
    fn add(&self, rhs: &Self) -> Self {
        let p = self.same_field(rhs);
        let sum = &self.value + &rhs.value;
        self.with_value(if sum >= *p { sum - p } else { sum })
    }

    fn sub(&self, rhs: &Self) -> Self {
        let p = self.same_field(rhs);
        if self.value >= rhs.value {
            self.with_value(&self.value - &rhs.value)
        } else {
            self.with_value(p - (&rhs.value - &self.value))
        }
    }

    fn mul(&self, rhs: &Self) -> Self {
        let p = self.same_field(rhs);
        self.with_value((&self.value * &rhs.value) % p)
    }

    fn div(&self, rhs: &Self) -> Self {
        let p = self.same_field(rhs);
        assert!(!rhs.value.is_zero(), "division by zero in F_{p}");
        let inverse = rhs.value.modpow(&(p - 2u32), p);
        self.with_value((&self.value * inverse) % p)
    }

    fn pow(&self, exponent: &BigUint) -> Self {
        self.with_value(self.value.modpow(exponent, &self.field.modulus))
    }

    fn smul(&self, scalar: u64) -> Self {
        self.with_value((&self.value * scalar) % self.field.modulus.as_ref())
    }

    fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    fn value(&self) -> BigUint {
        self.value.clone()
    }

    fn zero(&self) -> Self {
        self.with_value(BigUint::zero())
    }

    fn square(&self) -> Self {
        self.with_value(self.value.modpow(&BigUint::from(2u8), &self.field.modulus))
    }
}

impl Display for PrimeFieldElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$x}", self.value, width = self.field.byte_len() * 2)
    }
}

impl Debug for PrimeFieldElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PrimeFieldElement({:#x})", self.value)
    }
}

macro_rules! forward_binop {
    ($($op:ident::$method:ident),* $(,)?) => {$(
        impl ops::$op<&PrimeFieldElement> for &PrimeFieldElement {
            type Output = PrimeFieldElement;

            #[inline]
            fn $method(self, rhs: &PrimeFieldElement) -> PrimeFieldElement {
                FieldElement::$method(self, rhs)
            }
        }
    )*};
}

forward_binop!(Add::add, Sub::sub, Mul::mul, Div::div);

impl ops::Neg for &PrimeFieldElement {
    type Output = PrimeFieldElement;

    fn neg(self) -> PrimeFieldElement {
        FieldElement::neg(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::RandBigInt;
    use num_traits::One;
    use rand_chacha::{ChaCha8Rng, rand_core::SeedableRng};

    fn secp256k1_field() -> PrimeField {
        let p = (BigUint::one() << 256u32) - (BigUint::one() << 32u32) - BigUint::from(977u32);
        PrimeField::new(p).unwrap()
    }

    #[test]
    fn test_construction() {
        let field = PrimeField::new(BigUint::from(31u32)).unwrap();
        assert!(field.element(BigUint::from(30u32)).is_ok());
        assert_eq!(
            field.element(BigUint::from(31u32)),
            Err(MathError::ValueOutOfRange { value: "31".to_string(), modulus: "31".to_string() })
        );
        assert_eq!(field.from_u64(65).as_biguint(), &BigUint::from(3u32));
        assert!(matches!(PrimeField::new(BigUint::one()), Err(MathError::InvalidModulus(_))));
        assert!(matches!(field.from_bytes_be(&[0, 1]), Err(MathError::ByteLength { expected: 1, actual: 2 })));
    }

    #[test]
    fn test_small_prime_vectors() {
        let f57 = PrimeField::new(BigUint::from(57u32)).unwrap();
        let e = |v| f57.from_u64(v);
        assert_eq!(&e(44) + &e(33), e(20));
        assert_eq!(&e(9) - &e(29), e(37));
        assert_eq!(&(&e(17) + &e(42)) + &e(49), e(51));
        assert_eq!(&(&e(52) - &e(30)) - &e(38), e(41));

        let f97 = PrimeField::new(BigUint::from(97u32)).unwrap();
        let e = |v| f97.from_u64(v);
        assert_eq!(&(&e(95) * &e(45)) * &e(31), e(23));
        assert_eq!(&(&(&e(17) * &e(13)) * &e(19)) * &e(44), e(68));
        assert_eq!(&e(12).pow(&BigUint::from(7u32)) * &e(77).pow(&BigUint::from(49u32)), e(63));

        let f31 = PrimeField::new(BigUint::from(31u32)).unwrap();
        let e = |v| f31.from_u64(v);
        assert_eq!(&e(3) / &e(24), e(4));
        assert_eq!(&f31.one() / &e(17).pow(&BigUint::from(3u32)), e(29));
        assert_eq!(&(&f31.one() / &e(4).pow(&BigUint::from(4u32))) * &e(11), e(13));
        assert_eq!(e(7).smul(5), e(4));
        assert_eq!(-&e(7), e(24));
        assert!(e(31).is_zero());
    }

    #[test]
    fn test_sqrt() {
        let f223 = PrimeField::new(BigUint::from(223u32)).unwrap();
        let root = f223.from_u64(7).sqrt().unwrap();
        assert!(root.value() == BigUint::from(197u32) || root.value() == BigUint::from(26u32));
        assert_eq!(f223.from_u64(5).sqrt(), None);
        // 13 ≡ 1 (mod 4)
        let f13 = PrimeField::new(BigUint::from(13u32)).unwrap();
        assert_eq!(f13.from_u64(4).sqrt(), None);
    }

    #[test]
    fn test_bytes_and_display() {
        let field = secp256k1_field();
        assert_eq!(field.byte_len(), 32);
        assert_eq!(field.zero().to_bytes_be(), vec![0u8; 32]);
        let mut expected = vec![0u8; 32];
        expected[30] = 1;
        expected[31] = 2;
        let e = field.from_bytes_be(&[1, 2]).unwrap();
        assert_eq!(e.to_bytes_be(), expected);
        assert_eq!(e.to_string(), format!("{}0102", "0".repeat(60)));
        assert!(field.from_bytes_be(&[0xff; 32]).is_err());

        let f31 = PrimeField::new(BigUint::from(31u32)).unwrap();
        assert_eq!(format!("{f31:?}"), "PrimeField(0x1f)");
        assert_eq!(format!("{:?}", f31.from_u64(10)), "PrimeFieldElement(0xa)");
    }

    #[test]
    fn test_field_axioms() {
        let field = secp256k1_field();
        let p = field.modulus().clone();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..64 {
            let a = field.element(rng.gen_biguint_below(&p)).unwrap();
            let b = field.element(rng.gen_biguint_below(&p)).unwrap();
            let c = field.element(rng.gen_biguint_below(&p)).unwrap();
            assert_eq!(a.add(&b), b.add(&a));
            assert_eq!(a.mul(&b.add(&c)), a.mul(&b).add(&a.mul(&c)));
            assert_eq!(a.sub(&b).add(&b), a);
            assert!(a.sub(&a).is_zero());
            assert_eq!(a.square(), a.mul(&a));
            assert_eq!(a.smul(3), a.add(&a).add(&a));
            if !b.is_zero() {
                assert_eq!(a.div(&b).mul(&b), a);
                assert_eq!(b.pow(&(&p - 1u32)), field.one());
            }
            if let Some(root) = a.square().sqrt() {
                assert!(root == a || root == a.neg());
            } else {
                panic!("square of {a} has no root");
            }
        }
    }

    #[test]
    #[should_panic(expected = "cannot combine elements")]
    fn test_mismatched_fields_panic() {
        let f31 = PrimeField::new(BigUint::from(31u32)).unwrap();
        let f37 = PrimeField::new(BigUint::from(37u32)).unwrap();
        let _ = f31.one().add(&f37.one());
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn test_division_by_zero_panics() {
        let f31 = PrimeField::new(BigUint::from(31u32)).unwrap();
        let _ = f31.one().div(&f31.zero());
    }
}
