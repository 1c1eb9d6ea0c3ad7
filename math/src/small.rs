use crate::{FieldElement, MathError};
use num_bigint::BigUint;
use std::fmt::{self, Display, Formatter};

/// Element of a prime field whose modulus fits in a `u64`.
///
/// Meant for textbook sized curves where every point can be enumerated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SmallFieldElement {
    value: u64,
    modulus: u64,
}

impl SmallFieldElement {
    pub fn new(value: u64, modulus: u64) -> Result<Self, MathError> {
        if modulus < 2 {
            return Err(MathError::InvalidModulus(modulus.to_string()));
        }
        if value >= modulus {
            return Err(MathError::ValueOutOfRange { value: value.to_string(), modulus: modulus.to_string() });
        }
        Ok(Self { value, modulus })
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn as_u64(&self) -> u64 {
        self.value
    }

    #[inline]
    fn same_field(&self, rhs: &Self) -> u64 {
        assert_eq!(self.modulus, rhs.modulus, "cannot combine elements of F_{} and F_{}", self.modulus, rhs.modulus);
        self.modulus
    }

    #[inline]
    fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
        ((a as u128 * b as u128) % m as u128) as u64
    }

    #[inline]
    fn with_value(&self, value: u64) -> Self {
        Self { value, modulus: self.modulus }
    }
}

impl FieldElement for SmallFieldElement {
    fn add(&self, rhs: &Self) -> Self {
        let m = self.same_field(rhs);
        self.with_value(((self.value as u128 + rhs.value as u128) % m as u128) as u64)
    }

    fn sub(&self, rhs: &Self) -> Self {
        let m = self.same_field(rhs);
        self.with_value(if self.value >= rhs.value { self.value - rhs.value } else { m - (rhs.value - self.value) })
    }

    fn mul(&self, rhs: &Self) -> Self {
        let m = self.same_field(rhs);
        self.with_value(Self::mul_mod(self.value, rhs.value, m))
    }

    fn div(&self, rhs: &Self) -> Self {
        let m = self.same_field(rhs);
        assert!(rhs.value != 0, "division by zero in F_{m}");
        let inverse = rhs.pow(&BigUint::from(m - 2));
        self.mul(&inverse)
    }

    fn pow(&self, exponent: &BigUint) -> Self {
        let m = self.modulus;
        let mut result = 1 % m;
        let mut base = self.value;
        for bit in 0..exponent.bits() {
            if exponent.bit(bit) {
                result = Self::mul_mod(result, base, m);
            }
            base = Self::mul_mod(base, base, m);
        }
        self.with_value(result)
    }

    fn smul(&self, scalar: u64) -> Self {
        self.with_value(Self::mul_mod(self.value, scalar % self.modulus, self.modulus))
    }

    fn is_zero(&self) -> bool {
        self.value == 0
    }

    fn value(&self) -> BigUint {
        BigUint::from(self.value)
    }
}

impl Display for SmallFieldElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
