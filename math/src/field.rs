use num_bigint::BigUint;
use std::fmt::{Debug, Display};

/// Arithmetic over the integers modulo a prime.
///
/// Operands must belong to the same field. Implementations panic when the moduli of
/// two operands differ and when dividing by zero, since both indicate a programming
/// error rather than bad input.
pub trait FieldElement: Clone + PartialEq + Eq + Debug + Display {
    fn add(&self, rhs: &Self) -> Self;

    fn sub(&self, rhs: &Self) -> Self;

    fn mul(&self, rhs: &Self) -> Self;

    /// Multiplies by the inverse of `rhs`. Panics if `rhs` is zero.
    fn div(&self, rhs: &Self) -> Self;

    fn pow(&self, exponent: &BigUint) -> Self;

    /// Adds the element to itself `scalar` times.
    fn smul(&self, scalar: u64) -> Self;

    fn is_zero(&self) -> bool;

    /// The integer representative in `[0, modulus)`.
    fn value(&self) -> BigUint;

    /// The additive identity of the element's field.
    fn zero(&self) -> Self {
        self.smul(0)
    }

    fn neg(&self) -> Self {
        self.zero().sub(self)
    }

    fn square(&self) -> Self {
        self.mul(self)
    }
}
