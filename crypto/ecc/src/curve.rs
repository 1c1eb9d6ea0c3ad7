use crate::EccError;
use kestrel_math::FieldElement;
use num_bigint::BigUint;
use std::fmt::{self, Display, Formatter};
use std::ops;

/// Short Weierstrass curve `y² = x³ + ax + b` over the field of `F`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Curve<F> {
    a: F,
    b: F,
}

impl<F: FieldElement> Curve<F> {
    pub fn new(a: F, b: F) -> Self {
        Self { a, b }
    }

    pub fn a(&self) -> &F {
        &self.a
    }

    pub fn b(&self) -> &F {
        &self.b
    }

    pub fn contains(&self, x: &F, y: &F) -> bool {
        y.square() == x.square().mul(x).add(&self.a.mul(x)).add(&self.b)
    }

    pub fn point(&self, x: F, y: F) -> Result<Point<F>, EccError> {
        Point::new(x, y, self.clone())
    }

    pub fn infinity(&self) -> Point<F> {
        Point::Infinity(self.clone())
    }
}

/// Coordinates of a finite point. Only reachable through [`Point::new`], so they
/// always satisfy the curve equation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Affine<F> {
    x: F,
    y: F,
    curve: Curve<F>,
}

impl<F> Affine<F> {
    pub fn x(&self) -> &F {
        &self.x
    }

    pub fn y(&self) -> &F {
        &self.y
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Point<F> {
    Infinity(Curve<F>),
    Affine(Affine<F>),
}

impl<F: FieldElement> Point<F> {
    pub fn new(x: F, y: F, curve: Curve<F>) -> Result<Self, EccError> {
        if !curve.contains(&x, &y) {
            return Err(EccError::NotOnCurve { x: x.to_string(), y: y.to_string() });
        }
        Ok(Point::Affine(Affine { x, y, curve }))
    }

    pub fn infinity(curve: Curve<F>) -> Self {
        Point::Infinity(curve)
    }

    /// Used for results of the group law, which stay on the curve by construction.
    /// Panics if they do not.
    fn from_group_law(x: F, y: F, curve: &Curve<F>) -> Self {
        assert!(curve.contains(&x, &y), "group law produced ({x}, {y}) off the curve");
        Point::Affine(Affine { x, y, curve: curve.clone() })
    }

    pub fn curve(&self) -> &Curve<F> {
        match self {
            Point::Infinity(curve) => curve,
            Point::Affine(affine) => &affine.curve,
        }
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity(_))
    }

    pub fn x(&self) -> Option<&F> {
        self.coordinates().map(|(x, _)| x)
    }

    pub fn y(&self) -> Option<&F> {
        self.coordinates().map(|(_, y)| y)
    }

    pub fn coordinates(&self) -> Option<(&F, &F)> {
        match self {
            Point::Infinity(_) => None,
            Point::Affine(affine) => Some((&affine.x, &affine.y)),
        }
    }

    pub fn negate(&self) -> Self {
        match self {
            Point::Infinity(_) => self.clone(),
            Point::Affine(p) => Self::from_group_law(p.x.clone(), p.y.neg(), &p.curve),
        }
    }

    /// Group addition. Panics if the points lie on different curves.
    pub fn add(&self, other: &Self) -> Self {
        assert!(self.curve() == other.curve(), "points {self} and {other} are not on the same curve");
        let (p, q) = match (self, other) {
            (Point::Infinity(_), _) => return other.clone(),
            (_, Point::Infinity(_)) => return self.clone(),
            (Point::Affine(p), Point::Affine(q)) => (p, q),
        };

        let slope = if p.x != q.x {
            q.y.sub(&p.y).div(&q.x.sub(&p.x))
        } else if p.y != q.y || p.y.is_zero() {
            // vertical line: inverse points, or a tangent at a point of order two
            return self.curve().infinity();
        } else {
            p.x.square().smul(3).add(&p.curve.a).div(&p.y.smul(2))
        };

        let x = slope.square().sub(&p.x).sub(&q.x);
        let y = slope.mul(&p.x.sub(&x)).sub(&p.y);
        Self::from_group_law(x, y, &p.curve)
    }

    pub fn double(&self) -> Self {
        self.add(self)
    }

    /// Right-to-left double-and-add over the bits of `coefficient`.
    pub fn smul(&self, coefficient: &BigUint) -> Self {
        let mut result = self.curve().infinity();
        let mut current = self.clone();
        for bit in 0..coefficient.bits() {
            if coefficient.bit(bit) {
                result = result.add(&current);
            }
            current = current.double();
        }
        result
    }
}

impl<F: FieldElement> Display for Point<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Point::Infinity(_) => write!(f, "Point(infinity)"),
            Point::Affine(p) => write!(f, "Point({}, {})_{}_{}", p.x, p.y, p.curve.a, p.curve.b),
        }
    }
}

impl<F: FieldElement> ops::Add<&Point<F>> for &Point<F> {
    type Output = Point<F>;

    fn add(self, rhs: &Point<F>) -> Point<F> {
        Point::add(self, rhs)
    }
}

impl<F: FieldElement> ops::Neg for &Point<F> {
    type Output = Point<F>;

    fn neg(self) -> Point<F> {
        self.negate()
    }
}

impl<F: FieldElement> ops::Mul<&BigUint> for &Point<F> {
    type Output = Point<F>;

    fn mul(self, coefficient: &BigUint) -> Point<F> {
        self.smul(coefficient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_math::SmallFieldElement;

    const PRIME: u64 = 223;

    fn fe(value: u64) -> SmallFieldElement {
        SmallFieldElement::new(value, PRIME).unwrap()
    }

    fn curve() -> Curve<SmallFieldElement> {
        Curve::new(fe(0), fe(7))
    }

    fn point(x: u64, y: u64) -> Point<SmallFieldElement> {
        curve().point(fe(x), fe(y)).unwrap()
    }

    #[test]
    fn test_on_curve() {
        for (x, y) in [(192, 105), (17, 56), (1, 193)] {
            assert!(curve().point(fe(x), fe(y)).is_ok(), "({x}, {y}) should be on the curve");
        }
        for (x, y) in [(200, 119), (42, 99)] {
            assert_eq!(
                curve().point(fe(x), fe(y)),
                Err(EccError::NotOnCurve { x: x.to_string(), y: y.to_string() }),
                "({x}, {y}) should not be on the curve"
            );
        }
    }

    #[test]
    fn test_add() {
        struct TestCase {
            p: (u64, u64),
            q: (u64, u64),
            sum: (u64, u64),
        }

        let tests = vec![
            TestCase { p: (170, 142), q: (60, 139), sum: (220, 181) },
            TestCase { p: (47, 71), q: (17, 56), sum: (215, 68) },
            TestCase { p: (143, 98), q: (76, 66), sum: (47, 71) },
            TestCase { p: (192, 105), q: (192, 105), sum: (49, 71) },
        ];

        for test in tests {
            let p = point(test.p.0, test.p.1);
            let q = point(test.q.0, test.q.1);
            assert_eq!(p.add(&q), point(test.sum.0, test.sum.1), "{p} + {q}");
            assert_eq!(&q + &p, point(test.sum.0, test.sum.1), "{q} + {p}");
        }
    }

    #[test]
    fn test_identity_and_inverse() {
        let inf = curve().infinity();
        let p = point(47, 71);
        assert_eq!(p.add(&inf), p);
        assert_eq!(inf.add(&p), p);
        assert_eq!(inf.add(&inf), inf);
        assert_eq!(p.negate(), point(47, 223 - 71));
        assert!(p.add(&p.negate()).is_infinity());
        assert!((-&inf).is_infinity());
        assert_eq!(p.x(), Some(&fe(47)));
        assert_eq!(inf.coordinates(), None);
    }

    #[test]
    fn test_smul() {
        struct TestCase {
            coefficient: u32,
            p: (u64, u64),
            expected: Option<(u64, u64)>,
        }

        let tests = vec![
            TestCase { coefficient: 2, p: (192, 105), expected: Some((49, 71)) },
            TestCase { coefficient: 2, p: (143, 98), expected: Some((64, 168)) },
            TestCase { coefficient: 2, p: (47, 71), expected: Some((36, 111)) },
            TestCase { coefficient: 4, p: (47, 71), expected: Some((194, 51)) },
            TestCase { coefficient: 8, p: (47, 71), expected: Some((116, 55)) },
            TestCase { coefficient: 21, p: (47, 71), expected: None },
            TestCase { coefficient: 0, p: (47, 71), expected: None },
            TestCase { coefficient: 1, p: (47, 71), expected: Some((47, 71)) },
            TestCase { coefficient: 3, p: (15, 86), expected: Some((69, 137)) },
            TestCase { coefficient: 7, p: (15, 86), expected: None },
            TestCase { coefficient: 8, p: (15, 86), expected: Some((15, 86)) },
        ];

        for test in tests {
            let p = point(test.p.0, test.p.1);
            let expected = match test.expected {
                Some((x, y)) => point(x, y),
                None => curve().infinity(),
            };
            assert_eq!(p.smul(&BigUint::from(test.coefficient)), expected, "{} * {p}", test.coefficient);
        }
    }

    #[test]
    fn test_group_properties() {
        // (47, 71) generates a subgroup of order 21, enumerate it
        let generator = point(47, 71);
        let points: Vec<_> = (0..21u32).map(|k| generator.smul(&BigUint::from(k))).collect();

        for (j, p) in points.iter().enumerate() {
            assert_eq!(p.add(&p.negate()), curve().infinity());
            for (k, q) in points.iter().enumerate() {
                assert_eq!(p.add(q), q.add(p));
                assert_eq!(p.add(q), points[(j + k) % 21]);
                let jk = BigUint::from((j + k) as u32);
                assert_eq!(
                    generator.smul(&jk),
                    generator.smul(&BigUint::from(j as u32)).add(&generator.smul(&BigUint::from(k as u32)))
                );
            }
        }
        assert_eq!(points[3].add(&points[5]).add(&points[7]), points[3].add(&points[5].add(&points[7])));
    }

    #[test]
    #[should_panic(expected = "not on the same curve")]
    fn test_curve_mismatch_panics() {
        let other = Curve::new(fe(5), fe(7));
        let inf = other.infinity();
        let _ = point(47, 71).add(&inf);
    }

    #[test]
    #[should_panic(expected = "off the curve")]
    fn test_group_law_result_off_curve_panics() {
        let _ = Point::from_group_law(fe(200), fe(119), &curve());
    }

    #[test]
    fn test_display() {
        assert_eq!(point(47, 71).to_string(), "Point(47, 71)_0_7");
        assert_eq!(curve().infinity().to_string(), "Point(infinity)");
    }
}
