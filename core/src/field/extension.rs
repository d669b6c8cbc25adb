//! The cubic extension 𝔽ₚ[x]/(x³ − x + 1), used by the extension-field stack
//! instructions.

use core::fmt;
use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use super::Felt;

/// An element of the cubic extension field, with `coefficients[i]` the
/// coefficient of xⁱ.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct XFelt {
    pub coefficients: [Felt; 3],
}

impl XFelt {
    pub const ZERO: Self = Self::new([Felt::ZERO, Felt::ZERO, Felt::ZERO]);
    pub const ONE: Self = Self::new([Felt::ONE, Felt::ZERO, Felt::ZERO]);

    pub const fn new(coefficients: [Felt; 3]) -> Self {
        Self { coefficients }
    }

    /// Embeds a base field element as a constant polynomial.
    pub const fn lift(value: Felt) -> Self {
        Self::new([value, Felt::ZERO, Felt::ZERO])
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients.iter().all(Felt::is_zero)
    }

    /// Returns the multiplicative inverse, or `None` for zero.
    ///
    /// Multiplication by `self` is a linear map on coefficient vectors; the
    /// inverse is recovered by solving that 3×3 system with Cramer's rule.
    pub fn try_inverse(&self) -> Option<Self> {
        let [a0, a1, a2] = self.coefficients;

        // columns of the multiplication-by-self matrix in the basis {1, x, x²},
        // using x³ = x − 1 and x⁴ = x² − x
        let (m00, m01, m02) = (a0, -a2, -a1);
        let (m10, m11, m12) = (a1, a0 + a2, a1 - a2);
        let (m20, m21, m22) = (a2, a1, a0 + a2);

        let det = m00 * (m11 * m22 - m12 * m21) - m01 * (m10 * m22 - m12 * m20)
            + m02 * (m10 * m21 - m11 * m20);
        let det_inv = det.try_inverse()?;

        let c00 = m11 * m22 - m12 * m21;
        let c01 = -(m10 * m22 - m12 * m20);
        let c02 = m10 * m21 - m11 * m20;

        Some(Self::new([c00 * det_inv, c01 * det_inv, c02 * det_inv]))
    }

    /// Returns the multiplicative inverse.
    ///
    /// # Panics
    /// Panics if this element is zero.
    pub fn inverse(&self) -> Self {
        self.try_inverse().expect("attempted to invert zero")
    }
}

impl Add for XFelt {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let [a0, a1, a2] = self.coefficients;
        let [b0, b1, b2] = rhs.coefficients;
        Self::new([a0 + b0, a1 + b1, a2 + b2])
    }
}

impl Sub for XFelt {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let [a0, a1, a2] = self.coefficients;
        let [b0, b1, b2] = rhs.coefficients;
        Self::new([a0 - b0, a1 - b1, a2 - b2])
    }
}

impl Mul for XFelt {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let [a0, a1, a2] = self.coefficients;
        let [b0, b1, b2] = rhs.coefficients;

        let d0 = a0 * b0;
        let d1 = a0 * b1 + a1 * b0;
        let d2 = a0 * b2 + a1 * b1 + a2 * b0;
        let d3 = a1 * b2 + a2 * b1;
        let d4 = a2 * b2;

        // reduce modulo x³ − x + 1
        Self::new([d0 - d3, d1 + d3 - d4, d2 + d4])
    }
}

impl Mul<Felt> for XFelt {
    type Output = Self;

    fn mul(self, rhs: Felt) -> Self {
        let [a0, a1, a2] = self.coefficients;
        Self::new([a0 * rhs, a1 * rhs, a2 * rhs])
    }
}

impl Neg for XFelt {
    type Output = Self;

    fn neg(self) -> Self {
        let [a0, a1, a2] = self.coefficients;
        Self::new([-a0, -a1, -a2])
    }
}

impl AddAssign for XFelt {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for XFelt {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for XFelt {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Zero for XFelt {
    fn zero() -> Self {
        Self::ZERO
    }

    fn is_zero(&self) -> bool {
        XFelt::is_zero(self)
    }
}

impl One for XFelt {
    fn one() -> Self {
        Self::ONE
    }
}

impl From<Felt> for XFelt {
    fn from(value: Felt) -> Self {
        Self::lift(value)
    }
}

impl fmt::Display for XFelt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [c0, c1, c2] = self.coefficients;
        write!(f, "({c0} + {c1}·x + {c2}·x²)")
    }
}

impl fmt::Debug for XFelt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn random_xfelt(rng: &mut StdRng) -> XFelt {
        XFelt::new([
            Felt::new(rng.random()),
            Felt::new(rng.random()),
            Felt::new(rng.random()),
        ])
    }

    #[test]
    fn x_cubed_reduces_to_x_minus_one() {
        let x = XFelt::new([Felt::ZERO, Felt::ONE, Felt::ZERO]);
        let x_cubed = x * x * x;
        assert_eq!(x_cubed, XFelt::new([-Felt::ONE, Felt::ONE, Felt::ZERO]));
    }

    #[test]
    fn inverse_round_trips_for_random_elements() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..100 {
            let x = random_xfelt(&mut rng);
            if x.is_zero() {
                continue;
            }
            assert_eq!(x * x.inverse(), XFelt::ONE);
        }
    }

    #[test]
    fn inverse_of_zero_is_undefined() {
        assert!(XFelt::ZERO.try_inverse().is_none());
    }

    #[test]
    fn lifted_elements_multiply_like_base_elements() {
        let a = Felt::new(12345);
        let b = Felt::new(67890);
        assert_eq!(XFelt::lift(a) * XFelt::lift(b), XFelt::lift(a * b));
    }
}
