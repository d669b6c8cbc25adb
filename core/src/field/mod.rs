//! Arithmetic in the Goldilocks prime field 𝔽ₚ with p = 2⁶⁴ − 2³² + 1, and in
//! its cubic extension.

use core::fmt;
use core::iter::{Product, Sum};
use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num_traits::{One, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

mod extension;
pub use extension::XFelt;

// CONSTANTS
// ================================================================================================

/// Field modulus p = 2⁶⁴ − 2³² + 1.
pub const MODULUS: u64 = 0xffff_ffff_0000_0001;

pub const ZERO: Felt = Felt::new(0);
pub const ONE: Felt = Felt::new(1);

// BASE FIELD ELEMENT
// ================================================================================================

/// An element of the Goldilocks prime field, stored in canonical form in `[0, p)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Felt(u64);

impl Felt {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1);

    /// A generator of the multiplicative group of the field.
    pub const GENERATOR: Self = Self(7);

    /// The number of times the multiplicative group's order is divisible by 2.
    pub const TWO_ADICITY: u32 = 32;

    /// A primitive 2³²-th root of unity, i.e. `GENERATOR^((p − 1) / 2³²)`.
    const TWO_ADIC_ROOT: Self = Self(1_753_635_133_440_165_772);

    /// Creates a field element from the given integer, reducing modulo p.
    pub const fn new(value: u64) -> Self {
        Self(value % MODULUS)
    }

    /// Returns the canonical integer representation of this element.
    pub const fn value(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Raises this element to the power of `exp`.
    pub fn pow(&self, exp: u64) -> Self {
        let mut base = *self;
        let mut result = Self::ONE;
        let mut exp = exp;
        while exp > 0 {
            if exp & 1 == 1 {
                result *= base;
            }
            base *= base;
            exp >>= 1;
        }
        result
    }

    /// Returns the multiplicative inverse of this element, or `None` for zero.
    pub fn try_inverse(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        // a^(p − 2) = a^(−1) by Fermat's little theorem
        Some(self.pow(MODULUS - 2))
    }

    /// Returns the multiplicative inverse of this element.
    ///
    /// # Panics
    /// Panics if this element is zero.
    pub fn inverse(&self) -> Self {
        self.try_inverse().expect("attempted to invert zero")
    }

    /// Returns a primitive root of unity of order 2^`log2_order`.
    ///
    /// # Panics
    /// Panics if `log2_order` exceeds the two-adicity of the field.
    pub fn primitive_root_of_unity(log2_order: u32) -> Self {
        assert!(log2_order <= Self::TWO_ADICITY, "field has no root of unity of order 2^{log2_order}");
        let mut root = Self::TWO_ADIC_ROOT;
        for _ in 0..(Self::TWO_ADICITY - log2_order) {
            root *= root;
        }
        root
    }

    const fn reduce_u128(x: u128) -> u64 {
        // Split x into 64 + 32 + 32 bits; 2⁶⁴ ≡ 2³² − 1 and 2⁹⁶ ≡ −1 (mod p).
        let lo = x as u64;
        let mid = ((x >> 64) as u64) & 0xffff_ffff;
        let hi = (x >> 96) as u64;
        let acc = lo as u128 + (mid as u128) * 0xffff_ffff + (MODULUS - hi) as u128;
        (acc % MODULUS as u128) as u64
    }
}

/// Replaces every non-zero element of `values` with its inverse using a single
/// field inversion; zero elements are left untouched.
pub fn batch_inverse(values: &[Felt]) -> Vec<Felt> {
    let mut running = Vec::with_capacity(values.len());
    let mut acc = ONE;
    for &value in values {
        running.push(acc);
        if !value.is_zero() {
            acc *= value;
        }
    }
    let mut inv = acc.inverse();
    let mut result = vec![ZERO; values.len()];
    for i in (0..values.len()).rev() {
        if values[i].is_zero() {
            continue;
        }
        result[i] = inv * running[i];
        inv *= values[i];
    }
    result
}

// ARITHMETIC
// ================================================================================================

impl Add for Felt {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let sum = self.0 as u128 + rhs.0 as u128;
        Self((sum % MODULUS as u128) as u64)
    }
}

impl Sub for Felt {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        if self.0 >= rhs.0 {
            Self(self.0 - rhs.0)
        } else {
            Self(MODULUS - rhs.0 + self.0)
        }
    }
}

impl Mul for Felt {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(Self::reduce_u128(self.0 as u128 * rhs.0 as u128))
    }
}

impl Neg for Felt {
    type Output = Self;

    fn neg(self) -> Self {
        if self.0 == 0 { self } else { Self(MODULUS - self.0) }
    }
}

impl AddAssign for Felt {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Felt {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Felt {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Sum for Felt {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ZERO, |acc, x| acc + x)
    }
}

impl Product for Felt {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ONE, |acc, x| acc * x)
    }
}

impl Zero for Felt {
    fn zero() -> Self {
        ZERO
    }

    fn is_zero(&self) -> bool {
        Felt::is_zero(self)
    }
}

impl One for Felt {
    fn one() -> Self {
        ONE
    }
}

// CONVERSIONS
// ================================================================================================

impl From<u64> for Felt {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<u32> for Felt {
    fn from(value: u32) -> Self {
        Self(value as u64)
    }
}

impl From<u8> for Felt {
    fn from(value: u8) -> Self {
        Self(value as u64)
    }
}

impl From<bool> for Felt {
    fn from(value: bool) -> Self {
        Self(value as u64)
    }
}

impl From<usize> for Felt {
    fn from(value: usize) -> Self {
        Self::new(value as u64)
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// SERIALIZATION
// ================================================================================================

impl Serialize for Felt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for Felt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        if value >= MODULUS {
            return Err(serde::de::Error::custom(format!(
                "value {value} is not a canonical field element"
            )));
        }
        Ok(Self(value))
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn modular_reduction_wraps_at_the_modulus() {
        assert_eq!(Felt::new(MODULUS), ZERO);
        assert_eq!(Felt::new(MODULUS + 1), ONE);
        assert_eq!(Felt::new(u64::MAX).value(), u64::MAX - MODULUS);
    }

    #[test]
    fn subtraction_wraps_around_zero() {
        assert_eq!(ZERO - ONE, Felt::new(MODULUS - 1));
        assert_eq!(-ONE, Felt::new(MODULUS - 1));
        assert_eq!(ZERO - ONE + ONE, ZERO);
    }

    #[test]
    fn inverse_of_zero_is_undefined() {
        assert!(ZERO.try_inverse().is_none());
    }

    #[test]
    fn two_adic_root_has_the_advertised_order() {
        let root = Felt::primitive_root_of_unity(Felt::TWO_ADICITY);
        assert_eq!(root.pow(1 << 31).pow(2), ONE);
        assert_ne!(root.pow(1 << 31), ONE);

        let small = Felt::primitive_root_of_unity(3);
        assert_eq!(small.pow(8), ONE);
        assert_ne!(small.pow(4), ONE);
    }

    #[test]
    fn batch_inverse_matches_single_inversions_and_skips_zeros() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut values: Vec<Felt> = (0..50).map(|_| Felt::new(rng.random())).collect();
        values[7] = ZERO;
        values[31] = ZERO;

        let inverses = batch_inverse(&values);
        for (value, inverse) in values.iter().zip(&inverses) {
            if value.is_zero() {
                assert_eq!(*inverse, ZERO);
            } else {
                assert_eq!(*value * *inverse, ONE);
            }
        }
    }

    proptest! {
        #[test]
        fn multiplication_and_inversion_are_consistent(raw in 1u64..MODULUS) {
            let x = Felt::new(raw);
            prop_assert_eq!(x * x.inverse(), ONE);
        }

        #[test]
        fn addition_is_associative(a in 0u64..MODULUS, b in 0u64..MODULUS, c in 0u64..MODULUS) {
            let (a, b, c) = (Felt::new(a), Felt::new(b), Felt::new(c));
            prop_assert_eq!((a + b) + c, a + (b + c));
        }

        #[test]
        fn multiplication_distributes_over_addition(
            a in 0u64..MODULUS,
            b in 0u64..MODULUS,
            c in 0u64..MODULUS,
        ) {
            let (a, b, c) = (Felt::new(a), Felt::new(b), Felt::new(c));
            prop_assert_eq!(a * (b + c), a * b + a * c);
        }
    }
}
