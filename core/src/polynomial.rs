//! Dense univariate polynomials over the base field, radix-2 NTT evaluation,
//! and coset low-degree extension.

use core::ops::{Add, Mul, Sub};

use num_traits::Zero;

use crate::field::{Felt, ONE, ZERO};

// NTT
// ================================================================================================

/// In-place radix-2 number-theoretic transform over the size-n multiplicative
/// subgroup; `values` becomes the evaluations of the polynomial whose
/// coefficients it held.
///
/// # Panics
/// Panics if the length of `values` is not a power of two or exceeds the
/// two-adicity of the field.
pub fn ntt(values: &mut [Felt]) {
    let n = values.len();
    if n <= 1 {
        return;
    }
    let root = Felt::primitive_root_of_unity(n.trailing_zeros());
    ntt_with_root(values, root);
}

/// In-place inverse NTT; `values` becomes the coefficient form of the
/// polynomial with the given evaluations over the size-n subgroup.
pub fn intt(values: &mut [Felt]) {
    let n = values.len();
    if n <= 1 {
        return;
    }
    let root_inv = Felt::primitive_root_of_unity(n.trailing_zeros()).inverse();
    ntt_with_root(values, root_inv);
    let n_inv = Felt::new(n as u64).inverse();
    for value in values.iter_mut() {
        *value = *value * n_inv;
    }
}

fn ntt_with_root(values: &mut [Felt], root: Felt) {
    let n = values.len();
    debug_assert!(n.is_power_of_two());

    // bit-reversal permutation
    let log_n = n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - log_n);
        if i < j {
            values.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let step_root = root.pow((n / len) as u64);
        for start in (0..n).step_by(len) {
            let mut twiddle = ONE;
            for i in start..start + len / 2 {
                let even = values[i];
                let odd = values[i + len / 2] * twiddle;
                values[i] = even + odd;
                values[i + len / 2] = even - odd;
                twiddle *= step_root;
            }
        }
        len <<= 1;
    }
}

/// Evaluates the polynomial with the given coefficients over the coset
/// `offset · ⟨ω⟩` of size `domain_size`, zero-padding the coefficients.
///
/// # Panics
/// Panics if `domain_size` is smaller than the number of coefficients or not a
/// power of two.
pub fn coset_evaluate(coefficients: &[Felt], offset: Felt, domain_size: usize) -> Vec<Felt> {
    assert!(domain_size.is_power_of_two());
    assert!(coefficients.len() <= domain_size, "degree exceeds domain size");

    let mut values = vec![ZERO; domain_size];
    let mut power = ONE;
    for (value, &coefficient) in values.iter_mut().zip(coefficients) {
        *value = coefficient * power;
        power *= offset;
    }
    ntt(&mut values);
    values
}

/// Interpolates evaluations over the coset `offset · ⟨ω⟩` back into coefficient
/// form.
pub fn coset_interpolate(offset: Felt, values: &[Felt]) -> Vec<Felt> {
    let mut coefficients = values.to_vec();
    intt(&mut coefficients);
    let offset_inv = offset.inverse();
    let mut power = ONE;
    for coefficient in coefficients.iter_mut() {
        *coefficient = *coefficient * power;
        power *= offset_inv;
    }
    coefficients
}

// POLYNOMIAL
// ================================================================================================

/// A dense polynomial; `coefficients[i]` is the coefficient of Xⁱ. The
/// representation is normalized: the highest-degree coefficient, if any, is
/// non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    pub coefficients: Vec<Felt>,
}

impl Polynomial {
    pub fn new(mut coefficients: Vec<Felt>) -> Self {
        while coefficients.last() == Some(&ZERO) {
            coefficients.pop();
        }
        Self { coefficients }
    }

    pub fn zero() -> Self {
        Self { coefficients: vec![] }
    }

    pub fn one() -> Self {
        Self { coefficients: vec![ONE] }
    }

    /// The degree of the polynomial, or `None` for the zero polynomial.
    pub fn degree(&self) -> Option<usize> {
        self.coefficients.iter().rposition(|c| !c.is_zero())
    }

    pub fn is_zero(&self) -> bool {
        self.degree().is_none()
    }

    /// The coefficient of the highest-degree term, or zero for the zero
    /// polynomial.
    pub fn leading_coefficient(&self) -> Felt {
        self.degree().map(|d| self.coefficients[d]).unwrap_or(ZERO)
    }

    pub fn evaluate(&self, x: Felt) -> Felt {
        self.coefficients.iter().rev().fold(ZERO, |acc, &c| acc * x + c)
    }

    /// The unique monic polynomial vanishing exactly on the given points.
    pub fn zerofier(roots: &[Felt]) -> Self {
        let mut result = Self::one();
        for &root in roots {
            result = result * Self::new(vec![-root, ONE]);
        }
        result
    }

    pub fn formal_derivative(&self) -> Self {
        let coefficients = self
            .coefficients
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &c)| Felt::new(i as u64) * c)
            .collect();
        Self::new(coefficients)
    }

    pub fn scale(&self, factor: Felt) -> Self {
        Self::new(self.coefficients.iter().map(|&c| c * factor).collect())
    }

    /// Polynomial division with remainder.
    ///
    /// # Panics
    /// Panics if the divisor is zero.
    pub fn divide(&self, divisor: &Self) -> (Self, Self) {
        let divisor_degree = divisor.degree().expect("division by the zero polynomial");
        let leading_inv = divisor.leading_coefficient().inverse();

        let mut remainder = self.coefficients.clone();
        let self_degree = match self.degree() {
            Some(d) if d >= divisor_degree => d,
            _ => return (Self::zero(), self.clone()),
        };

        let mut quotient = vec![ZERO; self_degree - divisor_degree + 1];
        for i in (0..quotient.len()).rev() {
            let coefficient = remainder[i + divisor_degree] * leading_inv;
            quotient[i] = coefficient;
            for (j, &divisor_coefficient) in divisor.coefficients.iter().enumerate() {
                remainder[i + j] = remainder[i + j] - coefficient * divisor_coefficient;
            }
        }
        remainder.truncate(divisor_degree);
        (Self::new(quotient), Self::new(remainder))
    }

    /// Extended Euclidean algorithm: returns `(g, u, v)` with
    /// `u·self + v·other = g` and `g` the monic greatest common divisor.
    pub fn xgcd(&self, other: &Self) -> (Self, Self, Self) {
        let (mut old_r, mut r) = (self.clone(), other.clone());
        let (mut old_u, mut u) = (Self::one(), Self::zero());
        let (mut old_v, mut v) = (Self::zero(), Self::one());

        while !r.is_zero() {
            let (quotient, remainder) = old_r.divide(&r);
            old_r = core::mem::replace(&mut r, remainder);
            let next_u = old_u - quotient.clone() * u.clone();
            old_u = core::mem::replace(&mut u, next_u);
            let next_v = old_v - quotient * v.clone();
            old_v = core::mem::replace(&mut v, next_v);
        }

        let scale = old_r.leading_coefficient();
        if scale.is_zero() {
            return (old_r, old_u, old_v);
        }
        let scale_inv = scale.inverse();
        (old_r.scale(scale_inv), old_u.scale(scale_inv), old_v.scale(scale_inv))
    }
}

impl Add for Polynomial {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let len = self.coefficients.len().max(rhs.coefficients.len());
        let mut coefficients = vec![ZERO; len];
        for (i, &c) in self.coefficients.iter().enumerate() {
            coefficients[i] += c;
        }
        for (i, &c) in rhs.coefficients.iter().enumerate() {
            coefficients[i] += c;
        }
        Self::new(coefficients)
    }
}

impl Sub for Polynomial {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let len = self.coefficients.len().max(rhs.coefficients.len());
        let mut coefficients = vec![ZERO; len];
        for (i, &c) in self.coefficients.iter().enumerate() {
            coefficients[i] += c;
        }
        for (i, &c) in rhs.coefficients.iter().enumerate() {
            coefficients[i] -= c;
        }
        Self::new(coefficients)
    }
}

impl Mul for Polynomial {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        if self.is_zero() || rhs.is_zero() {
            return Self::zero();
        }
        let mut coefficients = vec![ZERO; self.coefficients.len() + rhs.coefficients.len() - 1];
        for (i, &a) in self.coefficients.iter().enumerate() {
            if a.is_zero() {
                continue;
            }
            for (j, &b) in rhs.coefficients.iter().enumerate() {
                coefficients[i + j] += a * b;
            }
        }
        Self::new(coefficients)
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn random_coefficients(rng: &mut StdRng, len: usize) -> Vec<Felt> {
        (0..len).map(|_| Felt::new(rng.random())).collect()
    }

    #[test]
    fn ntt_then_intt_is_the_identity() {
        let mut rng = StdRng::seed_from_u64(7);
        let original = random_coefficients(&mut rng, 64);
        let mut values = original.clone();
        ntt(&mut values);
        intt(&mut values);
        assert_eq!(values, original);
    }

    #[test]
    fn ntt_agrees_with_direct_evaluation() {
        let mut rng = StdRng::seed_from_u64(8);
        let coefficients = random_coefficients(&mut rng, 16);
        let polynomial = Polynomial::new(coefficients.clone());

        let mut values = coefficients;
        ntt(&mut values);

        let omega = Felt::primitive_root_of_unity(4);
        for (i, &value) in values.iter().enumerate() {
            assert_eq!(value, polynomial.evaluate(omega.pow(i as u64)));
        }
    }

    #[test]
    fn coset_evaluation_agrees_with_direct_evaluation() {
        let mut rng = StdRng::seed_from_u64(9);
        let coefficients = random_coefficients(&mut rng, 8);
        let polynomial = Polynomial::new(coefficients.clone());

        let offset = Felt::GENERATOR;
        let values = coset_evaluate(&coefficients, offset, 32);
        let omega = Felt::primitive_root_of_unity(5);
        for (i, &value) in values.iter().enumerate() {
            assert_eq!(value, polynomial.evaluate(offset * omega.pow(i as u64)));
        }

        let recovered = coset_interpolate(offset, &values);
        assert_eq!(&recovered[..8], &polynomial.coefficients[..]);
        assert!(recovered[8..].iter().all(Felt::is_zero));
    }

    #[test]
    fn division_with_remainder_reconstructs_the_dividend() {
        let mut rng = StdRng::seed_from_u64(10);
        let dividend = Polynomial::new(random_coefficients(&mut rng, 12));
        let divisor = Polynomial::new(random_coefficients(&mut rng, 5));

        let (quotient, remainder) = dividend.divide(&divisor);
        let reconstructed = quotient * divisor.clone() + remainder.clone();
        assert_eq!(
            reconstructed.coefficients[..12].to_vec(),
            dividend.coefficients
        );
        assert!(remainder.degree() < divisor.degree());
    }

    #[test]
    fn xgcd_produces_a_bezout_relation_for_squarefree_polynomials() {
        let roots: Vec<Felt> = [2u64, 3, 5, 7, 11].iter().map(|&r| Felt::new(r)).collect();
        let p = Polynomial::zerofier(&roots);
        let dp = p.formal_derivative();

        let (g, u, v) = p.xgcd(&dp);
        assert_eq!(g, Polynomial::one());

        // spot-check the relation at a few points
        for x in [0u64, 1, 12345, 999_999_999] {
            let x = Felt::new(x);
            assert_eq!(u.evaluate(x) * p.evaluate(x) + v.evaluate(x) * dp.evaluate(x), ONE);
        }
    }

    #[test]
    fn zerofier_vanishes_exactly_on_its_roots() {
        let roots: Vec<Felt> = [4u64, 8, 15].iter().map(|&r| Felt::new(r)).collect();
        let zerofier = Polynomial::zerofier(&roots);
        for &root in &roots {
            assert_eq!(zerofier.evaluate(root), ZERO);
        }
        assert_ne!(zerofier.evaluate(Felt::new(16)), ZERO);
    }
}
