//! STARK parameter set and its validation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    #[error("security level must be positive")]
    ZeroSecurityLevel,
    #[error("blow-up factor {0} is not a power of two")]
    BlowupNotPowerOfTwo(usize),
    #[error("blow-up factor {actual} is below the minimum of {minimum}")]
    BlowupTooSmall { actual: usize, minimum: usize },
    #[error("{actual} queries are too few for security level {security_level}; need at least {minimum}")]
    TooFewQueries { actual: usize, minimum: usize, security_level: usize },
    #[error("FRI folding factor {0} is unsupported; only factor 2 is")]
    UnsupportedFoldingFactor(usize),
    #[error("padded height 2^{0} exceeds the supported maximum")]
    PaddedHeightTooLarge(u32),
}

/// The parameter set of the proving system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarkParameters {
    /// Target security level λ in bits.
    pub security_level: usize,
    /// Blow-up factor β of the low-degree extension; the Reed–Solomon rate is
    /// 1/β.
    pub blowup_factor: usize,
    /// Number of FRI query positions.
    pub num_queries: usize,
    /// FRI folding factor φ.
    pub fri_folding_factor: usize,
}

impl StarkParameters {
    /// The smallest blow-up factor leaving headroom for the maximum AIR
    /// constraint degree.
    pub const MIN_BLOWUP_FACTOR: usize = 8;

    /// Upper limit on `log₂` of the padded trace height, bounded by the
    /// two-adicity of the field less the blow-up.
    pub const MAX_LOG2_PADDED_HEIGHT: u32 = 28;

    pub fn new(security_level: usize, blowup_factor: usize, num_queries: usize) -> Self {
        Self { security_level, blowup_factor, num_queries, fri_folding_factor: 2 }
    }

    /// Checks the structural well-formedness of the parameter set.
    ///
    /// # Errors
    /// Returns the first violated requirement.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.security_level == 0 {
            return Err(ParameterError::ZeroSecurityLevel);
        }
        if !self.blowup_factor.is_power_of_two() {
            return Err(ParameterError::BlowupNotPowerOfTwo(self.blowup_factor));
        }
        if self.blowup_factor < Self::MIN_BLOWUP_FACTOR {
            return Err(ParameterError::BlowupTooSmall {
                actual: self.blowup_factor,
                minimum: Self::MIN_BLOWUP_FACTOR,
            });
        }
        let minimum_queries = self.security_level.div_ceil(3);
        if self.num_queries < minimum_queries {
            return Err(ParameterError::TooFewQueries {
                actual: self.num_queries,
                minimum: minimum_queries,
                security_level: self.security_level,
            });
        }
        if self.fri_folding_factor != 2 {
            return Err(ParameterError::UnsupportedFoldingFactor(self.fri_folding_factor));
        }
        Ok(())
    }

    /// Degree bound (exclusive) of the composition polynomial for a trace of
    /// the given padded height; constraints of degree up to
    /// `blowup_factor / 2 + 1` stay below it after zerofier division.
    pub fn composition_degree_bound(&self, padded_height: usize) -> usize {
        padded_height * self.blowup_factor / 2
    }
}

impl Default for StarkParameters {
    fn default() -> Self {
        Self::new(128, 8, 43)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_are_valid() {
        StarkParameters::default().validate().unwrap();
    }

    #[test]
    fn undersized_query_counts_are_rejected() {
        let params = StarkParameters::new(128, 8, 42);
        assert!(matches!(params.validate(), Err(ParameterError::TooFewQueries { .. })));
    }

    #[test]
    fn non_power_of_two_blowup_is_rejected() {
        let params = StarkParameters { blowup_factor: 12, ..Default::default() };
        assert_eq!(params.validate(), Err(ParameterError::BlowupNotPowerOfTwo(12)));
    }

    #[test]
    fn small_blowup_is_rejected() {
        let params = StarkParameters { blowup_factor: 4, ..Default::default() };
        assert!(matches!(params.validate(), Err(ParameterError::BlowupTooSmall { .. })));
    }

    #[test]
    fn exotic_folding_factors_are_rejected() {
        let params = StarkParameters { fri_folding_factor: 4, ..Default::default() };
        assert_eq!(params.validate(), Err(ParameterError::UnsupportedFoldingFactor(4)));
    }
}
