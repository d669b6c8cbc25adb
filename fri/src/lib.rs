//! The FRI protocol: a low-degree test over a Reed–Solomon codeword on a
//! multiplicative coset. The prover repeatedly folds the codeword in half
//! using transcript-derived challenges and commits to every layer; the
//! verifier checks folding consistency at transcript-sampled query positions
//! and reads the final, constant-sized codeword in full.

mod proof;
mod prover;
mod verifier;

pub use proof::{FriLayerOpening, FriProof, FriQueryProof};
pub use prover::FriProver;
pub use verifier::{verify, FriError};

use quartz_core::Felt;

/// Highest degree (exclusive bound) the final FRI codeword may have; folding
/// stops once the degree bound reaches this value.
pub const MAX_FINAL_DEGREE_BOUND: usize = 64;

/// Parameters of one FRI instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FriParameters {
    /// Size of the evaluation domain of the initial codeword.
    pub domain_size: usize,
    /// Coset offset of the evaluation domain.
    pub domain_offset: Felt,
    /// The protocol proves that the codeword agrees with a polynomial of
    /// degree less than this bound; must be a power of two.
    pub degree_bound: usize,
    /// Number of query positions sampled from the transcript.
    pub num_queries: usize,
}

impl FriParameters {
    /// Number of folding rounds until the degree bound reaches
    /// [`MAX_FINAL_DEGREE_BOUND`].
    pub fn num_rounds(&self) -> usize {
        let mut rounds = 0;
        let mut bound = self.degree_bound;
        while bound > MAX_FINAL_DEGREE_BOUND {
            bound /= 2;
            rounds += 1;
        }
        rounds
    }

    /// Domain size of the final, fully revealed codeword.
    pub fn final_domain_size(&self) -> usize {
        self.domain_size >> self.num_rounds()
    }

    /// Degree bound of the final codeword.
    pub fn final_degree_bound(&self) -> usize {
        self.degree_bound >> self.num_rounds()
    }
}

#[cfg(test)]
mod tests {
    use quartz_core::polynomial::coset_evaluate;
    use quartz_core::{Felt, Transcript};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn params() -> FriParameters {
        FriParameters {
            domain_size: 1024,
            domain_offset: Felt::GENERATOR,
            degree_bound: 256,
            num_queries: 30,
        }
    }

    fn low_degree_codeword(seed: u64, params: &FriParameters) -> Vec<Felt> {
        let mut rng = StdRng::seed_from_u64(seed);
        let coefficients: Vec<Felt> =
            (0..params.degree_bound).map(|_| Felt::new(rng.random())).collect();
        coset_evaluate(&coefficients, params.domain_offset, params.domain_size)
    }

    #[test]
    fn honest_proof_verifies() {
        let params = params();
        let codeword = low_degree_codeword(11, &params);

        let mut prover_transcript = Transcript::new(&[Felt::new(0)]);
        let (proof, _) = FriProver::prove(codeword.clone(), &params, &mut prover_transcript);

        let mut verifier_transcript = Transcript::new(&[Felt::new(0)]);
        let openings = verify(&proof, &params, &mut verifier_transcript).unwrap();

        // the first-layer openings must agree with the committed codeword
        for (index, value) in openings {
            assert_eq!(value, codeword[index]);
        }
    }

    #[test]
    fn high_degree_codeword_is_rejected() {
        let params = params();
        // degree-bound violation: a codeword of degree ~4x the claimed bound
        let mut rng = StdRng::seed_from_u64(12);
        let coefficients: Vec<Felt> =
            (0..4 * params.degree_bound).map(|_| Felt::new(rng.random())).collect();
        let codeword = coset_evaluate(&coefficients, params.domain_offset, params.domain_size);

        let mut prover_transcript = Transcript::new(&[Felt::new(0)]);
        let (proof, _) = FriProver::prove(codeword, &params, &mut prover_transcript);

        let mut verifier_transcript = Transcript::new(&[Felt::new(0)]);
        assert!(verify(&proof, &params, &mut verifier_transcript).is_err());
    }

    #[test]
    fn tampered_final_codeword_is_rejected() {
        let params = params();
        let codeword = low_degree_codeword(13, &params);

        let mut prover_transcript = Transcript::new(&[Felt::new(0)]);
        let (mut proof, _) = FriProver::prove(codeword, &params, &mut prover_transcript);
        proof.final_codeword[0] += Felt::ONE;

        let mut verifier_transcript = Transcript::new(&[Felt::new(0)]);
        assert!(verify(&proof, &params, &mut verifier_transcript).is_err());
    }

    #[test]
    fn tampered_layer_opening_is_rejected() {
        let params = params();
        let codeword = low_degree_codeword(14, &params);

        let mut prover_transcript = Transcript::new(&[Felt::new(0)]);
        let (mut proof, _) = FriProver::prove(codeword, &params, &mut prover_transcript);
        proof.query_proofs[0].layers[0].value += Felt::ONE;

        let mut verifier_transcript = Transcript::new(&[Felt::new(0)]);
        assert!(verify(&proof, &params, &mut verifier_transcript).is_err());
    }
}
