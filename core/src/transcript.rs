//! The Fiat–Shamir transcript: a deterministic duplex sponge that turns the
//! prover's messages into the verifier's challenges. Prover and verifier feed
//! it identical data in identical order and therefore sample identical
//! challenges.

use crate::field::Felt;
use crate::hash::{Digest, SpongeState, RATE};

/// A duplex-sponge Fiat–Shamir channel.
#[derive(Debug, Clone)]
pub struct Transcript {
    sponge: SpongeState,
    absorb_pos: usize,
    squeeze_pos: usize,
}

impl Transcript {
    /// Creates a transcript seeded with the given elements.
    pub fn new(seed: &[Felt]) -> Self {
        let mut transcript = Self {
            sponge: SpongeState::init(),
            absorb_pos: 0,
            // force a permutation before the first sample
            squeeze_pos: RATE,
        };
        transcript.absorb(seed);
        transcript
    }

    /// Mixes the given elements into the transcript state.
    pub fn absorb(&mut self, elements: &[Felt]) {
        // any new data invalidates previously squeezed output
        self.squeeze_pos = RATE;
        for &element in elements {
            self.sponge.state[self.absorb_pos] += element;
            self.absorb_pos += 1;
            if self.absorb_pos == RATE {
                self.sponge.permute();
                self.absorb_pos = 0;
            }
        }
    }

    pub fn absorb_digest(&mut self, digest: &Digest) {
        self.absorb(digest.elements());
    }

    /// Samples one pseudo-random field element.
    pub fn sample(&mut self) -> Felt {
        if self.squeeze_pos >= RATE {
            self.sponge.permute();
            self.squeeze_pos = 0;
            self.absorb_pos = 0;
        }
        let element = self.sponge.state[self.squeeze_pos];
        self.squeeze_pos += 1;
        element
    }

    pub fn sample_vec(&mut self, count: usize) -> Vec<Felt> {
        (0..count).map(|_| self.sample()).collect()
    }

    pub fn sample_array<const N: usize>(&mut self) -> [Felt; N] {
        core::array::from_fn(|_| self.sample())
    }

    /// Samples `count` indices in `[0, domain_size)`.
    ///
    /// # Panics
    /// Panics if `domain_size` is not a power of two.
    pub fn sample_indices(&mut self, count: usize, domain_size: usize) -> Vec<usize> {
        assert!(domain_size.is_power_of_two());
        (0..count).map(|_| self.sample().value() as usize & (domain_size - 1)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Felt, ZERO};

    #[test]
    fn identical_inputs_yield_identical_challenges() {
        let mut a = Transcript::new(&[Felt::new(1), Felt::new(2)]);
        let mut b = Transcript::new(&[Felt::new(1), Felt::new(2)]);
        a.absorb(&[Felt::new(99)]);
        b.absorb(&[Felt::new(99)]);
        assert_eq!(a.sample_vec(20), b.sample_vec(20));
    }

    #[test]
    fn different_absorbed_data_diverges() {
        let mut a = Transcript::new(&[Felt::new(1)]);
        let mut b = Transcript::new(&[Felt::new(1)]);
        a.absorb(&[Felt::new(2)]);
        b.absorb(&[Felt::new(3)]);
        assert_ne!(a.sample(), b.sample());
    }

    #[test]
    fn absorbing_after_sampling_changes_subsequent_output() {
        let mut a = Transcript::new(&[ZERO]);
        let mut b = a.clone();
        let _ = a.sample();
        let _ = b.sample();
        a.absorb(&[Felt::new(7)]);
        b.absorb(&[Felt::new(8)]);
        assert_ne!(a.sample(), b.sample());
    }

    #[test]
    fn sampled_indices_stay_in_range() {
        let mut transcript = Transcript::new(&[Felt::new(5)]);
        let indices = transcript.sample_indices(100, 64);
        assert_eq!(indices.len(), 100);
        assert!(indices.iter().all(|&i| i < 64));
    }
}
