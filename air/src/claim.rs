//! The public statement a proof attests to.

use quartz_core::{Digest, Felt};
use serde::{Deserialize, Serialize};

/// The current claim encoding version.
pub const CLAIM_VERSION: u32 = 1;

/// The public statement: executing the program with the given digest against
/// the public input produces the public output.
///
/// The first five output elements are the program digest itself; everything
/// after them was written by the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub program_digest: Digest,
    pub version: u32,
    pub input: Vec<Felt>,
    pub output: Vec<Felt>,
}

impl Claim {
    pub fn new(program_digest: Digest) -> Self {
        Self { program_digest, version: CLAIM_VERSION, input: vec![], output: vec![] }
    }

    pub fn with_input(mut self, input: Vec<Felt>) -> Self {
        self.input = input;
        self
    }

    pub fn with_output(mut self, output: Vec<Felt>) -> Self {
        self.output = output;
        self
    }

    /// Encodes the claim as a field element sequence for seeding the
    /// Fiat–Shamir transcript. The encoding is length-prefixed and therefore
    /// injective.
    pub fn encode(&self) -> Vec<Felt> {
        let mut elements = vec![Felt::new(self.version as u64)];
        elements.extend_from_slice(self.program_digest.elements());
        elements.push(Felt::new(self.input.len() as u64));
        elements.extend_from_slice(&self.input);
        elements.push(Felt::new(self.output.len() as u64));
        elements.extend_from_slice(&self.output);
        elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest() -> Digest {
        quartz_core::hash::hash_varlen(&[Felt::new(7)])
    }

    #[test]
    fn encoding_separates_input_from_output() {
        let with_input = Claim::new(digest()).with_input(vec![Felt::new(1)]);
        let with_output = Claim::new(digest()).with_output(vec![Felt::new(1)]);
        assert_ne!(with_input.encode(), with_output.encode());
    }

    #[test]
    fn encoding_is_length_sensitive() {
        let short = Claim::new(digest()).with_input(vec![Felt::new(0)]);
        let long = Claim::new(digest()).with_input(vec![Felt::new(0), Felt::new(0)]);
        assert_ne!(short.encode(), long.encode());
    }

    #[test]
    fn claims_serialize_to_json_and_back() {
        let claim = Claim::new(digest())
            .with_input(vec![Felt::new(17), Felt::new(25)])
            .with_output(vec![Felt::new(42)]);
        let json = serde_json::to_string(&claim).unwrap();
        assert_eq!(serde_json::from_str::<Claim>(&json).unwrap(), claim);
    }
}
