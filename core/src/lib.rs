//! Shared primitives for the Quartz VM: the Goldilocks base field and its
//! cubic extension, dense polynomials with NTT-based evaluation, the sponge
//! permutation used for hashing and Fiat–Shamir, Merkle commitments, and the
//! instruction set together with the [`Program`] container.

pub mod errors;
pub mod field;
pub mod hash;
pub mod instruction;
pub mod merkle;
pub mod polynomial;
pub mod program;
pub mod transcript;

pub use errors::ProgramError;
pub use field::{batch_inverse, Felt, XFelt, ONE, ZERO};
pub use hash::{Digest, SpongeState, DIGEST_LEN, RATE, STATE_SIZE};
pub use instruction::{Instruction, NumWords, StackIdx};
pub use merkle::{MerklePath, MerkleTree};
pub use polynomial::Polynomial;
pub use program::Program;
pub use transcript::Transcript;
