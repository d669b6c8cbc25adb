//! The proof: an ordered transcript of all prover-to-verifier messages.

use quartz_core::{Digest, Felt, MerklePath};
use quartz_fri::FriProof;
use serde::{Deserialize, Serialize};

/// A non-interactive proof of one program execution.
///
/// Field order mirrors the transcript: Merkle roots of the three commitments,
/// out-of-domain openings, the FRI transcript, and the authenticated row
/// openings at the queried positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub version: u32,
    /// log₂ of the common padded height of all tables.
    pub log2_padded_height: u32,

    pub main_root: Digest,
    pub aux_root: Digest,
    pub composition_root: Digest,

    /// Main-row opening at the out-of-domain point ζ.
    pub ood_main_row: Vec<Felt>,
    /// Main-row opening at ω·ζ.
    pub ood_main_next_row: Vec<Felt>,
    pub ood_aux_row: Vec<Felt>,
    pub ood_aux_next_row: Vec<Felt>,
    /// Composition polynomial value at ζ.
    pub ood_composition_value: Felt,

    pub fri: FriProof,
    /// Row openings at the FRI query positions, in sampling order.
    pub openings: Vec<RowOpening>,
}

/// The authenticated openings of all three commitments at one queried
/// position of the low-degree-extension domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOpening {
    pub main_row: Vec<Felt>,
    pub main_path: MerklePath,
    pub aux_row: Vec<Felt>,
    pub aux_path: MerklePath,
    pub composition_value: Felt,
    pub composition_path: MerklePath,
}

impl Proof {
    pub fn padded_height(&self) -> usize {
        1 << self.log2_padded_height
    }
}
