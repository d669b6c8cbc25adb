//! The verifier-derived challenges parameterizing all cross-table arguments.
//!
//! Every challenge has a dedicated, typed field; prover and verifier construct
//! the whole struct with a single call once the main-trace commitment has been
//! absorbed into the transcript, so both sides sample identical values in
//! identical order.

use quartz_core::{Felt, Transcript};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenges {
    // instruction lookup (processor ↔ program)
    pub instruction_lookup_indeterminate: Felt,
    pub program_address_weight: Felt,
    pub program_instruction_weight: Felt,
    pub program_next_instruction_weight: Felt,

    // processor ↔ op stack permutation
    pub op_stack_indeterminate: Felt,
    pub op_stack_clk_weight: Felt,
    pub op_stack_ib1_weight: Felt,
    pub op_stack_pointer_weight: Felt,
    pub op_stack_first_underflow_weight: Felt,

    // processor ↔ ram permutation, and the contiguity argument
    pub ram_indeterminate: Felt,
    pub ram_clk_weight: Felt,
    pub ram_instruction_type_weight: Felt,
    pub ram_pointer_weight: Felt,
    pub ram_value_weight: Felt,
    pub ram_bezout_indeterminate: Felt,

    // processor ↔ jump stack permutation
    pub jump_stack_indeterminate: Felt,
    pub jump_stack_clk_weight: Felt,
    pub jump_stack_ci_weight: Felt,
    pub jump_stack_jsp_weight: Felt,
    pub jump_stack_jso_weight: Felt,
    pub jump_stack_jsd_weight: Felt,

    // processor → hash evaluation
    pub hash_input_indeterminate: Felt,
    pub hash_ci_weight: Felt,
    pub hash_state_weights: [Felt; 10],

    // processor ↔ u32 lookup
    pub u32_indeterminate: Felt,
    pub u32_ci_weight: Felt,
    pub u32_lhs_weight: Felt,
    pub u32_rhs_weight: Felt,
    pub u32_result_weight: Felt,

    // u32 ↔ cascade lookup
    pub cascade_indeterminate: Felt,
    pub cascade_in_hi_weight: Felt,
    pub cascade_in_lo_weight: Felt,
    pub cascade_out_hi_weight: Felt,
    pub cascade_out_lo_weight: Felt,

    // cascade ↔ lookup (8-bit) lookup
    pub lookup_indeterminate: Felt,
    pub lookup_in_weight: Felt,
    pub lookup_out_weight: Felt,

    // clock jump difference lookup
    pub clock_jump_indeterminate: Felt,

    // program attestation
    pub program_chunk_inner_indeterminate: Felt,
    pub program_chunk_outer_indeterminate: Felt,

    // public input and output evaluation
    pub input_indeterminate: Felt,
    pub output_indeterminate: Felt,

    // run-time permutation check
    pub runtime_perm_indeterminate: Felt,
    pub runtime_perm_weights: [Felt; 5],
}

impl Challenges {
    /// Samples all challenges from the transcript, in declaration order.
    pub fn sample(transcript: &mut Transcript) -> Self {
        Self {
            instruction_lookup_indeterminate: transcript.sample(),
            program_address_weight: transcript.sample(),
            program_instruction_weight: transcript.sample(),
            program_next_instruction_weight: transcript.sample(),

            op_stack_indeterminate: transcript.sample(),
            op_stack_clk_weight: transcript.sample(),
            op_stack_ib1_weight: transcript.sample(),
            op_stack_pointer_weight: transcript.sample(),
            op_stack_first_underflow_weight: transcript.sample(),

            ram_indeterminate: transcript.sample(),
            ram_clk_weight: transcript.sample(),
            ram_instruction_type_weight: transcript.sample(),
            ram_pointer_weight: transcript.sample(),
            ram_value_weight: transcript.sample(),
            ram_bezout_indeterminate: transcript.sample(),

            jump_stack_indeterminate: transcript.sample(),
            jump_stack_clk_weight: transcript.sample(),
            jump_stack_ci_weight: transcript.sample(),
            jump_stack_jsp_weight: transcript.sample(),
            jump_stack_jso_weight: transcript.sample(),
            jump_stack_jsd_weight: transcript.sample(),

            hash_input_indeterminate: transcript.sample(),
            hash_ci_weight: transcript.sample(),
            hash_state_weights: transcript.sample_array(),

            u32_indeterminate: transcript.sample(),
            u32_ci_weight: transcript.sample(),
            u32_lhs_weight: transcript.sample(),
            u32_rhs_weight: transcript.sample(),
            u32_result_weight: transcript.sample(),

            cascade_indeterminate: transcript.sample(),
            cascade_in_hi_weight: transcript.sample(),
            cascade_in_lo_weight: transcript.sample(),
            cascade_out_hi_weight: transcript.sample(),
            cascade_out_lo_weight: transcript.sample(),

            lookup_indeterminate: transcript.sample(),
            lookup_in_weight: transcript.sample(),
            lookup_out_weight: transcript.sample(),

            clock_jump_indeterminate: transcript.sample(),

            program_chunk_inner_indeterminate: transcript.sample(),
            program_chunk_outer_indeterminate: transcript.sample(),

            input_indeterminate: transcript.sample(),
            output_indeterminate: transcript.sample(),

            runtime_perm_indeterminate: transcript.sample(),
            runtime_perm_weights: transcript.sample_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_is_deterministic() {
        let mut a = Transcript::new(&[Felt::new(42)]);
        let mut b = Transcript::new(&[Felt::new(42)]);
        assert_eq!(Challenges::sample(&mut a), Challenges::sample(&mut b));
    }

    #[test]
    fn different_transcripts_give_different_challenges() {
        let mut a = Transcript::new(&[Felt::new(1)]);
        let mut b = Transcript::new(&[Felt::new(2)]);
        let ca = Challenges::sample(&mut a);
        let cb = Challenges::sample(&mut b);
        assert_ne!(ca.ram_indeterminate, cb.ram_indeterminate);
    }
}
