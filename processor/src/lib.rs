//! Quartz VM processor: executes programs and records the algebraic
//! execution trace that witnesses the run.

pub mod aet;
mod aux;
pub mod errors;
pub mod op_stack;
pub mod vm;

pub use aet::{AlgebraicExecutionTrace, MasterMainTable, ProcessorTraceRow};
pub use errors::{AetError, ExecutionError};
pub use op_stack::{OpStack, OpStackUnderflowEvent, NUM_STACK_REGISTERS};
pub use vm::{CoProcessorCall, VmState, CYCLE_LIMIT};

use quartz_core::{Felt, Program};

/// Executes the program and returns its public output; no trace is recorded.
///
/// # Errors
/// Returns an error on any dynamic fault; a failed run produces no output.
#[tracing::instrument(skip_all)]
pub fn execute(
    program: Program,
    public_input: Vec<Felt>,
    secret_input: Vec<Felt>,
) -> Result<Vec<Felt>, ExecutionError> {
    let mut state = VmState::new(program, public_input, secret_input);
    while !state.halting {
        if state.cycle >= CYCLE_LIMIT {
            return Err(ExecutionError::CycleLimitExceeded(CYCLE_LIMIT));
        }
        state.step()?;
    }
    Ok(state.public_output)
}

/// Executes the program and records the complete algebraic execution trace.
///
/// Returns the trace together with the public output. A failed run produces
/// neither.
///
/// # Errors
/// Returns an error on any dynamic fault.
#[tracing::instrument(skip_all)]
pub fn trace_execution(
    program: Program,
    public_input: Vec<Felt>,
    secret_input: Vec<Felt>,
) -> Result<(AlgebraicExecutionTrace, Vec<Felt>), ExecutionError> {
    trace_execution_with_ram(program, public_input, secret_input, Default::default())
}

/// Like [`trace_execution`], with the RAM pre-seeded with prover-supplied
/// (non-deterministic) values.
#[tracing::instrument(skip_all)]
pub fn trace_execution_with_ram(
    program: Program,
    public_input: Vec<Felt>,
    secret_input: Vec<Felt>,
    initial_ram: std::collections::BTreeMap<Felt, Felt>,
) -> Result<(AlgebraicExecutionTrace, Vec<Felt>), ExecutionError> {
    let mut state = VmState::new(program, public_input, secret_input);
    state.ram = initial_ram;
    let mut aet = AlgebraicExecutionTrace::new(state.program.clone());

    while !state.halting {
        if state.cycle >= CYCLE_LIMIT {
            return Err(ExecutionError::CycleLimitExceeded(CYCLE_LIMIT));
        }
        aet.record_state(&state)?;

        let clk = state.cycle;
        let input_length_before = state.public_input.len();
        let peeked_input: Vec<Felt> = state.public_input.iter().take(5).copied().collect();
        let output_length_before = state.public_output.len();

        let calls = state.step()?;
        for call in calls {
            aet.record_call(call);
        }

        let consumed = input_length_before - state.public_input.len();
        aet.record_input_read(clk, peeked_input[..consumed].to_vec());
        aet.record_output_write(clk, state.public_output[output_length_before..].to_vec());
    }

    Ok((aet, state.public_output))
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quartz_air::challenges::Challenges;
    use quartz_air::claim::Claim;
    use quartz_air::constraints::{
        evaluate_consistency_constraints, evaluate_initial_constraints,
        evaluate_terminal_constraints, evaluate_transition_constraints, Terminals,
    };
    use quartz_core::instruction::{NumWords, StackIdx};
    use quartz_core::{Felt, Instruction, Program, Transcript, ONE, ZERO};

    use super::*;

    fn n(words: u64) -> NumWords {
        NumWords::try_from(words).unwrap()
    }

    fn idx(index: u64) -> StackIdx {
        StackIdx::try_from(index).unwrap()
    }

    fn program(instructions: Vec<Instruction>) -> Program {
        Program::new(instructions).unwrap()
    }

    fn halt_only() -> Program {
        program(vec![Instruction::Halt])
    }

    fn factorial_program() -> Program {
        program(vec![
            Instruction::Push(Felt::new(1)),
            Instruction::Push(Felt::new(2)),
            Instruction::Mul,
            Instruction::Push(Felt::new(3)),
            Instruction::Mul,
            Instruction::Push(Felt::new(4)),
            Instruction::Mul,
            Instruction::Push(Felt::new(5)),
            Instruction::Mul,
            Instruction::WriteIo(n(1)),
            Instruction::Halt,
        ])
    }

    /// Checks every AIR constraint group against the honestly generated
    /// trace of the given run.
    fn assert_trace_satisfies_air(
        program: Program,
        public_input: Vec<Felt>,
        secret_input: Vec<Felt>,
    ) {
        let claim_input = public_input.clone();
        let (aet, output) = trace_execution(program.clone(), public_input, secret_input).unwrap();
        let claim = Claim::new(program.hash()).with_input(claim_input).with_output(output);

        let main = aet.to_master_main().unwrap();
        let mut transcript = Transcript::new(&claim.encode());
        let challenges = Challenges::sample(&mut transcript);
        let aux = aet.build_aux_columns(&main, &challenges).unwrap();
        let terminals = Terminals::derive(&claim, &challenges);

        let height = main.padded_height;
        let initial = evaluate_initial_constraints(main.row(0), &aux[0], &challenges, &terminals);
        for (i, value) in initial.iter().enumerate() {
            assert_eq!(*value, ZERO, "initial constraint {i} violated");
        }
        for row in 0..height {
            let consistency =
                evaluate_consistency_constraints(main.row(row), &aux[row], &challenges);
            for (i, value) in consistency.iter().enumerate() {
                assert_eq!(*value, ZERO, "consistency constraint {i} violated at row {row}");
            }
        }
        for row in 0..height - 1 {
            let transition = evaluate_transition_constraints(
                main.row(row),
                &aux[row],
                main.row(row + 1),
                &aux[row + 1],
                &challenges,
            );
            for (i, value) in transition.iter().enumerate() {
                assert_eq!(*value, ZERO, "transition constraint {i} violated at rows {row}..");
            }
        }
        let terminal = evaluate_terminal_constraints(
            main.row(height - 1),
            &aux[height - 1],
            &challenges,
            &terminals,
        );
        for (i, value) in terminal.iter().enumerate() {
            assert_eq!(*value, ZERO, "terminal constraint {i} violated");
        }
    }

    #[test]
    fn halt_only_program_runs_for_one_cycle() {
        let (aet, output) = trace_execution(halt_only(), vec![], vec![]).unwrap();
        assert_eq!(aet.processor_rows.len(), 1);
        assert_eq!(output, halt_only().hash().elements().to_vec());
    }

    #[test]
    fn push_leaves_the_value_in_st0() {
        let program = program(vec![Instruction::Push(Felt::new(100)), Instruction::Halt]);
        let mut state = VmState::new(program, vec![], vec![]);
        state.step().unwrap();
        assert_eq!(state.op_stack.get(0), Some(Felt::new(100)));
        assert_eq!(state.op_stack.len(), 6);
    }

    #[test]
    fn addition_with_public_io() {
        let program = program(vec![
            Instruction::ReadIo(n(1)),
            Instruction::ReadIo(n(1)),
            Instruction::Add,
            Instruction::WriteIo(n(1)),
            Instruction::Halt,
        ]);
        let digest = program.hash();
        let output =
            execute(program, vec![Felt::new(17), Felt::new(25)], vec![]).unwrap();
        assert_eq!(output[..5], digest.elements()[..]);
        assert_eq!(output[5], Felt::new(42));
    }

    #[test]
    fn divined_square_root_passes_the_assertion() {
        let program = program(vec![
            Instruction::Divine(n(1)),
            Instruction::Dup(idx(0)),
            Instruction::Mul,
            Instruction::Push(Felt::new(25)),
            Instruction::Eq,
            Instruction::Assert,
            Instruction::Halt,
        ]);
        let digest = program.hash();

        let output = execute(program.clone(), vec![], vec![Felt::new(5)]).unwrap();
        assert_eq!(output, digest.elements().to_vec());

        let wrong_witness = execute(program, vec![], vec![Felt::new(6)]);
        assert_eq!(wrong_witness.unwrap_err(), ExecutionError::AssertionFailed(ZERO));
    }

    #[test]
    fn factorial_of_five() {
        let output = execute(factorial_program(), vec![], vec![]).unwrap();
        assert_eq!(output[5], Felt::new(120));
    }

    #[test]
    fn div_mod_pushes_quotient_then_remainder() {
        let program = program(vec![
            Instruction::Push(Felt::new(17)),
            Instruction::Push(Felt::new(5)),
            Instruction::DivMod,
            Instruction::WriteIo(n(1)),
            Instruction::WriteIo(n(1)),
            Instruction::Halt,
        ]);
        let output = execute(program, vec![], vec![]).unwrap();
        assert_eq!(output[5], Felt::new(3));
        assert_eq!(output[6], Felt::new(2));
    }

    #[test]
    fn skiz_skips_the_next_instruction_on_zero() {
        let program = program(vec![
            Instruction::Push(ZERO),
            Instruction::Skiz,
            Instruction::Push(Felt::new(1)),
            Instruction::Push(Felt::new(2)),
            Instruction::Halt,
        ]);
        let mut state = VmState::new(program, vec![], vec![]);
        while !state.halting {
            state.step().unwrap();
        }
        // Push(1) was skipped
        assert_eq!(state.op_stack.get(0), Some(Felt::new(2)));
        assert_eq!(state.op_stack.len(), 6);
    }

    #[test]
    fn call_and_return_round_trip() {
        // addresses: Call = 0..2, Push = 2..4, Return = 4, Halt = 5
        let program = program(vec![
            Instruction::Call(Felt::new(2)),
            Instruction::Push(Felt::new(7)),
            Instruction::Return,
            Instruction::Halt,
        ]);
        let mut state = VmState::new(program, vec![], vec![]);
        state.step().unwrap(); // call
        assert_eq!(state.ip, 2);
        assert_eq!(state.jump_stack, vec![(Felt::new(2), Felt::new(2))]);
        state.step().unwrap(); // push
        state.step().unwrap(); // return
        assert_eq!(state.ip, 2);
        assert!(state.jump_stack.is_empty());
    }

    #[test]
    fn memory_round_trips_through_ram() {
        let program = program(vec![
            Instruction::Push(Felt::new(42)),  // value
            Instruction::Push(Felt::new(100)), // address
            Instruction::Place(idx(1)),        // stack: [42, 100] -> [100, 42]
            Instruction::WriteMem(n(1)),
            Instruction::Push(Felt::new(100)),
            Instruction::ReadMem(n(1)),
            Instruction::Halt,
        ]);
        let mut state = VmState::new(program, vec![], vec![]);
        while !state.halting {
            state.step().unwrap();
        }
        assert_eq!(state.op_stack.get(0), Some(Felt::new(42)));
    }

    #[test]
    fn runtime_permutation_balances_out() {
        // push a 5-tuple into the multiset, read it back out, assert balance
        let program = program(vec![
            Instruction::Push(Felt::new(1)),
            Instruction::Push(Felt::new(2)),
            Instruction::Push(Felt::new(3)),
            Instruction::Push(Felt::new(4)),
            Instruction::Push(Felt::new(5)),
            Instruction::PopPerm,
            Instruction::PushPerm,
            Instruction::AssertPerm,
            Instruction::Halt,
        ]);
        let output = execute(program, vec![], vec![]);
        assert!(output.is_ok());
    }

    #[test]
    fn unbalanced_runtime_permutation_fails_the_assertion() {
        let program = program(vec![
            Instruction::Push(Felt::new(1)),
            Instruction::Push(Felt::new(2)),
            Instruction::Push(Felt::new(3)),
            Instruction::Push(Felt::new(4)),
            Instruction::Push(Felt::new(5)),
            Instruction::PushPerm,
            Instruction::AssertPerm,
            Instruction::Halt,
        ]);
        assert!(matches!(
            execute(program, vec![], vec![]),
            Err(ExecutionError::RuntimePermutationAssertionFailed(_))
        ));
    }

    #[test]
    fn sponge_instructions_require_initialization() {
        let mut instructions = vec![Instruction::Push(ZERO); 10];
        instructions.push(Instruction::SpongeAbsorb);
        instructions.push(Instruction::Halt);
        assert_eq!(
            execute(program(instructions), vec![], vec![]).unwrap_err(),
            ExecutionError::SpongeNotInitialized
        );
    }

    #[test]
    fn hash_instruction_squeezes_five_distinct_digest_elements() {
        let mut instructions = vec![Instruction::Push(ZERO); 10];
        instructions.push(Instruction::Hash);
        instructions.push(Instruction::Halt);
        let mut state = VmState::new(program(instructions), vec![], vec![]);
        while !state.halting {
            state.step().unwrap();
        }
        let digest: Vec<_> = (0..5).map(|d| state.op_stack.get(d).unwrap()).collect();
        assert_eq!(digest.len(), 5);
        // with overwhelming probability no two digest elements coincide
        assert_ne!(digest[0], digest[1]);
        assert_eq!(state.op_stack.len(), 5 + 5);
    }

    #[test]
    fn execution_is_deterministic() {
        let run = || {
            trace_execution(factorial_program(), vec![], vec![]).unwrap().0.processor_rows
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn cycle_count_equals_processor_table_height() {
        let (aet, _) = trace_execution(factorial_program(), vec![], vec![]).unwrap();
        assert_eq!(aet.processor_rows.len(), 11);
    }

    #[test]
    fn padded_tables_share_a_power_of_two_height() {
        let (aet, _) = trace_execution(factorial_program(), vec![], vec![]).unwrap();
        let main = aet.to_master_main().unwrap();
        assert!(main.padded_height.is_power_of_two());
        assert!(main.padded_height >= aet.lookup_table_height());
        assert_eq!(main.rows.len(), main.padded_height);
    }

    // AIR conformance: every honestly generated trace satisfies every
    // constraint group

    #[test]
    fn air_holds_for_halt_only() {
        assert_trace_satisfies_air(halt_only(), vec![], vec![]);
    }

    #[test]
    fn air_holds_for_factorial() {
        assert_trace_satisfies_air(factorial_program(), vec![], vec![]);
    }

    #[test]
    fn air_holds_for_public_io() {
        let program = program(vec![
            Instruction::ReadIo(n(1)),
            Instruction::ReadIo(n(1)),
            Instruction::Add,
            Instruction::WriteIo(n(1)),
            Instruction::Halt,
        ]);
        assert_trace_satisfies_air(program, vec![Felt::new(17), Felt::new(25)], vec![]);
    }

    #[test]
    fn air_holds_for_secret_witness() {
        let program = program(vec![
            Instruction::Divine(n(1)),
            Instruction::Dup(idx(0)),
            Instruction::Mul,
            Instruction::Push(Felt::new(25)),
            Instruction::Eq,
            Instruction::Assert,
            Instruction::Halt,
        ]);
        assert_trace_satisfies_air(program, vec![], vec![Felt::new(5)]);
    }

    #[test]
    fn air_holds_for_u32_memory_and_hash_mix() {
        let program = program(vec![
            // u32 co-processor traffic
            Instruction::Push(Felt::new(0xdead_beef)),
            Instruction::Push(Felt::new(0x1234)),
            Instruction::And,
            Instruction::Push(Felt::new(77)),
            Instruction::Push(Felt::new(8)),
            Instruction::DivMod,
            Instruction::Pop(n(4)),
            // memory traffic
            Instruction::Push(Felt::new(5)),
            Instruction::Push(Felt::new(0)),
            Instruction::Place(idx(1)),
            Instruction::WriteMem(n(1)),
            Instruction::Push(Felt::new(0)),
            Instruction::ReadMem(n(1)),
            Instruction::Pop(n(1)),
            // hashing
            Instruction::SpongeInit,
            Instruction::Push(ONE),
            Instruction::Push(ONE),
            Instruction::Push(ONE),
            Instruction::Push(ONE),
            Instruction::Push(ONE),
            Instruction::Push(ONE),
            Instruction::Push(ONE),
            Instruction::Push(ONE),
            Instruction::Push(ONE),
            Instruction::Push(ONE),
            Instruction::SpongeAbsorb,
            Instruction::SpongeSqueeze,
            // spill past the on-chip registers and back
            Instruction::Push(ONE),
            Instruction::Push(ONE),
            Instruction::Push(ONE),
            Instruction::Pop(n(3)),
            Instruction::Pop(n(5)),
            Instruction::Pop(n(5)),
            // control flow; the subroutine sits at address 64
            Instruction::Call(Felt::new(64)),
            Instruction::Halt,
            Instruction::Nop,
            Instruction::Return,
        ]);
        assert_trace_satisfies_air(program, vec![], vec![]);
    }
}
