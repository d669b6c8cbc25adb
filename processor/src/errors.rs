//! Errors raised while executing programs and assembling execution traces.

use quartz_core::{Felt, ProgramError};

/// A dynamic fault during program execution. A failed run produces no trace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Aet(#[from] AetError),
    #[error("instruction pointer {0} points outside program memory")]
    InstructionPointerOutOfBounds(usize),
    #[error("operational stack underflow while executing `{0}`")]
    OpStackUnderflow(&'static str),
    #[error("`{instruction}` needs {needed} stack elements, but only {available} are present")]
    OpStackTooShallow { instruction: &'static str, needed: usize, available: usize },
    #[error("assertion failed: expected 1, found {0}")]
    AssertionFailed(Felt),
    #[error("vector assertion failed at position {position}: {lhs} != {rhs}")]
    VectorAssertionFailed { position: usize, lhs: Felt, rhs: Felt },
    #[error("inverse of zero is undefined")]
    InverseOfZero,
    #[error("division by zero is undefined")]
    DivisionByZero,
    #[error("logarithm of zero is undefined")]
    LogarithmOfZero,
    #[error("operand {0} does not fit in a u32")]
    NotU32(Felt),
    #[error("public input is exhausted")]
    PublicInputExhausted,
    #[error("secret input is exhausted")]
    SecretInputExhausted,
    #[error("jump stack is empty")]
    JumpStackEmpty,
    #[error("sponge instruction executed before `SpongeInit`")]
    SpongeNotInitialized,
    #[error("run-time permutation product cannot absorb the challenge point itself")]
    RuntimePermutationDivisionByZero,
    #[error("run-time permutation check failed: running product is {0}, not 1")]
    RuntimePermutationAssertionFailed(Felt),
    #[error("exceeded the cycle limit of {0} without halting")]
    CycleLimitExceeded(u64),
}

/// A structural failure while assembling the algebraic execution trace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AetError {
    #[error("the processor trace is empty; cannot pad an empty required table")]
    EmptyProcessorTrace,
    #[error("instruction multiplicity at address {0} overflowed")]
    MultiplicityOverflow(usize),
    #[error("auxiliary column witness is not invertible")]
    NonInvertibleWitness,
}
