//! Errors for program construction and decoding.

/// A structurally malformed program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("program is empty")]
    EmptyProgram,
    #[error("program must end with Halt")]
    MissingHalt,
    #[error("no instruction with opcode {0} exists")]
    UnknownOpcode(u64),
    #[error("unknown instruction name `{0}`")]
    UnknownInstruction(String),
    #[error("instruction `{0}` requires an argument")]
    MissingArgument(&'static str),
    #[error("instruction `{0}` does not take an argument")]
    UnexpectedArgument(&'static str),
    #[error("argument {arg} is out of range for instruction `{instruction}`")]
    ArgumentOutOfRange { instruction: &'static str, arg: u64 },
    #[error("program encoding ends in the middle of an instruction")]
    TruncatedProgram,
}
