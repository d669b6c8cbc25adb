//! A program: an ordered sequence of encoded instructions, addressable by
//! word, attested by a sponge digest.

use core::fmt;

use crate::errors::ProgramError;
use crate::field::Felt;
use crate::hash::{hash_varlen, Digest};
use crate::instruction::Instruction;

/// An executable program.
///
/// Instructions are laid out in program memory word by word: every
/// instruction contributes its opcode, followed by its argument iff it has
/// one. A structurally valid program ends with [`Instruction::Halt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    words: Vec<Felt>,
    // word address -> instruction starting at that address; `None` for
    // addresses occupied by an argument
    address_map: Vec<Option<Instruction>>,
}

impl Program {
    /// Creates a program from the given instructions.
    ///
    /// # Errors
    /// Returns an error if the instruction sequence is empty or does not end
    /// with `Halt`.
    pub fn new(instructions: Vec<Instruction>) -> Result<Self, ProgramError> {
        match instructions.last() {
            None => return Err(ProgramError::EmptyProgram),
            Some(Instruction::Halt) => (),
            Some(_) => return Err(ProgramError::MissingHalt),
        }

        let mut address_map = Vec::new();
        let mut words = Vec::new();
        for &instruction in &instructions {
            address_map.push(Some(instruction));
            words.push(instruction.opcode_felt());
            if let Some(arg) = instruction.arg() {
                address_map.push(None);
                words.push(arg);
            }
        }
        Ok(Self { instructions, words, address_map })
    }

    /// Decodes a program from its word representation.
    ///
    /// # Errors
    /// Returns an error if a word is not a valid opcode, an argument is
    /// missing or out of range, or the decoded program is structurally
    /// invalid.
    pub fn decode(words: &[Felt]) -> Result<Self, ProgramError> {
        let mut instructions = Vec::new();
        let mut address = 0;
        while address < words.len() {
            let opcode = words[address].value();
            let template = Instruction::template_for_opcode(opcode)?;
            let instruction = if template.has_arg() {
                let arg =
                    *words.get(address + 1).ok_or(ProgramError::TruncatedProgram)?;
                Instruction::try_from_opcode(opcode, Some(arg))?
            } else {
                template
            };
            instructions.push(instruction);
            address += instruction.size();
        }
        Self::new(instructions)
    }

    /// The number of instructions in the program.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The length of the program in program-memory words.
    pub fn len_words(&self) -> usize {
        self.address_map.len()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The instruction starting at the given word address, or `None` if the
    /// address is out of bounds or inside an argument.
    pub fn instruction_at(&self, address: usize) -> Option<Instruction> {
        self.address_map.get(address).copied().flatten()
    }

    /// The word stored at the given address; addresses past the end of the
    /// program read as zero.
    pub fn word_at(&self, address: usize) -> Felt {
        self.words.get(address).copied().unwrap_or(Felt::ZERO)
    }

    /// The word representation of the program.
    pub fn to_words(&self) -> Vec<Felt> {
        self.words.clone()
    }

    /// The digest attesting to this program: the sponge hash of its word
    /// representation.
    pub fn hash(&self) -> Digest {
        hash_varlen(&self.words)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::instruction::{NumWords, StackIdx};

    fn example_program() -> Program {
        Program::new(vec![
            Instruction::Push(Felt::new(100)),
            Instruction::Dup(StackIdx::try_from(0).unwrap()),
            Instruction::Mul,
            Instruction::Halt,
        ])
        .unwrap()
    }

    #[test]
    fn programs_must_end_with_halt() {
        assert_eq!(Program::new(vec![]), Err(ProgramError::EmptyProgram));
        assert_eq!(
            Program::new(vec![Instruction::Nop]),
            Err(ProgramError::MissingHalt)
        );
        assert!(Program::new(vec![Instruction::Halt]).is_ok());
    }

    #[test]
    fn word_length_counts_arguments() {
        let program = example_program();
        assert_eq!(program.len(), 4);
        assert_eq!(program.len_words(), 6);
    }

    #[test]
    fn address_map_skips_argument_words() {
        let program = example_program();
        assert_eq!(program.instruction_at(0), Some(Instruction::Push(Felt::new(100))));
        assert_eq!(program.instruction_at(1), None);
        assert_eq!(program.instruction_at(2), Some(Instruction::Dup(StackIdx::default())));
        assert_eq!(program.instruction_at(5), Some(Instruction::Halt));
        assert_eq!(program.instruction_at(6), None);
    }

    #[test]
    fn encoding_round_trips_through_decoding() {
        let program = example_program();
        assert_eq!(Program::decode(&program.to_words()).unwrap(), program);
    }

    #[test]
    fn every_instruction_round_trips_inside_a_program() {
        for instruction in Instruction::iter() {
            let program = Program::new(vec![instruction, Instruction::Halt]).unwrap();
            assert_eq!(Program::decode(&program.to_words()).unwrap(), program);
        }
    }

    #[test]
    fn digest_depends_on_instruction_order_and_arguments() {
        let a = Program::new(vec![
            Instruction::Push(Felt::new(1)),
            Instruction::Pop(NumWords::default()),
            Instruction::Halt,
        ])
        .unwrap();
        let b = Program::new(vec![
            Instruction::Pop(NumWords::default()),
            Instruction::Push(Felt::new(1)),
            Instruction::Halt,
        ])
        .unwrap();
        let c = Program::new(vec![
            Instruction::Push(Felt::new(2)),
            Instruction::Pop(NumWords::default()),
            Instruction::Halt,
        ])
        .unwrap();
        assert_ne!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    proptest! {
        #[test]
        fn push_arguments_round_trip(arg in 0u64..crate::field::MODULUS) {
            let program = Program::new(vec![
                Instruction::Push(Felt::new(arg)),
                Instruction::Halt,
            ]).unwrap();
            prop_assert_eq!(Program::decode(&program.to_words()).unwrap(), program);
        }
    }
}
