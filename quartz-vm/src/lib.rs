//! Driver wire protocol of the Quartz VM prover binary.
//!
//! The prover reads five JSON documents from stdin, one per line: the claim,
//! the program, the non-determinism, an optional bound on the log₂ padded
//! height, and an environment object. It writes the proof as one JSON
//! document to stdout. Failures exit non-zero with a stage-tagged message on
//! stderr.

use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;

use quartz_air::claim::Claim;
use quartz_air::parameters::StarkParameters;
use quartz_air::proof::Proof;
use quartz_core::field::MODULUS;
use quartz_core::{Digest, Felt, Instruction, Program};
use serde::Deserialize;

// ERRORS
// ================================================================================================

/// A driver failure; the display form is prefixed with the failing stage.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("io: {0}")]
    Io(String),
    #[error("io: {0}")]
    MalformedInput(#[from] serde_json::Error),
    #[error("io: {0}")]
    MalformedClaim(String),
    #[error("program: {0}")]
    Program(#[from] quartz_core::ProgramError),
    #[error("execution: {0}")]
    Execution(#[from] quartz_processor::ExecutionError),
    #[error("execution: padded height 2^{actual} exceeds the requested maximum 2^{maximum}")]
    PaddedHeightExceeded { actual: u32, maximum: u8 },
    #[error("prover: {0}")]
    Prover(#[from] quartz_prover::ProverError),
    #[error("verifier: {0}")]
    Verifier(#[from] quartz_verifier::VerificationError),
}

// WIRE TYPES
// ================================================================================================

#[derive(Debug, Deserialize)]
pub struct WireClaim {
    pub program_digest: String,
    pub version: u32,
    #[serde(default)]
    pub input: Vec<u64>,
    #[serde(default)]
    pub output: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct WireProgram {
    pub instructions: Vec<String>,
    #[serde(default)]
    pub address_to_label: Option<HashMap<String, u64>>,
    #[serde(default)]
    pub debug_information: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireNonDeterminism {
    #[serde(default)]
    pub individual_tokens: Vec<u64>,
    #[serde(default)]
    pub digests: Vec<String>,
    #[serde(default)]
    pub ram: HashMap<String, u64>,
}

impl WireClaim {
    pub fn to_claim(&self) -> Result<Claim, DriverError> {
        let program_digest = Digest::from_hex(&self.program_digest).ok_or_else(|| {
            DriverError::MalformedClaim(format!(
                "`{}` is not a 40-byte hex digest",
                self.program_digest
            ))
        })?;
        Ok(Claim {
            program_digest,
            version: self.version,
            input: felts_from_u64s(&self.input)?,
            output: felts_from_u64s(&self.output)?,
        })
    }
}

impl WireProgram {
    pub fn to_program(&self) -> Result<Program, DriverError> {
        let instructions = self
            .instructions
            .iter()
            .map(|rendered| rendered.parse::<Instruction>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Program::new(instructions)?)
    }
}

impl WireNonDeterminism {
    /// Flattens the secret tokens: the individual tokens first, then every
    /// digest element in order.
    pub fn secret_input(&self) -> Result<Vec<Felt>, DriverError> {
        let mut tokens = felts_from_u64s(&self.individual_tokens)?;
        for hex in &self.digests {
            let digest = Digest::from_hex(hex).ok_or_else(|| {
                DriverError::MalformedClaim(format!("`{hex}` is not a 40-byte hex digest"))
            })?;
            tokens.extend_from_slice(digest.elements());
        }
        Ok(tokens)
    }

    pub fn initial_ram(&self) -> Result<BTreeMap<Felt, Felt>, DriverError> {
        let mut ram = BTreeMap::new();
        for (address, value) in &self.ram {
            let address = address.parse::<u64>().map_err(|_| {
                DriverError::MalformedClaim(format!("`{address}` is not a RAM address"))
            })?;
            ram.insert(checked_felt(address)?, checked_felt(*value)?);
        }
        Ok(ram)
    }
}

fn checked_felt(value: u64) -> Result<Felt, DriverError> {
    if value >= MODULUS {
        return Err(DriverError::MalformedClaim(format!(
            "{value} is not a canonical field element"
        )));
    }
    Ok(Felt::new(value))
}

fn felts_from_u64s(values: &[u64]) -> Result<Vec<Felt>, DriverError> {
    values.iter().map(|&value| checked_felt(value)).collect()
}

// DRIVER
// ================================================================================================

/// Reads the five prover input documents, executes the program, and proves
/// the claim.
///
/// # Errors
/// Returns a stage-tagged error on malformed input, failed execution, or a
/// failed proving attempt.
pub fn prove_from_reader(input: &mut impl BufRead) -> Result<Proof, DriverError> {
    let wire_claim: WireClaim = serde_json::from_str(&read_line(input)?)?;
    let wire_program: WireProgram = serde_json::from_str(&read_line(input)?)?;
    let non_determinism: WireNonDeterminism = serde_json::from_str(&read_line(input)?)?;
    let max_log2_padded_height: Option<u8> = serde_json::from_str(&read_line(input)?)?;
    let _environment: serde_json::Value = serde_json::from_str(&read_line(input)?)?;

    let claim = wire_claim.to_claim()?;
    let program = wire_program.to_program()?;

    let (aet, output) = quartz_processor::trace_execution_with_ram(
        program,
        claim.input.clone(),
        non_determinism.secret_input()?,
        non_determinism.initial_ram()?,
    )?;
    if output != claim.output {
        return Err(DriverError::MalformedClaim(
            "the execution output does not match the claimed output".to_string(),
        ));
    }
    if let Some(maximum) = max_log2_padded_height {
        let actual = aet.padded_height().trailing_zeros();
        if actual > maximum as u32 {
            return Err(DriverError::PaddedHeightExceeded { actual, maximum });
        }
    }

    let proof = quartz_prover::prove(&claim, &aet, &StarkParameters::default())?;
    Ok(proof)
}

/// Reads a claim and a proof and verifies them.
///
/// # Errors
/// Returns a stage-tagged error on malformed input or a rejected proof.
pub fn verify_from_reader(input: &mut impl BufRead) -> Result<(), DriverError> {
    let wire_claim: WireClaim = serde_json::from_str(&read_line(input)?)?;
    let proof: Proof = serde_json::from_str(&read_line(input)?)?;
    let claim = wire_claim.to_claim()?;
    quartz_verifier::verify(&claim, &proof, &StarkParameters::default())?;
    Ok(())
}

fn read_line(input: &mut impl BufRead) -> Result<String, DriverError> {
    let mut line = String::new();
    let read = input.read_line(&mut line).map_err(|err| DriverError::Io(err.to_string()))?;
    if read == 0 {
        return Err(DriverError::Io("unexpected end of input".to_string()));
    }
    Ok(line)
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_programs_parse_into_programs() {
        let wire = WireProgram {
            instructions: vec!["Push(100)".to_string(), "Halt".to_string()],
            address_to_label: None,
            debug_information: None,
        };
        let program = wire.to_program().unwrap();
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn non_canonical_field_elements_are_rejected() {
        let wire = WireClaim {
            program_digest: "00".repeat(40),
            version: 1,
            input: vec![u64::MAX],
            output: vec![],
        };
        assert!(wire.to_claim().is_err());
    }

    #[test]
    fn malformed_digests_are_rejected() {
        let wire = WireClaim {
            program_digest: "beef".to_string(),
            version: 1,
            input: vec![],
            output: vec![],
        };
        assert!(wire.to_claim().is_err());
    }

    #[test]
    fn secret_digests_flatten_into_tokens() {
        let digest = quartz_core::hash::hash_varlen(&[Felt::new(1)]);
        let wire = WireNonDeterminism {
            individual_tokens: vec![5],
            digests: vec![digest.to_hex()],
            ram: HashMap::new(),
        };
        let tokens = wire.secret_input().unwrap();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0], Felt::new(5));
        assert_eq!(&tokens[1..], digest.elements());
    }
}
