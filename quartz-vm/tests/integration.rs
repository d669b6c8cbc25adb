//! End-to-end tests: execute, prove, verify, and mutate.

use std::io::BufReader;

use quartz_air::claim::Claim;
use quartz_air::parameters::StarkParameters;
use quartz_air::proof::Proof;
use quartz_core::instruction::{NumWords, StackIdx};
use quartz_core::{Felt, Instruction, Program, ONE};
use quartz_processor::trace_execution;
use quartz_prover::prove;
use quartz_verifier::{verify, VerificationError};

fn n(words: u64) -> NumWords {
    NumWords::try_from(words).unwrap()
}

fn prove_program(
    instructions: Vec<Instruction>,
    public_input: Vec<u64>,
    secret_input: Vec<u64>,
) -> (Claim, Proof) {
    let program = Program::new(instructions).unwrap();
    let public_input: Vec<Felt> = public_input.into_iter().map(Felt::new).collect();
    let secret_input: Vec<Felt> = secret_input.into_iter().map(Felt::new).collect();

    let (aet, output) =
        trace_execution(program.clone(), public_input.clone(), secret_input).unwrap();
    let claim = Claim::new(program.hash()).with_input(public_input).with_output(output);
    let proof = prove(&claim, &aet, &StarkParameters::default()).unwrap();
    (claim, proof)
}

#[test]
fn halt_only_proof_verifies() {
    let (claim, proof) = prove_program(vec![Instruction::Halt], vec![], vec![]);
    assert_eq!(claim.output, claim.program_digest.elements().to_vec());
    verify(&claim, &proof, &StarkParameters::default()).unwrap();
}

#[test]
fn push_and_halt_proof_verifies() {
    let (claim, proof) =
        prove_program(vec![Instruction::Push(Felt::new(100)), Instruction::Halt], vec![], vec![]);
    verify(&claim, &proof, &StarkParameters::default()).unwrap();
}

#[test]
fn addition_with_public_io_proof_verifies_and_binds_the_output() {
    let (claim, proof) = prove_program(
        vec![
            Instruction::ReadIo(n(1)),
            Instruction::ReadIo(n(1)),
            Instruction::Add,
            Instruction::WriteIo(n(1)),
            Instruction::Halt,
        ],
        vec![17, 25],
        vec![],
    );
    assert_eq!(claim.output[5], Felt::new(42));
    verify(&claim, &proof, &StarkParameters::default()).unwrap();

    // the claim binds the output: 42 cannot be passed off as 43
    let mut tampered = claim.clone();
    tampered.output[5] = Felt::new(43);
    assert!(verify(&tampered, &proof, &StarkParameters::default()).is_err());

    // nor can the public input change
    let mut tampered = claim;
    tampered.input[0] = Felt::new(18);
    assert!(verify(&tampered, &proof, &StarkParameters::default()).is_err());
}

#[test]
fn secret_witness_stays_secret_and_bad_witnesses_fail() {
    let square_root_program = || {
        vec![
            Instruction::Divine(n(1)),
            Instruction::Dup(StackIdx::try_from(0).unwrap()),
            Instruction::Mul,
            Instruction::Push(Felt::new(25)),
            Instruction::Eq,
            Instruction::Assert,
            Instruction::Halt,
        ]
    };
    let (claim, proof) = prove_program(square_root_program(), vec![], vec![5]);
    // the claim carries only the digest, input, and output
    assert_eq!(claim.output, claim.program_digest.elements().to_vec());
    assert!(claim.input.is_empty());
    verify(&claim, &proof, &StarkParameters::default()).unwrap();

    // a wrong witness aborts execution, so no proof is ever produced
    let program = Program::new(square_root_program()).unwrap();
    assert!(trace_execution(program, vec![], vec![Felt::new(6)]).is_err());
}

#[test]
fn factorial_proof_verifies() {
    let (claim, proof) = prove_program(
        vec![
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
        ],
        vec![],
        vec![],
    );
    assert_eq!(claim.output[5], Felt::new(120));
    verify(&claim, &proof, &StarkParameters::default()).unwrap();
}

#[test]
fn div_mod_proof_verifies() {
    let (claim, proof) = prove_program(
        vec![
            Instruction::Push(Felt::new(17)),
            Instruction::Push(Felt::new(5)),
            Instruction::DivMod,
            Instruction::WriteIo(n(1)),
            Instruction::WriteIo(n(1)),
            Instruction::Halt,
        ],
        vec![],
        vec![],
    );
    assert_eq!(claim.output[5], Felt::new(3));
    assert_eq!(claim.output[6], Felt::new(2));
    verify(&claim, &proof, &StarkParameters::default()).unwrap();
}

#[test]
fn tampered_claims_are_rejected() {
    let (claim, proof) = prove_program(vec![Instruction::Halt], vec![], vec![]);

    let mut wrong_digest = claim.clone();
    let mut elements = *wrong_digest.program_digest.elements();
    elements[0] += ONE;
    wrong_digest.program_digest = quartz_core::Digest::new(elements);
    assert!(verify(&wrong_digest, &proof, &StarkParameters::default()).is_err());

    let extra_input = claim.clone().with_input(vec![ONE]);
    assert!(verify(&extra_input, &proof, &StarkParameters::default()).is_err());

    let mut extra_output = claim.clone();
    extra_output.output.push(ONE);
    assert!(verify(&extra_output, &proof, &StarkParameters::default()).is_err());
}

#[test]
fn tampered_proofs_are_rejected() {
    let (claim, proof) = prove_program(vec![Instruction::Halt], vec![], vec![]);
    let params = StarkParameters::default();

    let mut wrong_root = proof.clone();
    let mut elements = *wrong_root.main_root.elements();
    elements[0] += ONE;
    wrong_root.main_root = quartz_core::Digest::new(elements);
    assert!(verify(&claim, &wrong_root, &params).is_err());

    let mut wrong_ood = proof.clone();
    wrong_ood.ood_composition_value += ONE;
    assert!(verify(&claim, &wrong_ood, &params).is_err());

    let mut wrong_opening = proof.clone();
    wrong_opening.openings[0].main_row[0] += ONE;
    assert!(verify(&claim, &wrong_opening, &params).is_err());

    let mut wrong_fri = proof.clone();
    wrong_fri.fri.final_codeword[0] += ONE;
    assert!(verify(&claim, &wrong_fri, &params).is_err());

    let mut wrong_height = proof;
    wrong_height.log2_padded_height = 4;
    assert_eq!(
        verify(&claim, &wrong_height, &params).unwrap_err(),
        VerificationError::UnsupportedPaddedHeight(4)
    );
}

#[test]
fn proofs_survive_json_round_trips() {
    let (claim, proof) = prove_program(vec![Instruction::Halt], vec![], vec![]);
    let rendered = serde_json::to_string(&proof).unwrap();
    let decoded: Proof = serde_json::from_str(&rendered).unwrap();
    assert_eq!(decoded, proof);
    verify(&claim, &decoded, &StarkParameters::default()).unwrap();
}

#[test]
fn wire_protocol_drives_the_prover_end_to_end() {
    // scenario: read two public inputs, add, write the sum
    let program = Program::new(vec![
        Instruction::ReadIo(n(1)),
        Instruction::ReadIo(n(1)),
        Instruction::Add,
        Instruction::WriteIo(n(1)),
        Instruction::Halt,
    ])
    .unwrap();
    let digest = program.hash();
    let mut output: Vec<u64> = digest.elements().iter().map(|e| e.value()).collect();
    output.push(42);

    let claim_line = serde_json::json!({
        "program_digest": digest.to_hex(),
        "version": 1,
        "input": [17, 25],
        "output": output,
    });
    let program_line = serde_json::json!({
        "instructions": ["ReadIo(1)", "ReadIo(1)", "Add", "WriteIo(1)", "Halt"],
    });
    let stdin = format!(
        "{claim_line}\n{program_line}\n{}\n{}\n{}\n",
        serde_json::json!({ "individual_tokens": [], "digests": [], "ram": {} }),
        serde_json::json!(null),
        serde_json::json!({}),
    );

    let mut reader = BufReader::new(stdin.as_bytes());
    let proof = quartz_vm::prove_from_reader(&mut reader).unwrap();

    let claim = Claim::new(digest)
        .with_input(vec![Felt::new(17), Felt::new(25)])
        .with_output(output.into_iter().map(Felt::new).collect());
    verify(&claim, &proof, &StarkParameters::default()).unwrap();
}

#[test]
fn wire_protocol_rejects_wrong_claimed_output() {
    let program_line = serde_json::json!({ "instructions": ["Halt"] });
    let program = Program::new(vec![Instruction::Halt]).unwrap();
    let claim_line = serde_json::json!({
        "program_digest": program.hash().to_hex(),
        "version": 1,
        "input": [],
        "output": [99],
    });
    let stdin = format!(
        "{claim_line}\n{program_line}\n{}\n{}\n{}\n",
        serde_json::json!({}),
        serde_json::json!(null),
        serde_json::json!({}),
    );
    let mut reader = BufReader::new(stdin.as_bytes());
    assert!(quartz_vm::prove_from_reader(&mut reader).is_err());
}
