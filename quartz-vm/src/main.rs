use std::io::{self, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use quartz_vm::{prove_from_reader, verify_from_reader, DriverError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quartz-vm", about = "Quartz zero-knowledge virtual machine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a claim, program, non-determinism, height bound, and environment
    /// from stdin (one JSON document per line) and write a proof to stdout.
    Prove,
    /// Read a claim and a proof from stdin (one JSON document per line) and
    /// check them.
    Verify,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        },
    }
}

fn run(command: Command) -> Result<(), DriverError> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    match command {
        Command::Prove => {
            let proof = prove_from_reader(&mut input)?;
            let rendered = serde_json::to_string(&proof)?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{rendered}").map_err(|err| DriverError::Io(err.to_string()))?;
            Ok(())
        },
        Command::Verify => {
            verify_from_reader(&mut input)?;
            println!("verification succeeded");
            Ok(())
        },
    }
}
