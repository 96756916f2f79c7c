use clap::Parser;
use larchcore::bytefile::Bytefile;
use larchverify::verifier::{self, VerifierError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Static verifier for Larch bytecode files.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Bytecode file to verify
    file: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let bf = match Bytefile::load(&args.file) {
        Ok(bf) => bf,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(1);
        }
    };

    match verifier::verify(&bf) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ VerifierError::Decode(_)) => {
            eprintln!("{}", err);
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(3)
        }
    }
}
