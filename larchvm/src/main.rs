use clap::Parser;
use larchcore::bytefile::Bytefile;
use larchvm::interpreter::{Interpreter, InterpreterError};
use larchvm::stack::StackError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Larch VM bytecode interpreter: load, verify, run.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Bytecode file to execute
    file: PathBuf,
}

// Exit codes: 1 load, 2 malformed instruction, 3 verification,
// 4 runtime abort, 5 stack exhaustion.
fn exit_code(err: &InterpreterError) -> u8 {
    match err.root() {
        InterpreterError::Bytefile(_) => 1,
        InterpreterError::Decode(_) => 2,
        InterpreterError::Stack(StackError::Overflow)
        | InterpreterError::Stack(StackError::CallOverflow)
        | InterpreterError::Stack(StackError::GlobalsOverflow(_)) => 5,
        _ => 4,
    }
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

    if let Err(err) = larchverify::verifier::verify(&bf) {
        eprintln!("{}", err);
        return ExitCode::from(3);
    }

    let file_name = args.file.display().to_string();
    let mut vm = match Interpreter::new(&bf, file_name.as_str()) {
        Ok(vm) => vm,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(exit_code(&err));
        }
    };

    match vm.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}
