use clap::Parser;
use larchcore::bytefile::Bytefile;
use larchstats::stats;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Instruction and idiom frequency statistics for Larch bytecode files.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Bytecode file to analyze
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

    let groups = match stats::collect(&bf) {
        Ok(groups) => groups,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(2);
        }
    };

    let mut out = std::io::stdout().lock();
    if let Err(err) = stats::report(&bf, &groups, &mut out) {
        eprintln!("{}", err);
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}
