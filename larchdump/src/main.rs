use clap::Parser;
use larchcore::bytefile::Bytefile;
use larchcore::disasm;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Disassembler for Larch bytecode files.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Bytecode file to disassemble
    file: PathBuf,

    /// Print the parsed container metadata before the listing
    #[arg(long, default_value_t = false)]
    dump_header: bool,
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

    if args.dump_header {
        println!("{}", bf);
    }

    let mut out = std::io::stdout().lock();
    match disasm::disassemble(&bf, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(2)
        }
    }
}
