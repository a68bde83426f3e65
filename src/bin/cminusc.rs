//! The compiler driver binary: reads a C-minus source file, runs it through
//! the full pipeline, and writes RISC-V assembly (spec.md §6/§11).
//!
//! run with `--help` for more info.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use cminus::driver::{Session, TraceFlags};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the C-minus source file to compile
    source_file: PathBuf,

    /// where to write the generated assembly (default: asm/<basename>.asm)
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,

    /// trace tokens as scanned
    #[arg(long = "ts", default_value_t = false)]
    trace_tokens: bool,
    /// trace the parsed syntax tree
    #[arg(long = "tp", default_value_t = false)]
    trace_tree: bool,
    /// trace the final symbol table
    #[arg(long = "ta", default_value_t = false)]
    trace_symtab: bool,
    /// include comments in the emitted assembly
    #[arg(long = "tc", default_value_t = false)]
    trace_comments: bool,
}

fn default_output_path(source_file: &Path) -> PathBuf {
    let stem = source_file.file_stem().unwrap_or_default();
    Path::new("asm").join(stem).with_extension("asm")
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = match std::fs::read_to_string(&args.source_file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: couldn't read {}: {e}", args.source_file.display());
            return ExitCode::FAILURE;
        }
    };

    let trace = TraceFlags {
        tokens: args.trace_tokens,
        tree: args.trace_tree,
        symtab: args.trace_symtab,
        comments: args.trace_comments,
    };
    let mut session = Session::new(trace);
    let asm = session.compile(&source);

    if !session.listing().is_empty() {
        print!("{}", session.listing());
    }
    for diag in session.diagnostics() {
        eprintln!("{diag}");
    }

    let Some(asm) = asm else {
        return ExitCode::FAILURE;
    };

    let out_path = args.out.unwrap_or_else(|| default_output_path(&args.source_file));
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("error: couldn't create {}: {e}", parent.display());
                return ExitCode::FAILURE;
            }
        }
    }

    let write_result = std::fs::File::create(&out_path).and_then(|mut file| file.write_all(asm.as_bytes()));
    if let Err(e) = write_result {
        eprintln!("error: couldn't write {}: {e}", out_path.display());
        let _ = std::fs::remove_file(&out_path);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
