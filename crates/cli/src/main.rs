//! JAC CLI
//!
//! Command-line harness that forwards a source file to the AOT compiler
//! and a trivial stand-in interpreter that prints whatever source it was
//! finally asked to run. There is no real embedding host in this
//! workspace (§1 "the existing interpreter" is an external collaborator)
//! so this binary exists purely to drive the pipeline end to end and
//! inspect what it produces.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use jac_compiler::config::{BackendMode, CompilerConfig};
use jac_compiler::host::{evaluate, EvalFlags, InterpError, InterpResult, Interpreter};

#[derive(ClapParser)]
#[command(name = "jac")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile and run typed top-level functions through the AOT path", long_about = None)]
struct Cli {
    /// Input JavaScript source file
    input: PathBuf,

    /// Treat the input as a module rather than a global script
    #[arg(long)]
    module: bool,

    /// Load compiler settings from a TOML file (overrides the CLI's own defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip native lowering and print each compiled function's simplified CFG shape instead
    #[arg(long)]
    dump_cfg: bool,

    /// Keep the generated LLVM IR and shared object under the system temp directory
    #[arg(long)]
    keep_ir: bool,
}

/// Prints whatever it's asked to evaluate and echoes it back verbatim,
/// standing in for a real JS engine's `eval`.
struct PrintingInterpreter;

impl Interpreter for PrintingInterpreter {
    fn eval(&mut self, source: &str, filename: &str, _flags: EvalFlags) -> Result<InterpResult, InterpError> {
        tracing::info!(filename, "handing source to the interpreter");
        println!("{source}");
        Ok(InterpResult(source.to_string()))
    }
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {}", cli.input.display(), e);
            process::exit(1);
        }
    };

    let mut config = match &cli.config {
        Some(path) => match CompilerConfig::from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Error reading config {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => CompilerConfig::new(),
    };
    config.keep_generated_ir = config.keep_generated_ir || cli.keep_ir;
    if cli.dump_cfg {
        config.backend_mode = BackendMode::DescribeOnly;
    }

    let filename = cli.input.to_string_lossy().into_owned();
    let flags = EvalFlags { is_module: cli.module };

    let host_context: *mut std::ffi::c_void = std::ptr::null_mut();
    let mut ctx = jac_core::RuntimeContext::new(host_context);
    let mut interp = PrintingInterpreter;

    match evaluate(&mut interp, &mut ctx, &source, &filename, flags, &config) {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
