//! Host glue and fallback (§4.7 "Installation", §4.8).
//!
//! Chains the AOT path between the host's public `eval` and the
//! interpreter's private one: parse, discover, emit, simplify, allocate,
//! lower, install, rewrite, forward. On any compile-stage error the
//! *original* source is forwarded unchanged instead — fallback happens at
//! whole-`eval`-call granularity, matching §4.8's "on any exception from
//! the compile path... it forwards the original source unchanged" (not a
//! per-function fallback; one bad function aborts the whole job).
//!
//! Generic over [`Interpreter`] because "the existing interpreter" is an
//! explicit external collaborator (§1) and producing the host's value
//! representation is a non-goal — this crate supplies only the trait and
//! a mock implementation for its own tests (`tests/scenarios.rs`).

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use jac_core::RuntimeContext;

use crate::cfg::emit::{emit_function, Signature};
use crate::cfg::simplify::simplify;
use crate::cfg::CfgFunction;
use crate::config::{BackendMode, CompilerConfig};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::discovery::{self, DiscoveredFunction};
use crate::error::{CompileError, LowerError};
use crate::lower::{lower_module, LoweredModule};
use crate::parser::Parser;

/// Mirrors the interpreter's own evaluation flags (§6 "Compiler entry
/// point"): the compiler only cares about the global-vs-module
/// distinction and forwards it unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalFlags {
    pub is_module: bool,
}

/// Stand-in for whatever value representation the embedding interpreter
/// actually returns — producing that representation is explicitly out of
/// scope (§1), so this crate only needs something concrete enough to
/// plumb through its own tests.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpResult(pub String);

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct InterpError(pub String);

/// The external collaborator "the existing interpreter" (§1, §4.8). A
/// production host implements this over its real JS interpreter; this
/// crate's own test suite supplies a minimal mock.
pub trait Interpreter {
    fn eval(&mut self, source: &str, filename: &str, flags: EvalFlags) -> Result<InterpResult, InterpError>;
}

/// One compiled top-level function, as installed (§4.7 "Installation").
/// `dylib_path` and `wrapper_symbol` are exactly what a real host would
/// `dlopen`/`dlsym` to bind a callable host function object to `alias`
/// before handing the rewritten source to the interpreter — that bind
/// step itself reaches into the external host and isn't performed here.
#[derive(Debug, Clone)]
pub struct CompiledFunctionRecord {
    pub name: String,
    pub alias: String,
    pub wrapper_symbol: String,
    pub dylib_path: PathBuf,
}

struct CompileOutcome {
    rewritten_source: String,
    functions: Vec<CompiledFunctionRecord>,
}

static NEXT_FAKE_ADDR: AtomicU64 = AtomicU64::new(0x5580_0000_1000);

/// Synthesises a plausible, monotonically increasing "host function
/// object" address for the stub-naming scheme (§6 "decimal pointer").
/// A production host's installation step would use the address `dlsym`
/// actually returned; this compiler never links its own output into a
/// running host, so it manufactures one instead, deterministically
/// distinct per call.
fn next_fake_ptr() -> u64 {
    NEXT_FAKE_ADDR.fetch_add(0x40, Ordering::Relaxed)
}

/// The AOT evaluator (§4.8). Drives the full pipeline against `source`
/// and, on success, forwards the rewritten source to `interp`; on any
/// compile-stage failure, logs why and forwards the original source
/// instead, preserving "behaviour equivalent to running the untransformed
/// source with compiled functions treated as ordinary host functions."
pub fn evaluate<I: Interpreter>(
    interp: &mut I,
    ctx: &mut RuntimeContext,
    source: &str,
    filename: &str,
    flags: EvalFlags,
    config: &CompilerConfig,
) -> Result<InterpResult, InterpError> {
    let mut discard = Vec::new();
    evaluate_with_diagnostics(interp, ctx, source, filename, flags, config, &mut discard)
}

/// As [`evaluate`], but also reports why the compile path fell back (if it
/// did) through `diagnostics` (SPEC_FULL §3.1). A host that doesn't care
/// can keep calling [`evaluate`]; one that wants to surface compile
/// failures — a `--dump-cfg`-style tool, or a test asserting on *why* a
/// function didn't compile — passes its own sink here instead.
pub fn evaluate_with_diagnostics<I: Interpreter>(
    interp: &mut I,
    ctx: &mut RuntimeContext,
    source: &str,
    filename: &str,
    flags: EvalFlags,
    config: &CompilerConfig,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<InterpResult, InterpError> {
    let span = tracing::debug_span!("jac_evaluate", filename);
    let _enter = span.enter();

    match compile(source, ctx, config) {
        Ok(outcome) => {
            tracing::debug!(compiled = outcome.functions.len(), "AOT compile succeeded");
            interp.eval(&outcome.rewritten_source, filename, flags)
        }
        Err(err) => {
            tracing::warn!(error = %err, "AOT compile failed, falling back to the interpreter");
            diagnostics.push(Diagnostic::from_compile_error(&err));
            interp.eval(source, filename, flags)
        }
    }
}

fn compile(source: &str, ctx: &mut RuntimeContext, config: &CompilerConfig) -> Result<CompileOutcome, CompileError> {
    let program = {
        let _span = tracing::trace_span!("parse").entered();
        let mut parser = Parser::new(source)?;
        parser.parse_program()
    };

    let discovered = {
        let _span = tracing::trace_span!("discover").entered();
        discovery::discover(&program)?
    };

    if discovered.is_empty() {
        return Ok(CompileOutcome { rewritten_source: source.to_string(), functions: Vec::new() });
    }

    let mut signatures = HashMap::new();
    for f in &discovered {
        if let Some(sig) = Signature::of(f.decl) {
            signatures.insert(f.decl.name.clone(), sig);
        }
    }

    let mut cfgs: Vec<CfgFunction> = Vec::with_capacity(discovered.len());
    for f in &discovered {
        let _span = tracing::trace_span!("emit", name = %f.decl.name).entered();
        let mut cfg = emit_function(f.decl, &signatures)?;
        if config.simplify_cfg {
            simplify(&mut cfg);
        }
        cfgs.push(cfg);
    }

    match config.backend_mode {
        BackendMode::DescribeOnly => Ok(describe_only_outcome(source, &discovered, &cfgs)),
        BackendMode::NativeLlvmIr => {
            let _span = tracing::trace_span!("lower").entered();
            let ctx_addr = ctx as *mut RuntimeContext as u64;
            let module = lower_module(&cfgs, ctx_addr)?;
            let dylib_path = install_native(&module, config.keep_generated_ir)?;
            Ok(splice_aliases(source, &discovered, &module, dylib_path))
        }
    }
}

/// Rewrites `source` per §4.7 "Installation": each discovered function's
/// declaration source slice is replaced in place by `var <name> =
/// <alias>; /* compiled from: <original source> */`, aliasing a
/// synthetic `__jac_aot_func_<pointer>` identifier.
fn splice_aliases(
    source: &str,
    discovered: &[DiscoveredFunction<'_>],
    module: &LoweredModule,
    dylib_path: PathBuf,
) -> CompileOutcome {
    let mut rewritten = source.to_string();
    let mut functions = Vec::with_capacity(discovered.len());
    for (f, info) in discovered.iter().zip(&module.functions) {
        let alias = format!("__jac_aot_func_{}", next_fake_ptr());
        let replacement =
            format!("var {} = {alias}; /* compiled from: {} */", f.decl.name, f.decl.source_text);
        rewritten = rewritten.replacen(&f.decl.source_text, &replacement, 1);
        functions.push(CompiledFunctionRecord {
            name: f.decl.name.clone(),
            alias,
            wrapper_symbol: info.wrapper_symbol.clone(),
            dylib_path: dylib_path.clone(),
        });
    }
    CompileOutcome { rewritten_source: rewritten, functions }
}

/// A `--dump-cfg`-friendly stand-in for [`splice_aliases`] that never
/// shells out to `clang`: the alias is still spliced in (so rewrite
/// behaviour is identical either way) but the "address" embedded in the
/// alias name is an index rather than a fake pointer, and no dylib is
/// built. Used by [`crate::config::BackendMode::DescribeOnly`].
fn describe_only_outcome(
    source: &str,
    discovered: &[DiscoveredFunction<'_>],
    cfgs: &[CfgFunction],
) -> CompileOutcome {
    let mut rewritten = source.to_string();
    let mut functions = Vec::with_capacity(discovered.len());
    for (idx, f) in discovered.iter().enumerate() {
        let alias = format!("__jac_aot_func_{idx}");
        let replacement =
            format!("var {} = {alias}; /* compiled from: {} */", f.decl.name, f.decl.source_text);
        rewritten = rewritten.replacen(&f.decl.source_text, &replacement, 1);
        functions.push(CompiledFunctionRecord {
            name: f.decl.name.clone(),
            alias,
            wrapper_symbol: format!("_caller_{}", cfgs[idx].name),
            dylib_path: PathBuf::new(),
        });
    }
    CompileOutcome { rewritten_source: rewritten, functions }
}

/// Assembles `module.ir` with `clang` into a shared library linked
/// against the embedded `jac-runtime`, mirroring the teacher's own
/// `compile_file_with_config` invocation shape (write `.ll`, locate the
/// runtime archive, shell out, check exit status) — the one difference
/// being the output artifact: a standalone executable there, a `-shared`
/// object here, since compiled functions must be installed as callable
/// values inside an already-running host rather than run as their own
/// process.
fn install_native(module: &LoweredModule, keep_ir: bool) -> Result<PathBuf, LowerError> {
    let runtime_lib = option_env!("JAC_RUNTIME_LIB_PATH")
        .ok_or_else(|| LowerError::Backend("jac-runtime static library not embedded in this build".into()))?;
    let runtime_lib = PathBuf::from(runtime_lib);
    let lib_dir = runtime_lib
        .parent()
        .ok_or_else(|| LowerError::Backend("runtime lib path has no parent directory".into()))?;

    let unique = format!("jac_aot_{}_{}", std::process::id(), next_fake_ptr());
    let ir_path = std::env::temp_dir().join(format!("{unique}.ll"));
    let dylib_path = std::env::temp_dir().join(format!("{unique}.so"));

    std::fs::write(&ir_path, &module.ir)
        .map_err(|e| LowerError::Backend(format!("failed to write generated IR: {e}")))?;

    let output = Command::new("clang")
        .arg("-O2")
        .arg("-shared")
        .arg("-fPIC")
        .arg(&ir_path)
        .arg("-o")
        .arg(&dylib_path)
        .arg("-L")
        .arg(lib_dir)
        .arg("-ljac_runtime")
        .output()
        .map_err(|e| LowerError::Backend(format!("failed to run clang: {e}")))?;

    if !keep_ir {
        let _ = std::fs::remove_file(&ir_path);
    }

    if !output.status.success() {
        return Err(LowerError::Backend(format!(
            "clang failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(dylib_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;

    struct EchoInterpreter {
        pub last_source: String,
    }

    impl Interpreter for EchoInterpreter {
        fn eval(&mut self, source: &str, _filename: &str, _flags: EvalFlags) -> Result<InterpResult, InterpError> {
            self.last_source = source.to_string();
            Ok(InterpResult(source.to_string()))
        }
    }

    #[test]
    fn untyped_source_is_forwarded_unchanged() {
        let mut interp = EchoInterpreter { last_source: String::new() };
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let src = "let x = 1 + 2;";
        let config = CompilerConfig::describe_only();
        let result = evaluate(&mut interp, &mut ctx, src, "<test>", EvalFlags::default(), &config).unwrap();
        assert_eq!(result.0, src);
    }

    #[test]
    fn a_syntax_error_falls_back_to_the_original_source() {
        let mut interp = EchoInterpreter { last_source: String::new() };
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let src = "function f( : int32) { return 1; }";
        let config = CompilerConfig::describe_only();
        let result = evaluate(&mut interp, &mut ctx, src, "<test>", EvalFlags::default(), &config).unwrap();
        assert_eq!(result.0, src);
    }

    #[test]
    fn a_syntax_error_reports_a_diagnostic_at_the_failing_position() {
        let mut interp = EchoInterpreter { last_source: String::new() };
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let src = "function f( : int32) { return 1; }";
        let config = CompilerConfig::describe_only();
        let mut diagnostics: Vec<crate::diagnostics::Diagnostic> = Vec::new();
        let result = evaluate_with_diagnostics(
            &mut interp, &mut ctx, src, "<test>", EvalFlags::default(), &config, &mut diagnostics,
        )
        .unwrap();
        assert_eq!(result.0, src);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, crate::diagnostics::Severity::Error);
    }

    #[test]
    fn a_successful_compile_reports_no_diagnostics() {
        let mut interp = EchoInterpreter { last_source: String::new() };
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let src = "function f(a: int32): int32 { return a; }";
        let config = CompilerConfig::describe_only();
        let mut diagnostics: Vec<crate::diagnostics::Diagnostic> = Vec::new();
        evaluate_with_diagnostics(
            &mut interp, &mut ctx, src, "<test>", EvalFlags::default(), &config, &mut diagnostics,
        )
        .unwrap();
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn describe_only_splices_an_alias_without_touching_clang() {
        let mut interp = EchoInterpreter { last_source: String::new() };
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let src = "function f(a: int32): int32 { return a; }";
        let config = CompilerConfig::describe_only();
        let result = evaluate(&mut interp, &mut ctx, src, "<test>", EvalFlags::default(), &config).unwrap();
        assert!(result.0.contains("__jac_aot_func_0"));
        assert!(result.0.contains("/* compiled from: function f(a: int32): int32 { return a; } */"));
    }
}
