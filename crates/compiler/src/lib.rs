//! JAC Ahead-of-Time Compiler
//!
//! Compiles a statically-typed subset of JavaScript function
//! declarations straight to native code, and wires the result back into
//! an ordinary JS interpreter as a drop-in source rewrite. See
//! [`host::evaluate`] for the single entry point a host actually calls;
//! everything else in this crate is a pipeline stage that function
//! drives in sequence.
//!
//! # Extending the host
//!
//! A host implements [`host::Interpreter`] over its own JS engine and
//! calls [`host::evaluate`] wherever it would otherwise call `eval`:
//!
//! ```rust,ignore
//! use jac_compiler::config::CompilerConfig;
//! use jac_compiler::host::{evaluate, EvalFlags, Interpreter};
//!
//! let mut ctx = jac_core::RuntimeContext::new(host_ptr);
//! let result = evaluate(&mut my_interpreter, &mut ctx, source, "main.js", EvalFlags::default(), &CompilerConfig::new());
//! ```

pub mod ast;
pub mod cfg;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod host;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod types;

pub use config::{BackendMode, CompilerConfig, ConfigError};
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use discovery::DiscoveredFunction;
pub use error::CompileError;
pub use host::{
    evaluate, evaluate_with_diagnostics, CompiledFunctionRecord, EvalFlags, InterpError, InterpResult,
    Interpreter,
};
pub use parser::Parser;
pub use types::StaticType;
