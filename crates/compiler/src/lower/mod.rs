//! Native lowering (§4.7): the typed CFG's last stop before it becomes
//! textual LLVM IR handed to `clang`.
//!
//! Three submodules, one per concern: [`backend`] is the narrow facade
//! over the textual-IR target (§9's "hide the backend behind a narrow
//! facade" instruction), [`abi`] is the fixed runtime-helper ABI table
//! that facade's callers declare against, and [`func`] is the actual
//! per-instruction/per-terminator lowering plus wrapper generation.

pub mod abi;
pub mod backend;
pub mod func;

pub use func::{lower_module, LoweredFunctionInfo, LoweredModule, NativeSig};
