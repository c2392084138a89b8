//! Host-value stand-in and runtime context shared by the AOT compiler
//! (`jac-compiler`) and its runtime helper ABI (`jac-runtime`).
//!
//! Neither the host's real tagged-value representation nor the embedding
//! JavaScript engine is part of this workspace — both are external
//! collaborators the specification deliberately leaves unimplemented.
//! This crate provides the minimal stand-ins ([`value::HostValue`],
//! [`context::RuntimeContext`]) that let the rest of the workspace be
//! built and tested against something concrete.

pub mod context;
pub mod errtype;
pub mod value;

pub use context::{ExceptionDetail, FreeStackFrame, RuntimeContext, StringArena};
pub use errtype::ErrType;
pub use value::{HostObject, HostTag, HostValue};
