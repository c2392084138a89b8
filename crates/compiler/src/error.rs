//! Per-stage error types and their union, `CompileError`.
//!
//! Generalised from the teacher's `codegen::error::CodeGenError` (a
//! two-variant enum wrapping a logic-error string and a `fmt::Error`)
//! into one `thiserror` enum per pipeline stage, matching §7's error
//! taxonomy item-for-item. Every stage's error is *local*: the host glue
//! in [`crate::host`] catches it at the crate boundary and falls back to
//! the interpreter rather than letting it propagate, so none of these
//! are ever ICEs — they are expected, routine results of a source file
//! using a construct outside the supported subset.

use crate::lexer::SourcePos;

/// Stage 1: lexical errors (§7 item 1).
#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("{pos}: invalid token")]
    InvalidToken { pos: SourcePos },
    #[error("{pos}: unterminated string literal")]
    UnterminatedString { pos: SourcePos },
    #[error("{pos}: unterminated block comment")]
    UnterminatedComment { pos: SourcePos },
    #[error("{pos}: bad numeric literal: {message}")]
    BadNumericLiteral { pos: SourcePos, message: String },
}

/// Stage 2: syntactic errors (§7 item 2).
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{pos}: unexpected token {found:?}, {message}")]
    UnexpectedToken { pos: SourcePos, found: String, message: String },
    #[error("{pos}: {name} not allowed in this context")]
    ContextViolation { pos: SourcePos, name: String },
    #[error("{pos}: unrecognised type annotation {name:?}")]
    UnknownType { pos: SourcePos, name: String },
}

/// Stage 3: function discovery — not itself a fallible stage per §4.3
/// (partial annotation simply means "not collected"), kept for symmetry
/// and for the one case that *is* an error: a duplicate top-level name.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("duplicate top-level function declaration: {name}")]
    DuplicateFunction { name: String },
}

/// Stage 4: unsupported constructs encountered while lowering a
/// function body to the CFG (§7 item 3).
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("unsupported construct: {what}")]
    Unsupported { what: String },
    #[error("reference to undeclared binding {name:?}")]
    UnknownBinding { name: String },
    #[error("break outside of a loop")]
    BreakOutsideLoop,
    #[error("continue outside of a loop")]
    ContinueOutsideLoop,
    #[error("{op:?} is not defined for operand types {lhs:?} and {rhs:?}")]
    TypeMismatch { op: String, lhs: crate::types::StaticType, rhs: crate::types::StaticType },
}

/// Stage 5: unsupported opcode/operand combinations surfacing only once
/// native lowering inspects concrete types (§7 item 4).
#[derive(Debug, thiserror::Error)]
pub enum LowerError {
    #[error("GetMember/SetMember parent type must be Object or Any, found {found:?}")]
    InvalidMemberParent { found: crate::types::StaticType },
    #[error("no native lowering for opcode {opcode:?} on operand types {lhs:?}/{rhs:?}")]
    UnsupportedOperandTypes {
        opcode: crate::types::Opcode,
        lhs: crate::types::StaticType,
        rhs: crate::types::StaticType,
    },
    #[error("backend error: {0}")]
    Backend(String),
}

/// The union of every stage's error, used by [`crate::host`] to decide
/// "this compilation job failed, fall back to the interpreter for this
/// function" without caring which stage failed.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error(transparent)]
    Lower(#[from] LowerError),
}

impl CompileError {
    /// The source position the failing stage was looking at, when it has
    /// one. Lexing and parsing always know where they are; discovery,
    /// emission, and lowering work over an already-parsed AST/CFG that no
    /// longer carries per-node positions, so those report `None`.
    pub fn position(&self) -> Option<SourcePos> {
        match self {
            CompileError::Lex(e) => Some(match e {
                LexError::InvalidToken { pos }
                | LexError::UnterminatedString { pos }
                | LexError::UnterminatedComment { pos }
                | LexError::BadNumericLiteral { pos, .. } => *pos,
            }),
            CompileError::Parse(e) => Some(match e {
                ParseError::UnexpectedToken { pos, .. }
                | ParseError::ContextViolation { pos, .. }
                | ParseError::UnknownType { pos, .. } => *pos,
            }),
            CompileError::Discovery(_) | CompileError::Emit(_) | CompileError::Lower(_) => None,
        }
    }
}
