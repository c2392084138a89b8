//! The typed three-address control-flow graph (§3 "CFG", §4.4).
//!
//! Structurally this mirrors the original's `tacEmit.h`/`cfgEmit.cpp`
//! split between a passive data shape (this module) and an active
//! emitter (`emit`), and the teacher's own split between `ast.rs` (data)
//! and `codegen/*.rs` (logic in dedicated per-concern submodules). Three
//! further submodules carry one pipeline stage each, matching spec.md's
//! own component boundaries: [`emit`] (§4.4), [`simplify`] (§4.5),
//! [`alloc`] (§4.6).

pub mod alloc;
pub mod emit;
pub mod simplify;

use std::collections::HashSet;

use crate::types::{Opcode, StaticType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    I32(i32),
    F64(f64),
    Bool(bool),
    /// A `StringConst` temp, used both for string literals and for
    /// member-access key names materialised via `ConstInit` (§4.4).
    StringConst(String),
}

#[derive(Debug, Clone)]
pub enum CallTarget {
    /// A callee resolvable at compile time against the function's own
    /// signature table (§4.4 "Calls whose callee is a bare identifier
    /// resolvable... are emitted as native Call statements").
    Native(String),
    /// Everything else: first argument slot is `this`, selected by the
    /// static types of callee and `this` at lowering time (§4.7).
    Indirect { callee: TempId, this_val: Option<TempId> },
}

#[derive(Debug, Clone)]
pub enum Instr {
    ConstInit { dst: TempId, value: ConstValue },
    BinOp { dst: TempId, op: Opcode, lhs: TempId, rhs: TempId },
    UnOp { dst: TempId, op: Opcode, operand: TempId },
    /// Cast/move, `dst := src` (§4.4 "cast each operand via Set"; §4.7
    /// describes the scalar/`Any` conversion rules this compiles to).
    Set { dst: TempId, src: TempId },
    GetMember { dst: TempId, parent: TempId, key: TempId },
    SetMember { parent: TempId, key: TempId, value: TempId },
    Call { dst: Option<TempId>, target: CallTarget, args: Vec<TempId> },
    /// Increments a temp's refcount (manual `Rc`-style bookkeeping; a
    /// no-op for primitive-typed temps at lowering time, §9).
    Dup { dst: TempId, src: TempId },
    /// Schedules `src` for release at the current free-stack-frame's
    /// exit (§4.4 "PushFree / Dup discipline").
    PushFree { src: TempId },
}

#[derive(Debug, Clone)]
pub enum Terminator {
    Jump(BlockId),
    Branch { cond: TempId, then_blk: BlockId, else_blk: BlockId },
    Return,
    ReturnValue(TempId),
    Throw(TempId),
    /// Emit left a block unterminated; §4.4's end-of-emit fixup pass
    /// replaces every one of these with `Return`/`ReturnValue` before
    /// the CFG is considered complete.
    None,
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instrs: Vec<Instr>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn is_terminated(&self) -> bool {
        !matches!(self.terminator, Terminator::None)
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: StaticType,
}

/// A compiled function's CFG, plus the bookkeeping the lowerer (§4.7)
/// and allocator (§4.6) need: the temp-to-type table, and the set of
/// runtime helper names this function's body actually calls (so the
/// backend only declares externs it uses).
#[derive(Debug, Clone)]
pub struct CfgFunction {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: StaticType,
    pub blocks: Vec<BasicBlock>,
    pub entry: BlockId,
    pub temp_types: Vec<StaticType>,
    pub required_helpers: HashSet<&'static str>,
}

impl CfgFunction {
    pub fn temp_type(&self, t: TempId) -> StaticType {
        self.temp_types[t.0 as usize]
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        self.blocks.iter().find(|b| b.id == id).expect("unknown block id")
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks.iter_mut().find(|b| b.id == id).expect("unknown block id")
    }
}
