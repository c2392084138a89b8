//! The CFG emitter (§4.4): walks a [`FunctionDecl`]'s body and produces a
//! [`CfgFunction`]. Mirrors the split the teacher's own lowering takes
//! between a mutable "current position" (block id, scope stack, loop
//! targets) and a set of methods that each append to whatever block is
//! currently active — rather than returning fragments callers must splice
//! together, every helper below writes straight into `self.blocks` through
//! `self.current`.
//!
//! `required_helpers` is left empty here; populating it is native
//! lowering's job; it runs the finished CFG's instructions through the
//! opcode/type dispatch table and isn't something the emitter, which
//! never inspects that table, can usefully contribute to.

use std::collections::HashMap;

use crate::ast::{
    AssignOp, BinOp, Block, DeclKind, Expr, FunctionDecl, Literal, MemberKey, Stmt, UnOp, UpdateOp,
};
use crate::cfg::{BasicBlock, BlockId, CallTarget, CfgFunction, ConstValue, Instr, Param, TempId, Terminator};
use crate::error::EmitError;
use crate::types::{common_upcast, result_type, Opcode, StaticType};

/// A function's statically known signature, shared read-only among every
/// other function's emitter so a bare-identifier call can be resolved to
/// a native [`CallTarget::Native`] at compile time (§4.4).
#[derive(Debug, Clone)]
pub struct Signature {
    pub params: Vec<StaticType>,
    pub return_type: StaticType,
}

impl Signature {
    pub fn of(decl: &FunctionDecl) -> Option<Signature> {
        let return_type = decl.return_type?;
        let params = decl.params.iter().map(|p| p.type_ann).collect::<Option<Vec<_>>>()?;
        Some(Signature { params, return_type })
    }
}

#[derive(Clone, Copy)]
struct Local {
    temp: TempId,
    ty: StaticType,
    is_const: bool,
}

/// What an expression evaluates to before it's read: either an already
/// materialised value, or a reference to a place that must be read
/// (`Dup`/`GetMember`) or written (`Set`/`SetMember`) explicitly (§4.4).
enum Value {
    RValue(TempId, StaticType),
    LVRef(LVRef),
}

enum LVRef {
    Direct { name: String },
    Member { parent: TempId, key: TempId },
}

pub fn emit_function(
    decl: &FunctionDecl,
    other_signatures: &HashMap<String, Signature>,
) -> Result<CfgFunction, EmitError> {
    let return_type = decl
        .return_type
        .expect("discovery only yields fully typed declarations");
    let mut params = Vec::with_capacity(decl.params.len());
    for p in &decl.params {
        let ty = p.type_ann.expect("discovery only yields fully typed declarations");
        params.push(Param { name: p.name.clone(), ty });
    }

    let mut emitter = Emitter::new(decl.name.clone(), return_type, other_signatures);
    emitter.push_scope();
    for p in &params {
        let temp = emitter.fresh_temp(p.ty);
        emitter.declare_local(p.name.clone(), temp, p.ty, false);
    }

    let terminated = emitter.emit_block(&decl.body)?;
    if !terminated {
        // Falling off the end of a `void` function is ordinary JS control
        // flow; for a typed return it's dead code the source never
        // actually reaches (every live path already returned), left here
        // only so every block keeps a terminator going into §4.5.
        emitter.set_terminator(Terminator::Return);
    }
    emitter.pop_scope();
    emitter.fixup_unterminated_blocks();

    Ok(CfgFunction {
        name: decl.name.clone(),
        params,
        return_type,
        blocks: emitter.blocks,
        entry: emitter.entry,
        temp_types: emitter.temp_types,
        required_helpers: Default::default(),
    })
}

struct Emitter<'a> {
    return_type: StaticType,
    other_signatures: &'a HashMap<String, Signature>,
    scopes: Vec<HashMap<String, Local>>,
    blocks: Vec<BasicBlock>,
    entry: BlockId,
    current: BlockId,
    next_temp: u32,
    next_block: u32,
    temp_types: Vec<StaticType>,
    break_targets: Vec<BlockId>,
    continue_targets: Vec<BlockId>,
}

impl<'a> Emitter<'a> {
    fn new(_name: String, return_type: StaticType, other_signatures: &'a HashMap<String, Signature>) -> Self {
        let entry = BlockId(0);
        let blocks = vec![BasicBlock { id: entry, instrs: Vec::new(), terminator: Terminator::None }];
        Emitter {
            return_type,
            other_signatures,
            scopes: Vec::new(),
            blocks,
            entry,
            current: entry,
            next_temp: 0,
            next_block: 1,
            temp_types: Vec::new(),
            break_targets: Vec::new(),
            continue_targets: Vec::new(),
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) -> Vec<Local> {
        self.scopes.pop().expect("scope underflow").into_values().collect()
    }

    fn declare_local(&mut self, name: String, temp: TempId, ty: StaticType, is_const: bool) {
        self.scopes.last_mut().expect("no active scope").insert(name, Local { temp, ty, is_const });
    }

    fn lookup(&self, name: &str) -> Option<Local> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }

    fn fresh_temp(&mut self, ty: StaticType) -> TempId {
        let id = TempId(self.next_temp);
        self.next_temp += 1;
        self.temp_types.push(ty);
        id
    }

    fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.blocks.push(BasicBlock { id, instrs: Vec::new(), terminator: Terminator::None });
        id
    }

    fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks.iter_mut().find(|b| b.id == id).expect("unknown block id")
    }

    fn emit(&mut self, instr: Instr) {
        let cur = self.current;
        self.block_mut(cur).instrs.push(instr);
    }

    fn set_terminator(&mut self, term: Terminator) {
        let cur = self.current;
        self.block_mut(cur).terminator = term;
    }

    fn is_current_terminated(&self) -> bool {
        self.blocks.iter().find(|b| b.id == self.current).expect("unknown block").is_terminated()
    }

    /// End-of-emit fixup (§4.4): any block still untouched at this point is
    /// one `new_block` allocated for a branch target that turned out to be
    /// unreachable (e.g. the `else` arm synthesised for an `if` with no
    /// source-level `else`, when the `then` arm itself always returns).
    /// Simplification's unreachable-block pass (§4.5) removes it next;
    /// this just guarantees every block is well-formed going in.
    fn fixup_unterminated_blocks(&mut self) {
        for b in &mut self.blocks {
            if matches!(b.terminator, Terminator::None) {
                b.terminator = Terminator::Return;
            }
        }
    }

    // ---- expressions ----------------------------------------------------

    fn emit_expr(&mut self, expr: &Expr) -> Result<Value, EmitError> {
        match expr {
            Expr::Literal(lit) => self.emit_literal(lit),
            Expr::Ident(name) => {
                if self.lookup(name).is_some() {
                    Ok(Value::LVRef(LVRef::Direct { name: name.clone() }))
                } else {
                    Err(EmitError::UnknownBinding { name: name.clone() })
                }
            }
            Expr::This => Err(EmitError::Unsupported { what: "this".to_string() }),
            Expr::Binary { op, lhs, rhs } => self.emit_binary(*op, lhs, rhs),
            Expr::Unary { op, operand } => self.emit_unary(*op, operand),
            Expr::Update { op, prefix, target } => self.emit_update(*op, *prefix, target),
            Expr::Assign { op, target, value } => self.emit_assign(*op, target, value),
            Expr::Conditional { cond, then_expr, else_expr } => {
                self.emit_conditional(cond, then_expr, else_expr)
            }
            Expr::Member { object, property } => {
                let lv = self.emit_member_lvref(object, property)?;
                Ok(Value::LVRef(lv))
            }
            Expr::Call { callee, args } => self.emit_call(callee, args),
            Expr::New { .. } => Err(EmitError::Unsupported { what: "new expression".to_string() }),
            Expr::Sequence(operands) => self.emit_sequence(operands),
            Expr::Unsupported { what } => Err(EmitError::Unsupported { what: what.to_string() }),
        }
    }

    /// Comma operator (§3 "sequence"): every operand but the last is
    /// emitted purely for its effect and its result (if any) scheduled
    /// for release, exactly as an expression-statement discards a
    /// top-level result (`emit_stmt`'s `Stmt::Expr` arm); the last
    /// operand's `Value` is returned uninterpreted so the caller
    /// materialises it exactly as it would any other expression's result.
    fn emit_sequence(&mut self, operands: &[Expr]) -> Result<Value, EmitError> {
        let (last, init) = operands.split_last().expect("parser only builds Sequence with >= 2 operands");
        for e in init {
            self.emit_expr_for_effect(e)?;
        }
        self.emit_expr(last)
    }

    /// Emits `e` and discards its result, releasing it first if it's an
    /// owned `Any` RValue nothing else will reference again.
    fn emit_expr_for_effect(&mut self, e: &Expr) -> Result<(), EmitError> {
        let v = self.emit_expr(e)?;
        if let Value::RValue(t, ty) = v {
            if ty == StaticType::Any {
                self.emit(Instr::PushFree { src: t });
            }
        }
        Ok(())
    }

    fn emit_literal(&mut self, lit: &Literal) -> Result<Value, EmitError> {
        let (ty, value) = match lit {
            Literal::Bool(b) => (StaticType::Bool, ConstValue::Bool(*b)),
            Literal::String(s) => (StaticType::StringConst, ConstValue::StringConst(s.clone())),
            Literal::Number(n) => {
                if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 {
                    (StaticType::I32, ConstValue::I32(*n as i32))
                } else {
                    (StaticType::F64, ConstValue::F64(*n))
                }
            }
        };
        let dst = self.fresh_temp(ty);
        self.emit(Instr::ConstInit { dst, value });
        Ok(Value::RValue(dst, ty))
    }

    /// Materialises a [`Value`] into a usable RValue temp, emitting the
    /// `Dup`/`GetMember` the LVRef form requires (§4.4).
    fn materialize(&mut self, v: Value) -> Result<(TempId, StaticType), EmitError> {
        match v {
            Value::RValue(t, ty) => Ok((t, ty)),
            Value::LVRef(LVRef::Direct { name }) => {
                let local = self.lookup(&name).ok_or(EmitError::UnknownBinding { name })?;
                let dst = self.fresh_temp(local.ty);
                self.emit(Instr::Dup { dst, src: local.temp });
                Ok((dst, local.ty))
            }
            Value::LVRef(LVRef::Member { parent, key }) => {
                let dst = self.fresh_temp(StaticType::Any);
                self.emit(Instr::GetMember { dst, parent, key });
                Ok((dst, StaticType::Any))
            }
        }
    }

    fn cast_to(&mut self, temp: TempId, from: StaticType, to: StaticType) -> Result<TempId, EmitError> {
        if from == to {
            return Ok(temp);
        }
        result_type(Opcode::Set, from, to).map_err(|_| EmitError::TypeMismatch {
            op: "Set".to_string(),
            lhs: from,
            rhs: to,
        })?;
        let dst = self.fresh_temp(to);
        self.emit(Instr::Set { dst, src: temp });
        Ok(dst)
    }

    fn const_key(&mut self, key: &MemberKey) -> Result<TempId, EmitError> {
        match key {
            MemberKey::Name(n) | MemberKey::Private(n) => {
                let dst = self.fresh_temp(StaticType::StringConst);
                self.emit(Instr::ConstInit { dst, value: ConstValue::StringConst(n.clone()) });
                Ok(dst)
            }
            MemberKey::Computed(e) => {
                let v = self.emit_expr(e)?;
                let (t, ty) = self.materialize(v)?;
                self.cast_to(t, ty, StaticType::Any)
            }
        }
    }

    fn emit_member_lvref(&mut self, object: &Expr, key: &MemberKey) -> Result<LVRef, EmitError> {
        let obj_val = self.emit_expr(object)?;
        let (parent, _parent_ty) = self.materialize(obj_val)?;
        let key_temp = self.const_key(key)?;
        Ok(LVRef::Member { parent, key: key_temp })
    }

    fn emit_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<Value, EmitError> {
        match op {
            BinOp::And => {
                let lv = self.emit_expr(lhs)?;
                let lhs_pair = self.materialize(lv)?;
                let (t, ty) = self.emit_short_circuit(true, lhs_pair, |e| {
                    let v = e.emit_expr(rhs)?;
                    e.materialize(v)
                })?;
                Ok(Value::RValue(t, ty))
            }
            BinOp::Or => {
                let lv = self.emit_expr(lhs)?;
                let lhs_pair = self.materialize(lv)?;
                let (t, ty) = self.emit_short_circuit(false, lhs_pair, |e| {
                    let v = e.emit_expr(rhs)?;
                    e.materialize(v)
                })?;
                Ok(Value::RValue(t, ty))
            }
            BinOp::Nullish => Err(EmitError::Unsupported { what: "nullish coalescing".to_string() }),
            _ => {
                let lv = self.emit_expr(lhs)?;
                let (lhs_t, lhs_ty) = self.materialize(lv)?;
                let rv = self.emit_expr(rhs)?;
                let (rhs_t, rhs_ty) = self.materialize(rv)?;
                let opcode = binop_to_opcode(op);
                let res_ty = result_type(opcode, lhs_ty, rhs_ty)?;
                // Relational/equality opcodes always yield Bool (§3), but the
                // *comparison* itself has to happen at the operands' own
                // common type — casting both sides down to Bool first would
                // compare their truthiness instead of their value. Every
                // other family already has operand type == result type.
                let operand_ty = if matches!(
                    opcode,
                    Opcode::Eq | Opcode::Neq | Opcode::Gt | Opcode::Gte | Opcode::Lt | Opcode::Lte
                ) {
                    common_upcast(lhs_ty, rhs_ty)
                } else {
                    res_ty
                };
                let lhs_c = self.cast_to(lhs_t, lhs_ty, operand_ty)?;
                let rhs_c = self.cast_to(rhs_t, rhs_ty, operand_ty)?;
                let dst = self.fresh_temp(res_ty);
                self.emit(Instr::BinOp { dst, op: opcode, lhs: lhs_c, rhs: rhs_c });
                Ok(Value::RValue(dst, res_ty))
            }
        }
    }

    /// Lowers `&&`/`||` (and, via the caller, `&&=`/`||=`) into the
    /// skip/evaluate diamond described in §4.4: the right-hand side is
    /// only ever evaluated on the branch that would observe its value.
    fn emit_short_circuit(
        &mut self,
        is_and: bool,
        lhs: (TempId, StaticType),
        eval_rhs: impl FnOnce(&mut Self) -> Result<(TempId, StaticType), EmitError>,
    ) -> Result<(TempId, StaticType), EmitError> {
        let (lhs_t, lhs_ty) = lhs;
        let skip_blk = self.new_block();
        let eval_blk = self.new_block();
        let merge_blk = self.new_block();

        let (then_blk, else_blk) = if is_and { (eval_blk, skip_blk) } else { (skip_blk, eval_blk) };
        self.set_terminator(Terminator::Branch { cond: lhs_t, then_blk, else_blk });

        self.current = eval_blk;
        let (rhs_t, rhs_ty) = eval_rhs(self)?;
        let res_ty = common_upcast(lhs_ty, rhs_ty);
        let result = self.fresh_temp(res_ty);
        let rhs_c = self.cast_to(rhs_t, rhs_ty, res_ty)?;
        if !self.is_current_terminated() {
            self.emit(Instr::Set { dst: result, src: rhs_c });
            self.set_terminator(Terminator::Jump(merge_blk));
        }

        self.current = skip_blk;
        let lhs_c = self.cast_to(lhs_t, lhs_ty, res_ty)?;
        self.emit(Instr::Set { dst: result, src: lhs_c });
        self.set_terminator(Terminator::Jump(merge_blk));

        self.current = merge_blk;
        Ok((result, res_ty))
    }

    fn emit_unary(&mut self, op: UnOp, operand: &Expr) -> Result<Value, EmitError> {
        let opcode = match op {
            UnOp::Plus => Opcode::UnPlus,
            UnOp::Minus => Opcode::UnMinus,
            UnOp::BitNot => Opcode::BitNot,
            UnOp::BoolNot => Opcode::BoolNot,
            UnOp::Typeof => return Err(EmitError::Unsupported { what: "typeof".to_string() }),
            UnOp::Void => return Err(EmitError::Unsupported { what: "void operator".to_string() }),
        };
        let v = self.emit_expr(operand)?;
        let (t, ty) = self.materialize(v)?;
        let res_ty = result_type(opcode, ty, ty)?;
        let casted = self.cast_to(t, ty, res_ty)?;
        let dst = self.fresh_temp(res_ty);
        self.emit(Instr::UnOp { dst, op: opcode, operand: casted });
        Ok(Value::RValue(dst, res_ty))
    }

    fn emit_update(&mut self, op: UpdateOp, prefix: bool, target: &Expr) -> Result<Value, EmitError> {
        let lv = self.emit_lvalue(target)?;
        let (old_t, ty) = self.materialize_lvref(&lv)?;
        if !ty.is_numeric() {
            return Err(EmitError::TypeMismatch { op: "++/--".to_string(), lhs: ty, rhs: ty });
        }
        let one = self.fresh_temp(ty);
        let one_value = if ty.is_floating() { ConstValue::F64(1.0) } else { ConstValue::I32(1) };
        self.emit(Instr::ConstInit { dst: one, value: one_value });
        let opcode = match op {
            UpdateOp::Inc => Opcode::Add,
            UpdateOp::Dec => Opcode::Sub,
        };
        let new_t = self.fresh_temp(ty);
        self.emit(Instr::BinOp { dst: new_t, op: opcode, lhs: old_t, rhs: one });
        self.assign_lvref(&lv, new_t, ty)?;
        Ok(Value::RValue(if prefix { new_t } else { old_t }, ty))
    }

    fn emit_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr) -> Result<Value, EmitError> {
        match op {
            AssignOp::Assign => {
                let lv = self.emit_lvalue(target)?;
                let target_ty = self.lvref_type(&lv)?;
                let v = self.emit_expr(value)?;
                let (t, ty) = self.materialize(v)?;
                let casted = self.cast_to(t, ty, target_ty)?;
                self.assign_lvref(&lv, casted, target_ty)?;
                Ok(Value::RValue(casted, target_ty))
            }
            AssignOp::NullishAssign => {
                Err(EmitError::Unsupported { what: "nullish-coalescing assignment".to_string() })
            }
            AssignOp::AndAssign | AssignOp::OrAssign => {
                let lv = self.emit_lvalue(target)?;
                let lhs_pair = self.materialize_lvref(&lv)?;
                let is_and = matches!(op, AssignOp::AndAssign);
                let (result, res_ty) = self.emit_short_circuit(is_and, lhs_pair, |e| {
                    let v = e.emit_expr(value)?;
                    e.materialize(v)
                })?;
                let target_ty = self.lvref_type(&lv)?;
                let casted = self.cast_to(result, res_ty, target_ty)?;
                self.assign_lvref(&lv, casted, target_ty)?;
                Ok(Value::RValue(casted, target_ty))
            }
            _ => {
                // Decompose `lhs op= rhs` into `Set(lhs, op(materialise(lhs), rhs))` (§4.4).
                let lv = self.emit_lvalue(target)?;
                let (old_t, old_ty) = self.materialize_lvref(&lv)?;
                let v = self.emit_expr(value)?;
                let (rhs_t, rhs_ty) = self.materialize(v)?;
                let opcode = compound_to_opcode(op);
                let res_ty = result_type(opcode, old_ty, rhs_ty)?;
                let old_c = self.cast_to(old_t, old_ty, res_ty)?;
                let rhs_c = self.cast_to(rhs_t, rhs_ty, res_ty)?;
                let new_t = self.fresh_temp(res_ty);
                self.emit(Instr::BinOp { dst: new_t, op: opcode, lhs: old_c, rhs: rhs_c });
                let target_ty = self.lvref_type(&lv)?;
                let casted = self.cast_to(new_t, res_ty, target_ty)?;
                self.assign_lvref(&lv, casted, target_ty)?;
                Ok(Value::RValue(casted, target_ty))
            }
        }
    }

    fn emit_lvalue(&mut self, expr: &Expr) -> Result<LVRef, EmitError> {
        match expr {
            Expr::Ident(name) => {
                let local = self.lookup(name).ok_or_else(|| EmitError::UnknownBinding { name: name.clone() })?;
                if local.is_const {
                    return Err(EmitError::Unsupported { what: format!("assignment to const binding {name:?}") });
                }
                Ok(LVRef::Direct { name: name.clone() })
            }
            Expr::Member { object, property } => self.emit_member_lvref(object, property),
            _ => Err(EmitError::Unsupported { what: "assignment target".to_string() }),
        }
    }

    fn materialize_lvref(&mut self, lv: &LVRef) -> Result<(TempId, StaticType), EmitError> {
        match lv {
            LVRef::Direct { name } => {
                let local = self.lookup(name).ok_or_else(|| EmitError::UnknownBinding { name: name.clone() })?;
                let dst = self.fresh_temp(local.ty);
                self.emit(Instr::Dup { dst, src: local.temp });
                Ok((dst, local.ty))
            }
            LVRef::Member { parent, key } => {
                let dst = self.fresh_temp(StaticType::Any);
                self.emit(Instr::GetMember { dst, parent: *parent, key: *key });
                Ok((dst, StaticType::Any))
            }
        }
    }

    fn lvref_type(&self, lv: &LVRef) -> Result<StaticType, EmitError> {
        match lv {
            LVRef::Direct { name } => {
                Ok(self.lookup(name).ok_or_else(|| EmitError::UnknownBinding { name: name.clone() })?.ty)
            }
            LVRef::Member { .. } => Ok(StaticType::Any),
        }
    }

    fn assign_lvref(&mut self, lv: &LVRef, value: TempId, _value_ty: StaticType) -> Result<(), EmitError> {
        match lv {
            LVRef::Direct { name } => {
                let local = self.lookup(name).ok_or_else(|| EmitError::UnknownBinding { name: name.clone() })?;
                self.emit(Instr::Set { dst: local.temp, src: value });
                Ok(())
            }
            LVRef::Member { parent, key } => {
                self.emit(Instr::SetMember { parent: *parent, key: *key, value });
                Ok(())
            }
        }
    }

    fn emit_conditional(&mut self, cond: &Expr, then_e: &Expr, else_e: &Expr) -> Result<Value, EmitError> {
        let cv = self.emit_expr(cond)?;
        let (cond_t, _cond_ty) = self.materialize(cv)?;
        let then_blk = self.new_block();
        let else_blk = self.new_block();
        let merge_blk = self.new_block();
        self.set_terminator(Terminator::Branch { cond: cond_t, then_blk, else_blk });

        self.current = then_blk;
        let tv = self.emit_expr(then_e)?;
        let (then_t, then_ty) = self.materialize(tv)?;
        let then_final = self.current;

        self.current = else_blk;
        let ev = self.emit_expr(else_e)?;
        let (else_t, else_ty) = self.materialize(ev)?;
        let else_final = self.current;

        let res_ty = if then_ty == else_ty { then_ty } else { common_upcast(then_ty, else_ty) };
        let result = self.fresh_temp(res_ty);

        self.current = then_final;
        let then_c = self.cast_to(then_t, then_ty, res_ty)?;
        if !self.is_current_terminated() {
            self.emit(Instr::Set { dst: result, src: then_c });
            self.set_terminator(Terminator::Jump(merge_blk));
        }

        self.current = else_final;
        let else_c = self.cast_to(else_t, else_ty, res_ty)?;
        if !self.is_current_terminated() {
            self.emit(Instr::Set { dst: result, src: else_c });
            self.set_terminator(Terminator::Jump(merge_blk));
        }

        self.current = merge_blk;
        Ok(Value::RValue(result, res_ty))
    }

    fn emit_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, EmitError> {
        if let Expr::Ident(name) = callee {
            if let Some(sig) = self.other_signatures.get(name).cloned() {
                if args.len() != sig.params.len() {
                    return Err(EmitError::Unsupported {
                        what: format!("call to {name} with {} arguments, expected {}", args.len(), sig.params.len()),
                    });
                }
                let mut arg_temps = Vec::with_capacity(args.len());
                for (a, pty) in args.iter().zip(sig.params.iter().copied()) {
                    let v = self.emit_expr(a)?;
                    let (t, ty) = self.materialize(v)?;
                    arg_temps.push(self.cast_to(t, ty, pty)?);
                }
                let dst = self.fresh_temp(sig.return_type);
                self.emit(Instr::Call { dst: Some(dst), target: CallTarget::Native(name.clone()), args: arg_temps });
                return Ok(Value::RValue(dst, sig.return_type));
            }
        }

        let (callee_t, this_t) = match callee {
            Expr::Member { object, property } => {
                let ov = self.emit_expr(object)?;
                let (obj_t, obj_ty) = self.materialize(ov)?;
                let key_t = self.const_key(property)?;
                let callee_dst = self.fresh_temp(StaticType::Any);
                self.emit(Instr::GetMember { dst: callee_dst, parent: obj_t, key: key_t });
                let this_any = self.cast_to(obj_t, obj_ty, StaticType::Any)?;
                (callee_dst, Some(this_any))
            }
            _ => {
                let v = self.emit_expr(callee)?;
                let (t, ty) = self.materialize(v)?;
                (self.cast_to(t, ty, StaticType::Any)?, None)
            }
        };

        let mut arg_temps = Vec::with_capacity(args.len());
        for a in args {
            let v = self.emit_expr(a)?;
            let (t, ty) = self.materialize(v)?;
            let any_t = self.cast_to(t, ty, StaticType::Any)?;
            self.emit(Instr::PushFree { src: any_t });
            arg_temps.push(any_t);
        }

        let dst = self.fresh_temp(StaticType::Any);
        self.emit(Instr::Call {
            dst: Some(dst),
            target: CallTarget::Indirect { callee: callee_t, this_val: this_t },
            args: arg_temps,
        });
        Ok(Value::RValue(dst, StaticType::Any))
    }

    // ---- statements -------------------------------------------------------

    /// Returns `true` if every path through `stmt` already set a terminator
    /// (`return`/`throw`/`break`/`continue`), meaning any statement that
    /// syntactically follows it is dead code.
    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<bool, EmitError> {
        match stmt {
            Stmt::Empty => Ok(false),
            Stmt::Expr(e) => {
                self.emit_expr_for_effect(e)?;
                Ok(false)
            }
            Stmt::VarDecl { kind, declarators } => {
                if matches!(kind, DeclKind::Var) {
                    return Err(EmitError::Unsupported { what: "var declaration".to_string() });
                }
                let is_const = matches!(kind, DeclKind::Const);
                for d in declarators {
                    self.emit_declarator(d, is_const)?;
                }
                Ok(false)
            }
            Stmt::Block(b) => self.emit_block(b),
            Stmt::If { cond, then_branch, else_branch } => {
                self.emit_if(cond, then_branch, else_branch.as_deref())
            }
            Stmt::While { cond, body } => self.emit_while(cond, body),
            Stmt::DoWhile { body, cond } => self.emit_do_while(body, cond),
            Stmt::For { init, cond, update, body } => {
                self.emit_for(init.as_deref(), cond.as_ref(), update.as_ref(), body)
            }
            Stmt::Return(value) => self.emit_return(value.as_ref()),
            Stmt::Throw(e) => {
                let v = self.emit_expr(e)?;
                let (t, ty) = self.materialize(v)?;
                let casted = self.cast_to(t, ty, StaticType::Any)?;
                self.set_terminator(Terminator::Throw(casted));
                Ok(true)
            }
            Stmt::Break => {
                let target = *self.break_targets.last().ok_or(EmitError::BreakOutsideLoop)?;
                self.set_terminator(Terminator::Jump(target));
                Ok(true)
            }
            Stmt::Continue => {
                let target = *self.continue_targets.last().ok_or(EmitError::ContinueOutsideLoop)?;
                self.set_terminator(Terminator::Jump(target));
                Ok(true)
            }
        }
    }

    fn emit_declarator(
        &mut self,
        d: &crate::ast::VarDeclarator,
        is_const: bool,
    ) -> Result<(), EmitError> {
        let (ty, src) = match (d.type_ann, &d.init) {
            (Some(ty), Some(init)) => {
                let v = self.emit_expr(init)?;
                let (t, vty) = self.materialize(v)?;
                (ty, self.cast_to(t, vty, ty)?)
            }
            (None, Some(init)) => {
                let v = self.emit_expr(init)?;
                let (t, vty) = self.materialize(v)?;
                (vty, t)
            }
            (Some(ty @ (StaticType::I32 | StaticType::F64 | StaticType::Bool)), None) => {
                let tmp = self.fresh_temp(ty);
                let value = match ty {
                    StaticType::F64 => ConstValue::F64(0.0),
                    StaticType::Bool => ConstValue::Bool(false),
                    _ => ConstValue::I32(0),
                };
                self.emit(Instr::ConstInit { dst: tmp, value });
                (ty, tmp)
            }
            _ => {
                return Err(EmitError::Unsupported {
                    what: format!("declaration of {:?} without an initialiser", d.name),
                })
            }
        };
        let temp = self.fresh_temp(ty);
        self.emit(Instr::Set { dst: temp, src });
        self.declare_local(d.name.clone(), temp, ty, is_const);
        Ok(())
    }

    fn emit_block(&mut self, block: &Block) -> Result<bool, EmitError> {
        self.push_scope();
        let mut terminated = false;
        for stmt in &block.statements {
            if terminated {
                break;
            }
            terminated = self.emit_stmt(stmt)?;
        }
        let locals = self.pop_scope();
        if !terminated {
            for local in locals {
                if local.ty == StaticType::Any {
                    self.emit(Instr::PushFree { src: local.temp });
                }
            }
        }
        Ok(terminated)
    }

    fn emit_if(
        &mut self,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<bool, EmitError> {
        let cv = self.emit_expr(cond)?;
        let (cond_t, _) = self.materialize(cv)?;
        let then_blk = self.new_block();
        let else_blk = self.new_block();
        let merge_blk = self.new_block();
        self.set_terminator(Terminator::Branch { cond: cond_t, then_blk, else_blk });

        self.current = then_blk;
        let then_term = self.emit_stmt(then_branch)?;
        if !then_term {
            self.set_terminator(Terminator::Jump(merge_blk));
        }

        self.current = else_blk;
        let else_term = match else_branch {
            Some(e) => self.emit_stmt(e)?,
            None => {
                self.set_terminator(Terminator::Jump(merge_blk));
                false
            }
        };
        if else_branch.is_some() && !else_term {
            self.set_terminator(Terminator::Jump(merge_blk));
        }

        self.current = merge_blk;
        Ok(then_term && else_term)
    }

    fn emit_while(&mut self, cond: &Expr, body: &Stmt) -> Result<bool, EmitError> {
        let cond_blk = self.new_block();
        let body_blk = self.new_block();
        let post_blk = self.new_block();
        self.set_terminator(Terminator::Jump(cond_blk));

        self.current = cond_blk;
        let cv = self.emit_expr(cond)?;
        let (cond_t, _) = self.materialize(cv)?;
        self.set_terminator(Terminator::Branch { cond: cond_t, then_blk: body_blk, else_blk: post_blk });

        self.break_targets.push(post_blk);
        self.continue_targets.push(cond_blk);
        self.current = body_blk;
        let body_term = self.emit_stmt(body)?;
        if !body_term {
            self.set_terminator(Terminator::Jump(cond_blk));
        }
        self.break_targets.pop();
        self.continue_targets.pop();

        self.current = post_blk;
        Ok(false)
    }

    fn emit_do_while(&mut self, body: &Stmt, cond: &Expr) -> Result<bool, EmitError> {
        let body_blk = self.new_block();
        let cond_blk = self.new_block();
        let post_blk = self.new_block();
        self.set_terminator(Terminator::Jump(body_blk));

        self.break_targets.push(post_blk);
        self.continue_targets.push(cond_blk);
        self.current = body_blk;
        let body_term = self.emit_stmt(body)?;
        if !body_term {
            self.set_terminator(Terminator::Jump(cond_blk));
        }
        self.break_targets.pop();
        self.continue_targets.pop();

        self.current = cond_blk;
        let cv = self.emit_expr(cond)?;
        let (cond_t, _) = self.materialize(cv)?;
        self.set_terminator(Terminator::Branch { cond: cond_t, then_blk: body_blk, else_blk: post_blk });

        self.current = post_blk;
        Ok(false)
    }

    fn emit_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
    ) -> Result<bool, EmitError> {
        self.push_scope();
        if let Some(init) = init {
            self.emit_stmt(init)?;
        }

        let cond_blk = self.new_block();
        let body_blk = self.new_block();
        let update_blk = self.new_block();
        let post_blk = self.new_block();
        self.set_terminator(Terminator::Jump(cond_blk));

        self.current = cond_blk;
        match cond {
            Some(c) => {
                let cv = self.emit_expr(c)?;
                let (cond_t, _) = self.materialize(cv)?;
                self.set_terminator(Terminator::Branch { cond: cond_t, then_blk: body_blk, else_blk: post_blk });
            }
            None => self.set_terminator(Terminator::Jump(body_blk)),
        }

        self.break_targets.push(post_blk);
        self.continue_targets.push(update_blk);
        self.current = body_blk;
        let body_term = self.emit_stmt(body)?;
        if !body_term {
            self.set_terminator(Terminator::Jump(update_blk));
        }
        self.break_targets.pop();
        self.continue_targets.pop();

        self.current = update_blk;
        if let Some(u) = update {
            let v = self.emit_expr(u)?;
            if let Value::RValue(t, ty) = v {
                if ty == StaticType::Any {
                    self.emit(Instr::PushFree { src: t });
                }
            }
        }
        self.set_terminator(Terminator::Jump(cond_blk));

        self.current = post_blk;
        let locals = self.pop_scope();
        for local in locals {
            if local.ty == StaticType::Any {
                self.emit(Instr::PushFree { src: local.temp });
            }
        }
        Ok(false)
    }

    fn emit_return(&mut self, value: Option<&Expr>) -> Result<bool, EmitError> {
        match value {
            None => {
                if self.return_type != StaticType::Void {
                    return Err(EmitError::TypeMismatch {
                        op: "return".to_string(),
                        lhs: StaticType::Void,
                        rhs: self.return_type,
                    });
                }
                self.set_terminator(Terminator::Return);
            }
            Some(e) => {
                let v = self.emit_expr(e)?;
                let (t, ty) = self.materialize(v)?;
                let casted = self.cast_to(t, ty, self.return_type)?;
                self.set_terminator(Terminator::ReturnValue(casted));
            }
        }
        Ok(true)
    }
}

fn binop_to_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Rem => Opcode::Rem,
        BinOp::Pow => Opcode::Pow,
        BinOp::LShift => Opcode::LShift,
        BinOp::RShift => Opcode::RShift,
        BinOp::URShift => Opcode::URShift,
        BinOp::BitAnd => Opcode::BitAnd,
        BinOp::BitOr => Opcode::BitOr,
        BinOp::BitXor => Opcode::BitXor,
        // Loose and strict (in)equality collapse onto the same opcode: every
        // operand here already carries a static type, so the coercion rules
        // that distinguish `==` from `===` in ordinary JS never trigger.
        BinOp::Eq | BinOp::StrictEq => Opcode::Eq,
        BinOp::Neq | BinOp::StrictNeq => Opcode::Neq,
        BinOp::Lt => Opcode::Lt,
        BinOp::Lte => Opcode::Lte,
        BinOp::Gt => Opcode::Gt,
        BinOp::Gte => Opcode::Gte,
        BinOp::And | BinOp::Or | BinOp::Nullish => {
            unreachable!("short-circuit operators are handled before opcode mapping")
        }
    }
}

fn compound_to_opcode(op: AssignOp) -> Opcode {
    match op {
        AssignOp::AddAssign => Opcode::Add,
        AssignOp::SubAssign => Opcode::Sub,
        AssignOp::MulAssign => Opcode::Mul,
        AssignOp::DivAssign => Opcode::Div,
        AssignOp::RemAssign => Opcode::Rem,
        AssignOp::Assign | AssignOp::AndAssign | AssignOp::OrAssign | AssignOp::NullishAssign => {
            unreachable!("handled before opcode mapping")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn compile(src: &str) -> CfgFunction {
        let program = Parser::new(src).unwrap().parse_program();
        let decl = &program.functions[0];
        emit_function(decl, &HashMap::new()).unwrap()
    }

    #[test]
    fn identity_function_returns_its_argument() {
        let f = compile("function id(a: int32): int32 { return a; }");
        assert_eq!(f.params.len(), 1);
        let entry = f.block(f.entry);
        assert!(matches!(entry.terminator, Terminator::ReturnValue(_)));
    }

    #[test]
    fn if_without_else_merges_back() {
        let f = compile(
            "function f(a: int32): int32 { if (a > 0) { return 1; } return 0; }",
        );
        assert!(f.blocks.len() >= 4);
    }

    #[test]
    fn short_circuit_and_builds_a_diamond() {
        let f = compile("function f(a: boolean, b: boolean): boolean { return a && b; }");
        let has_branch = f.blocks.iter().any(|b| matches!(b.terminator, Terminator::Branch { .. }));
        assert!(has_branch);
    }

    #[test]
    fn compound_assignment_decomposes_into_binop_and_set() {
        let f = compile("function f(a: int32): int32 { a += 2; return a; }");
        let has_add = f.blocks.iter().any(|b| {
            b.instrs.iter().any(|i| matches!(i, Instr::BinOp { op: Opcode::Add, .. }))
        });
        assert!(has_add);
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let program = Parser::new("function f(): void { break; }").unwrap().parse_program();
        let err = emit_function(&program.functions[0], &HashMap::new());
        assert!(matches!(err, Err(EmitError::BreakOutsideLoop)));
    }

    #[test]
    fn member_access_produces_any() {
        let f = compile("function f(a: object): any { return a.b; }");
        let has_get_member = f.blocks.iter().any(|b| b.instrs.iter().any(|i| matches!(i, Instr::GetMember { .. })));
        assert!(has_get_member);
    }

    #[test]
    fn comma_operator_emits_every_operand_for_effect() {
        let f = compile(
            "function f(i: int32, j: int32): int32 { i++, j++; return i + j; }",
        );
        let add_count = f
            .blocks
            .iter()
            .flat_map(|b| &b.instrs)
            .filter(|i| matches!(i, Instr::BinOp { op: Opcode::Add, .. }))
            .count();
        // Two `++` updates (one BinOp::Add each) plus the final `i + j`.
        assert_eq!(add_count, 3);
    }

    #[test]
    fn for_update_comma_expression_runs_both_updates() {
        let f = compile(
            "function f(n: int32): int32 { let i: int32 = 0; let j: int32 = 0; \
             for (; i < n; i++, j++) {} return j; }",
        );
        let add_count = f
            .blocks
            .iter()
            .flat_map(|b| &b.instrs)
            .filter(|i| matches!(i, Instr::BinOp { op: Opcode::Add, .. }))
            .count();
        assert_eq!(add_count, 2);
    }

    #[test]
    fn native_call_to_known_signature_is_direct() {
        let program = Parser::new(
            "function callee(x: int32): int32 { return x; } \
             function caller(x: int32): int32 { return callee(x); }",
        )
        .unwrap()
        .parse_program();
        let mut sigs = HashMap::new();
        sigs.insert("callee".to_string(), Signature::of(&program.functions[0]).unwrap());
        let f = emit_function(&program.functions[1], &sigs).unwrap();
        let has_native_call = f.blocks.iter().any(|b| {
            b.instrs.iter().any(|i| matches!(i, Instr::Call { target: CallTarget::Native(_), .. }))
        });
        assert!(has_native_call);
    }
}
