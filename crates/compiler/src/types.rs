//! The value-type lattice and opcode taxonomy (§3 "Value types",
//! "Type lattice", "Opcodes").
//!
//! A near-direct transliteration of the original engine's
//! `jac::cfg::ValueType`/`Opcode`/`resultType`/`commonUpcast` (C++,
//! `opcode.h`) into Rust: the same upcast rules, the same per-opcode
//! result-type family, the same "Void is absorbing / poisons the
//! expression" throwing behaviour, now returned as a `Result` instead of
//! a thrown `std::runtime_error` (an unsupported-construct `EmitError`,
//! per §7 item 3, rather than a panic — malformed operand types reach
//! here only when the emitter itself has a bug, but CFG construction
//! treats it as just another reason to fall back rather than crash the
//! host).

use crate::error::EmitError;

/// `ValueType` from §3: `{Void, I32, F64, Bool, Object, String,
/// StringConst, Buffer, Any}`. `StringConst` and `Buffer` are carried
/// for completeness with the spec's enum even though this subset's
/// surface grammar only ever produces `StringConst` temps (for member
/// names) and never `Buffer` ones (nothing in the supported grammar
/// yields a buffer value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticType {
    Void,
    I32,
    F64,
    Bool,
    Object,
    String,
    StringConst,
    Buffer,
    Any,
}

impl StaticType {
    pub fn is_integral(self) -> bool {
        matches!(self, StaticType::I32 | StaticType::Bool)
    }

    pub fn is_floating(self) -> bool {
        matches!(self, StaticType::F64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral() || self.is_floating()
    }

    fn is_void(self) -> bool {
        matches!(self, StaticType::Void)
    }

    fn is_any(self) -> bool {
        matches!(self, StaticType::Any)
    }

    fn is_object(self) -> bool {
        matches!(self, StaticType::Object)
    }

    /// Parses one of the six recognised type-annotation names from §6.
    /// Anything else is an unrecognised annotation, per §4.2: "Others
    /// cause compilation to fall back."
    pub fn from_annotation(name: &str) -> Option<StaticType> {
        match name {
            "int32" => Some(StaticType::I32),
            "float64" => Some(StaticType::F64),
            "boolean" => Some(StaticType::Bool),
            "object" => Some(StaticType::Object),
            "void" => Some(StaticType::Void),
            "any" => Some(StaticType::Any),
            _ => None,
        }
    }
}

impl std::fmt::Display for StaticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StaticType::Void => "void",
            StaticType::I32 => "int32",
            StaticType::F64 => "float64",
            StaticType::Bool => "boolean",
            StaticType::Object => "object",
            StaticType::String => "string",
            StaticType::StringConst => "string-const",
            StaticType::Buffer => "buffer",
            StaticType::Any => "any",
        };
        f.write_str(s)
    }
}

/// `commonUpcast(a, b)` from §3: `Void` is absorbing; `Any`/`Object`
/// dominate to `Any`; floating dominates to `F64`; otherwise `I32`.
pub fn common_upcast(a: StaticType, b: StaticType) -> StaticType {
    if a.is_void() || b.is_void() {
        return StaticType::Void;
    }
    if a.is_any() || b.is_any() || a.is_object() || b.is_object() {
        return StaticType::Any;
    }
    if a.is_floating() || b.is_floating() {
        return StaticType::F64;
    }
    StaticType::I32
}

/// The opcode taxonomy from §3. `GetMember`/`SetMember` are listed
/// alongside the arithmetic/relational family in the spec's enum but,
/// as in the original, are not dispatched through [`result_type`] — the
/// CFG emitter resolves a member access's result type itself (§4.4)
/// since it depends on statically known parent/key shapes that
/// `result_type`'s two-operand signature cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    LShift,
    RShift,
    URShift,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    GetMember,
    SetMember,
    Set,
    BoolNot,
    BitNot,
    UnPlus,
    UnMinus,
    Dup,
    PushFree,
}

impl Opcode {
    pub fn is_binary(self) -> bool {
        !matches!(
            self,
            Opcode::Set
                | Opcode::BoolNot
                | Opcode::BitNot
                | Opcode::UnPlus
                | Opcode::UnMinus
                | Opcode::Dup
                | Opcode::PushFree
        )
    }

    pub fn has_result(self) -> bool {
        !matches!(self, Opcode::Dup | Opcode::PushFree)
    }
}

fn any_void(a: StaticType, b: StaticType) -> bool {
    a == StaticType::Void || b == StaticType::Void
}

/// "additive/sub/mul follow upcast" (§3): unlike `shift_res`/`bitwise_res`,
/// this one defers to `common_upcast` rather than hard-coding the
/// floating/integral split itself, so an `Any` or `Object` operand
/// correctly widens the result to `Any` instead of silently truncating it
/// to `I32`.
fn additive_res(a: StaticType, b: StaticType) -> Result<StaticType, EmitError> {
    reject_void(a, b)?;
    Ok(common_upcast(a, b))
}

fn div_res(a: StaticType, b: StaticType) -> Result<StaticType, EmitError> {
    reject_void(a, b)?;
    Ok(StaticType::F64)
}

fn pow_res(a: StaticType, b: StaticType) -> Result<StaticType, EmitError> {
    reject_void(a, b)?;
    Ok(StaticType::F64)
}

fn shift_res(a: StaticType, b: StaticType) -> Result<StaticType, EmitError> {
    reject_void(a, b)?;
    Ok(StaticType::I32)
}

fn boolean_res(a: StaticType, b: StaticType) -> Result<StaticType, EmitError> {
    reject_void(a, b)?;
    Ok(StaticType::Bool)
}

fn bitwise_res(a: StaticType, b: StaticType) -> Result<StaticType, EmitError> {
    reject_void(a, b)?;
    Ok(StaticType::I32)
}

fn relational_res(a: StaticType, b: StaticType) -> Result<StaticType, EmitError> {
    reject_void(a, b)?;
    Ok(StaticType::Bool)
}

fn set_res(a: StaticType, _b: StaticType) -> Result<StaticType, EmitError> {
    if a.is_void() {
        return Err(EmitError::TypeMismatch {
            op: "Set".to_string(),
            lhs: a,
            rhs: StaticType::Void,
        });
    }
    Ok(a)
}

fn reject_void(a: StaticType, b: StaticType) -> Result<(), EmitError> {
    if any_void(a, b) {
        return Err(EmitError::TypeMismatch { op: "arithmetic".to_string(), lhs: a, rhs: b });
    }
    Ok(())
}

/// `resultType(op, a, b)` from §3, fixed per opcode family.
pub fn result_type(op: Opcode, a: StaticType, b: StaticType) -> Result<StaticType, EmitError> {
    match op {
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Rem => additive_res(a, b),
        Opcode::Div => div_res(a, b),
        Opcode::Pow => pow_res(a, b),
        Opcode::LShift | Opcode::RShift | Opcode::URShift => shift_res(a, b),
        Opcode::BitAnd | Opcode::BitOr | Opcode::BitXor => bitwise_res(a, b),
        Opcode::Eq | Opcode::Neq | Opcode::Gt | Opcode::Gte | Opcode::Lt | Opcode::Lte => {
            relational_res(a, b)
        }
        Opcode::Set => set_res(a, b),
        Opcode::BoolNot => boolean_res(a, b),
        Opcode::BitNot => bitwise_res(a, b),
        Opcode::UnPlus | Opcode::UnMinus => additive_res(a, b),
        Opcode::GetMember | Opcode::SetMember => {
            Err(EmitError::TypeMismatch { op: format!("{op:?}"), lhs: a, rhs: b })
        }
        Opcode::Dup | Opcode::PushFree => Ok(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_upcast_rules() {
        assert_eq!(common_upcast(StaticType::I32, StaticType::I32), StaticType::I32);
        assert_eq!(common_upcast(StaticType::I32, StaticType::F64), StaticType::F64);
        assert_eq!(common_upcast(StaticType::Object, StaticType::I32), StaticType::Any);
        assert_eq!(common_upcast(StaticType::Any, StaticType::F64), StaticType::Any);
        assert_eq!(common_upcast(StaticType::Void, StaticType::I32), StaticType::Void);
    }

    #[test]
    fn div_and_pow_always_produce_f64() {
        assert_eq!(result_type(Opcode::Div, StaticType::I32, StaticType::I32).unwrap(), StaticType::F64);
        assert_eq!(result_type(Opcode::Pow, StaticType::F64, StaticType::F64).unwrap(), StaticType::F64);
    }

    #[test]
    fn shift_and_bitwise_always_produce_i32() {
        assert_eq!(result_type(Opcode::LShift, StaticType::I32, StaticType::I32).unwrap(), StaticType::I32);
        assert_eq!(result_type(Opcode::BitAnd, StaticType::Bool, StaticType::I32).unwrap(), StaticType::I32);
    }

    #[test]
    fn relational_and_boolean_always_produce_bool() {
        assert_eq!(result_type(Opcode::Lt, StaticType::I32, StaticType::F64).unwrap(), StaticType::Bool);
        assert!(result_type(Opcode::BoolNot, StaticType::Bool, StaticType::Void).is_err());
    }

    #[test]
    fn set_preserves_left_operand_type() {
        assert_eq!(result_type(Opcode::Set, StaticType::F64, StaticType::I32).unwrap(), StaticType::F64);
    }

    #[test]
    fn void_operands_are_rejected() {
        assert!(result_type(Opcode::Add, StaticType::Void, StaticType::I32).is_err());
    }
}
