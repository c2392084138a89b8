//! The fixed runtime-helper ABI (§6) as [`ExternSig`] constants, plus the
//! `StaticType -> LLVM type` mapping every other part of [`super::func`]
//! builds on.
//!
//! One constant per `jac-runtime` extern function, hand-checked against
//! that crate's actual signatures rather than re-derived from the spec's
//! prose table — a mismatch here links cleanly and miscompiles, which is
//! exactly the failure mode the teacher's own `runtime.rs::RUNTIME_DECLARATIONS`
//! table exists to prevent.

use crate::lower::backend::ExternSig;
use crate::types::StaticType;

/// The LLVM type a value of `ty` occupies in a register or argument slot.
/// `Object` and `StringConst` are both opaque pointers here — the former
/// to a `HostObject`, the latter to a constant C string — since LLVM's
/// type system doesn't distinguish them and nothing in this backend ever
/// needs to.
pub fn llvm_type(ty: StaticType) -> &'static str {
    match ty {
        StaticType::Void => "void",
        StaticType::I32 => "i32",
        StaticType::F64 => "double",
        StaticType::Bool => "i1",
        StaticType::Object | StaticType::String | StaticType::StringConst | StaticType::Buffer => "ptr",
        StaticType::Any => "%HostValue",
    }
}

pub const ENTER_STACK_FRAME: ExternSig = ExternSig { name: "__enterStackFrame", ret: "void", params: "ptr" };
pub const EXIT_STACK_FRAME: ExternSig = ExternSig { name: "__exitStackFrame", ret: "void", params: "ptr" };

/// Not named verbatim in §6's table: generated code has no stable view
/// of `RuntimeContext`'s layout to test the exception flag directly, so
/// this accessor is the one the lowerer's post-call checks are built on.
pub const HAS_EXCEPTION: ExternSig = ExternSig { name: "__hasException", ret: "i1", params: "ptr" };

/// Likewise absent from §6's closed table but required by the wrapper
/// contract (§4.7): a top-level entry point must not see a stale
/// exception left over from a previous call through the same context.
pub const CLEAR_EXCEPTION: ExternSig = ExternSig { name: "__clearException", ret: "void", params: "ptr" };

pub const DUP_VAL: ExternSig = ExternSig { name: "__dupVal", ret: "%HostValue", params: "ptr, %HostValue" };
pub const PUSH_FREE_VAL: ExternSig = ExternSig { name: "__pushFreeVal", ret: "void", params: "ptr, %HostValue" };

pub const ADD: ExternSig = ExternSig { name: "__add", ret: "%HostValue", params: "ptr, %HostValue, %HostValue" };
pub const SUB: ExternSig = ExternSig { name: "__sub", ret: "%HostValue", params: "ptr, %HostValue, %HostValue" };
pub const MUL: ExternSig = ExternSig { name: "__mul", ret: "%HostValue", params: "ptr, %HostValue, %HostValue" };
pub const REM: ExternSig = ExternSig { name: "__rem", ret: "%HostValue", params: "ptr, %HostValue, %HostValue" };
pub const DIV: ExternSig = ExternSig { name: "__div", ret: "%HostValue", params: "ptr, %HostValue, %HostValue" };
pub const POW_F64: ExternSig = ExternSig { name: "__powF64", ret: "double", params: "ptr, double, double" };
pub const REM_F64: ExternSig = ExternSig { name: "__remF64", ret: "double", params: "ptr, double, double" };

pub const CONVERT_I32: ExternSig = ExternSig { name: "__convertI32", ret: "i32", params: "ptr, %HostValue" };
pub const CONVERT_F64: ExternSig = ExternSig { name: "__convertF64", ret: "double", params: "ptr, %HostValue" };
pub const BOOL_CONV: ExternSig = ExternSig { name: "__boolConv", ret: "i1", params: "ptr, %HostValue" };

pub const GET_MEMBER_OBJ_CSTR: ExternSig = ExternSig { name: "__getMemberObjCStr", ret: "%HostValue", params: "ptr, ptr, ptr" };
pub const GET_MEMBER_OBJ_I32: ExternSig = ExternSig { name: "__getMemberObjI32", ret: "%HostValue", params: "ptr, ptr, i32" };
pub const GET_MEMBER_OBJ_ANY: ExternSig = ExternSig { name: "__getMemberObjAny", ret: "%HostValue", params: "ptr, ptr, %HostValue" };
pub const GET_MEMBER_ANY_CSTR: ExternSig = ExternSig { name: "__getMemberAnyCStr", ret: "%HostValue", params: "ptr, %HostValue, ptr" };
pub const GET_MEMBER_ANY_I32: ExternSig = ExternSig { name: "__getMemberAnyI32", ret: "%HostValue", params: "ptr, %HostValue, i32" };
pub const GET_MEMBER_ANY_ANY: ExternSig = ExternSig { name: "__getMemberAnyAny", ret: "%HostValue", params: "ptr, %HostValue, %HostValue" };

pub const SET_MEMBER_OBJ_CSTR: ExternSig = ExternSig { name: "__setMemberObjCStr", ret: "void", params: "ptr, ptr, ptr, %HostValue" };
pub const SET_MEMBER_OBJ_I32: ExternSig = ExternSig { name: "__setMemberObjI32", ret: "void", params: "ptr, ptr, i32, %HostValue" };
pub const SET_MEMBER_OBJ_ANY: ExternSig = ExternSig { name: "__setMemberObjAny", ret: "void", params: "ptr, ptr, %HostValue, %HostValue" };
pub const SET_MEMBER_ANY_CSTR: ExternSig = ExternSig { name: "__setMemberAnyCStr", ret: "void", params: "ptr, %HostValue, ptr, %HostValue" };
pub const SET_MEMBER_ANY_I32: ExternSig = ExternSig { name: "__setMemberAnyI32", ret: "void", params: "ptr, %HostValue, i32, %HostValue" };
pub const SET_MEMBER_ANY_ANY: ExternSig = ExternSig { name: "__setMemberAnyAny", ret: "void", params: "ptr, %HostValue, %HostValue, %HostValue" };

pub const CALL_ANY_ANY: ExternSig = ExternSig { name: "__callAnyAny", ret: "void", params: "ptr, %HostValue, %HostValue, ptr, i32" };
pub const CALL_ANY_OBJ: ExternSig = ExternSig { name: "__callAnyObj", ret: "void", params: "ptr, %HostValue, ptr, ptr, i32" };
pub const CALL_ANY_UNDEFINED: ExternSig = ExternSig { name: "__callAnyUndefined", ret: "void", params: "ptr, %HostValue, ptr, i32" };
pub const CALL_OBJ_ANY: ExternSig = ExternSig { name: "__callObjAny", ret: "void", params: "ptr, ptr, %HostValue, ptr, i32" };
pub const CALL_OBJ_OBJ: ExternSig = ExternSig { name: "__callObjObj", ret: "void", params: "ptr, ptr, ptr, ptr, i32" };
pub const CALL_OBJ_UNDEFINED: ExternSig = ExternSig { name: "__callObjUndefined", ret: "void", params: "ptr, ptr, ptr, i32" };
pub const CALL_CTOR_ANY: ExternSig = ExternSig { name: "__callCtorAny", ret: "void", params: "ptr, %HostValue, ptr, i32" };
pub const CALL_CTOR_OBJ_ANY: ExternSig = ExternSig { name: "__callCtorObjAny", ret: "void", params: "ptr, ptr, ptr, i32" };

pub const LESS_ANY: ExternSig = ExternSig { name: "__lessAny", ret: "i1", params: "ptr, %HostValue, %HostValue" };
pub const LESS_EQ_ANY: ExternSig = ExternSig { name: "__lessEqAny", ret: "i1", params: "ptr, %HostValue, %HostValue" };
pub const GREATER_ANY: ExternSig = ExternSig { name: "__greaterAny", ret: "i1", params: "ptr, %HostValue, %HostValue" };
pub const GREATER_EQ_ANY: ExternSig = ExternSig { name: "__greaterEqAny", ret: "i1", params: "ptr, %HostValue, %HostValue" };
pub const EQ_ANY: ExternSig = ExternSig { name: "__eqAny", ret: "i1", params: "ptr, %HostValue, %HostValue" };
pub const NEQ_ANY: ExternSig = ExternSig { name: "__neqAny", ret: "i1", params: "ptr, %HostValue, %HostValue" };

pub const NEW_STRING: ExternSig = ExternSig { name: "__newString", ret: "%HostValue", params: "ptr, ptr" };
pub const THROW_ERROR: ExternSig = ExternSig { name: "__throwError", ret: "void", params: "ptr, ptr, i32" };
pub const THROW_VAL: ExternSig = ExternSig { name: "__throwVal", ret: "void", params: "ptr, %HostValue" };

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llvm_type_mapping_matches_hostvalue_layout() {
        assert_eq!(llvm_type(StaticType::Any), "%HostValue");
        assert_eq!(llvm_type(StaticType::I32), "i32");
        assert_eq!(llvm_type(StaticType::F64), "double");
        assert_eq!(llvm_type(StaticType::Bool), "i1");
        assert_eq!(llvm_type(StaticType::Void), "void");
        assert_eq!(llvm_type(StaticType::Object), "ptr");
    }
}
