//! Runtime helper ABI: the closed set of `extern "C"` functions that
//! AOT-compiled function bodies call into for anything that cannot be
//! lowered to a single native instruction — dynamic arithmetic, member
//! access, indirect calls, conversions, and exception raising.
//!
//! Every helper takes a `*mut jac_core::RuntimeContext` as its first
//! argument, per §6's "Runtime helper ABI" table. Names match the ABI
//! table exactly (`__add`, `__enterStackFrame`, ...) rather than this
//! workspace's usual naming conventions, because the native lowerer in
//! `jac-compiler` emits calls to these exact symbols by name; renaming
//! them here would silently break linking against generated IR.

pub mod arithmetic;
pub mod calls;
pub mod convert;
pub mod exceptions;
pub mod frames;
pub mod member;
pub mod refcount;
pub mod relational;
pub mod strings;

pub use arithmetic::{__add, __div, __mul, __powF64, __rem, __remF64, __sub};
pub use calls::{
    __callAnyAny, __callAnyObj, __callAnyUndefined, __callCtorAny, __callCtorObjAny, __callObjAny,
    __callObjObj, __callObjUndefined,
};
pub use convert::{__boolConv, __convertF64, __convertI32};
pub use exceptions::{__clearException, __hasException, __throwError, __throwVal};
pub use frames::{__enterStackFrame, __exitStackFrame};
pub use member::{
    __getMemberAnyAny, __getMemberAnyCStr, __getMemberAnyI32, __getMemberObjAny,
    __getMemberObjCStr, __getMemberObjI32, __setMemberAnyAny, __setMemberAnyCStr,
    __setMemberAnyI32, __setMemberObjAny, __setMemberObjCStr, __setMemberObjI32,
};
pub use refcount::{__dupObj, __dupVal, __pushFreeObj, __pushFreeVal};
pub use relational::{__eqAny, __greaterAny, __greaterEqAny, __lessAny, __lessEqAny, __neqAny};
pub use strings::__newString;
