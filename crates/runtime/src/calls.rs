//! `__callAnyAny`/`__callAnyObj`/`__callAnyUndefined`/`__callObjAny`/
//! `__callObjObj`/`__callObjUndefined` and the two constructor variants.
//!
//! §4.7 describes these as indirect-call helpers selected by the static
//! types of the callee and `this`: the caller builds an `argv` in a
//! scoped stack block, converts scalar arguments to `Any`, calls the
//! matching helper, and the helper writes its result into `argv[0]`.
//!
//! Direct calls to a compile-time-known native function (the common
//! case — recursive calls to other typed top-level functions, including
//! the workspace's own test fixtures) never reach this module at all:
//! §4.4 lowers those straight to a backend `Call` instruction against the
//! callee's own compiled entry point. This module only exists for calls
//! whose callee is not known at compile time.
//!
//! What a "callable" host value even *is* — a closure, a bound native
//! function, a class constructor — is entirely the surrounding engine's
//! concern; the specification lists "the class-binding machinery" among
//! the external collaborators it does not define. `HostObject` here has
//! no callable variant because inventing one would mean fabricating
//! exactly that machinery. These helpers therefore always raise
//! `TypeError("... is not a function")`, which is itself the correct,
//! observable behaviour for every value this stand-in can actually
//! produce: none of them are callable.

use jac_core::{ErrType, HostObject, HostValue, RuntimeContext};

fn not_callable(ctx: &mut RuntimeContext, argv: *mut HostValue) {
    ctx.raise_error(ErrType::TypeError, "value is not a function");
    // SAFETY: `argv` must have room for at least one element, per the
    // "scoped stack block" convention described in §4.7.
    unsafe { *argv = HostValue::exception_marker() };
}

/// # Safety
/// `ctx` must point to a live `RuntimeContext`; `argv` must point to
/// `argc` initialised `HostValue`s with room to overwrite `argv[0]`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __callAnyAny(
    ctx: *mut RuntimeContext,
    _callee: HostValue,
    _this_val: HostValue,
    argv: *mut HostValue,
    _argc: i32,
) {
    not_callable(unsafe { &mut *ctx }, argv);
}

/// # Safety
/// As [`__callAnyAny`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __callAnyObj(
    ctx: *mut RuntimeContext,
    _callee: HostValue,
    _this_val: *const HostObject,
    argv: *mut HostValue,
    _argc: i32,
) {
    not_callable(unsafe { &mut *ctx }, argv);
}

/// # Safety
/// As [`__callAnyAny`], with an implicit `undefined` receiver.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __callAnyUndefined(
    ctx: *mut RuntimeContext,
    _callee: HostValue,
    argv: *mut HostValue,
    _argc: i32,
) {
    not_callable(unsafe { &mut *ctx }, argv);
}

/// # Safety
/// As [`__callAnyAny`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __callObjAny(
    ctx: *mut RuntimeContext,
    _callee: *const HostObject,
    _this_val: HostValue,
    argv: *mut HostValue,
    _argc: i32,
) {
    not_callable(unsafe { &mut *ctx }, argv);
}

/// # Safety
/// As [`__callAnyAny`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __callObjObj(
    ctx: *mut RuntimeContext,
    _callee: *const HostObject,
    _this_val: *const HostObject,
    argv: *mut HostValue,
    _argc: i32,
) {
    not_callable(unsafe { &mut *ctx }, argv);
}

/// # Safety
/// As [`__callAnyUndefined`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __callObjUndefined(
    ctx: *mut RuntimeContext,
    _callee: *const HostObject,
    argv: *mut HostValue,
    _argc: i32,
) {
    not_callable(unsafe { &mut *ctx }, argv);
}

/// # Safety
/// As [`__callAnyAny`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __callCtorAny(
    ctx: *mut RuntimeContext,
    _callee: HostValue,
    argv: *mut HostValue,
    _argc: i32,
) {
    not_callable(unsafe { &mut *ctx }, argv);
}

/// # Safety
/// As [`__callAnyAny`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __callCtorObjAny(
    ctx: *mut RuntimeContext,
    _callee: *const HostObject,
    argv: *mut HostValue,
    _argc: i32,
) {
    not_callable(unsafe { &mut *ctx }, argv);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indirect_call_always_raises_not_callable() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let mut argv = [HostValue::undefined()];
        unsafe {
            __callAnyUndefined(&mut ctx, HostValue::from_i32(1), argv.as_mut_ptr(), 0);
        }
        assert!(ctx.has_exception());
        assert!(argv[0].is_exception());
    }
}
