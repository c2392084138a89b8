//! `__throwError`/`__throwVal`: the two ways compiled code (or another
//! helper on its behalf) raises a host exception.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

use jac_core::{ErrType, HostValue, RuntimeContext};

/// # Safety
/// `ctx` must point to a live `RuntimeContext`. `message` must be a
/// valid, NUL-terminated C string for the duration of this call.
/// `errtype` must be one of the five discriminants in §6's Errtype enum.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __throwError(
    ctx: *mut RuntimeContext,
    message: *const c_char,
    errtype: c_int,
) {
    let ctx = unsafe { &mut *ctx };
    let kind = ErrType::from_i32(errtype).unwrap_or(ErrType::InternalError);
    // SAFETY: forwarded from the caller's contract above.
    let message = unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned();
    ctx.raise_error(kind, message);
}

/// # Safety
/// `ctx` must point to a live `RuntimeContext`. `value` must be a
/// `HostValue` the caller is transferring ownership of; the runtime
/// context now owns the one reference it carried.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __throwVal(ctx: *mut RuntimeContext, value: HostValue) {
    let ctx = unsafe { &mut *ctx };
    ctx.raise_value(value);
}

/// Not in §6's table verbatim, but required by it: "the exception flag
/// ... is tested" after every fallible helper call, and
/// [`RuntimeContext`] deliberately has no stable field layout for
/// generated code to peek at directly (§9's host-value ABI note pins
/// down `HostValue`'s layout, not the context struct's). This is the
/// accessor the lowerer's exception-exit and call-site checks are built
/// on.
///
/// # Safety
/// `ctx` must point to a live `RuntimeContext`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __hasException(ctx: *mut RuntimeContext) -> bool {
    let ctx = unsafe { &mut *ctx };
    ctx.has_exception()
}

/// Also not in §6's table verbatim, but required by the wrapper contract
/// (§4.7): the same [`RuntimeContext`] is reused across every top-level
/// call into compiled code, so a wrapper must clear whatever exception
/// state a previous call left behind before running its own body —
/// otherwise a caller that ignored one exception would see it resurface
/// on an unrelated later call.
///
/// # Safety
/// `ctx` must point to a live `RuntimeContext`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __clearException(ctx: *mut RuntimeContext) {
    let ctx = unsafe { &mut *ctx };
    ctx.clear_exception();
}

#[cfg(test)]
mod tests {
    use super::*;
    use jac_core::ExceptionDetail;
    use std::ffi::CString;

    #[test]
    fn throw_error_records_kind_and_message() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let message = CString::new("Invalid arguments").unwrap();
        unsafe { __throwError(&mut ctx, message.as_ptr(), ErrType::TypeError as i32) };
        assert!(ctx.has_exception());
        match ctx.take_exception() {
            Some(ExceptionDetail::Error { kind, message }) => {
                assert_eq!(kind, ErrType::TypeError);
                assert_eq!(message, "Invalid arguments");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn throw_val_records_the_value() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        unsafe { __throwVal(&mut ctx, HostValue::from_i32(42)) };
        assert!(ctx.has_exception());
        match ctx.take_exception() {
            Some(ExceptionDetail::Value(v)) => assert_eq!(v.as_i32(), Some(42)),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn has_exception_reflects_current_flag_state() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        assert!(!unsafe { __hasException(&mut ctx) });
        ctx.raise_error(ErrType::RangeError, "out of range");
        assert!(unsafe { __hasException(&mut ctx) });
    }

    #[test]
    fn clear_exception_resets_the_flag() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        ctx.raise_error(ErrType::RangeError, "out of range");
        unsafe { __clearException(&mut ctx) };
        assert!(!unsafe { __hasException(&mut ctx) });
    }
}
