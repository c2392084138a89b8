//! `__newString`: the single ABI entry point for materialising a `String`
//! host value from a C string constant, used when the lowerer needs an
//! owned `Any` rather than a bare `StringConst` pointer.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::rc::Rc;

use jac_core::{HostValue, RuntimeContext};

/// # Safety
/// `_ctx`, if non-null, must point to a live `RuntimeContext`. `s` must
/// be a valid, NUL-terminated C string for the duration of this call.
/// The returned `HostValue` is an owned reference the caller must
/// eventually release (directly or via a stack frame).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __newString(_ctx: *mut RuntimeContext, s: *const c_char) -> HostValue {
    // SAFETY: forwarded from the caller's contract above.
    let s = unsafe { CStr::from_ptr(s) }.to_string_lossy().into_owned();
    HostValue::from_string(Rc::new(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn new_string_round_trips() {
        let cstr = CString::new("hello").unwrap();
        let v = unsafe { __newString(std::ptr::null_mut(), cstr.as_ptr()) };
        assert_eq!(v.as_str(), Some("hello"));
        v.release();
    }
}
