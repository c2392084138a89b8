//! `__dupVal`/`__pushFreeVal` and their raw-object counterparts: the
//! reference-count hints behind the CFG's `Dup`/`PushFree` opcodes.

use jac_core::{HostObject, HostTag, HostValue, RuntimeContext};

/// # Safety
/// `ctx` must point to a live `RuntimeContext`. `val` must be a
/// `HostValue` the caller legitimately owns (or has access to via a
/// prior `dup`), per the refcounting discipline documented on
/// [`HostValue`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __dupVal(_ctx: *mut RuntimeContext, val: HostValue) -> HostValue {
    val.dup()
}

/// # Safety
/// As [`__dupVal`]; `val` is scheduled for release on the innermost open
/// stack frame rather than released immediately.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __pushFreeVal(ctx: *mut RuntimeContext, val: HostValue) {
    let ctx = unsafe { &mut *ctx };
    ctx.push_free(val);
}

/// # Safety
/// `obj` must be a live `HostObject` pointer obtained from a `HostValue`
/// with the `Object` tag (or another `__dupObj` call).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __dupObj(
    _ctx: *mut RuntimeContext,
    obj: *const HostObject,
) -> *const HostObject {
    // SAFETY: forwarded from the caller's contract above.
    let rc = unsafe { std::rc::Rc::from_raw(obj) };
    std::mem::forget(std::rc::Rc::clone(&rc));
    std::mem::forget(rc);
    obj
}

/// # Safety
/// As [`__dupObj`]; schedules release of one reference on the innermost
/// open stack frame.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __pushFreeObj(ctx: *mut RuntimeContext, obj: *const HostObject) {
    let ctx = unsafe { &mut *ctx };
    let value = HostValue { payload: obj as u64, tag: HostTag::Object as u64 };
    ctx.push_free(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn dup_and_push_free_val_balance_a_string() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let s = Rc::new("hi".to_string());
        let v = HostValue::from_string(Rc::clone(&s));
        ctx.enter_stack_frame();
        unsafe {
            let v2 = __dupVal(&mut ctx, v);
            assert_eq!(Rc::strong_count(&s), 3);
            __pushFreeVal(&mut ctx, v);
            __pushFreeVal(&mut ctx, v2);
        }
        ctx.exit_stack_frame();
        assert_eq!(Rc::strong_count(&s), 1);
    }

    #[test]
    fn dup_obj_increments_strong_count() {
        let obj = HostObject::new();
        let ptr = Rc::into_raw(Rc::clone(&obj));
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        unsafe {
            __dupObj(&mut ctx, ptr);
        }
        assert_eq!(Rc::strong_count(&obj), 3); // obj, ptr, dup
        unsafe {
            drop(Rc::from_raw(ptr));
            drop(Rc::from_raw(ptr));
        }
    }
}
