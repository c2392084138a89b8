//! `__enterStackFrame` / `__exitStackFrame`: the free-list frame pair
//! every compiled body opens on entry and closes on every exit path,
//! per §4.7's "Every compiled body begins by calling `__enterStackFrame`...
//! Every Return, ReturnValue, and exception-exit path calls
//! `__exitStackFrame`".

use jac_core::RuntimeContext;

/// # Safety
/// `ctx` must point to a live `RuntimeContext` exclusively owned by the
/// calling thread for the duration of this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __enterStackFrame(ctx: *mut RuntimeContext) {
    let ctx = unsafe { &mut *ctx };
    ctx.enter_stack_frame();
}

/// # Safety
/// `ctx` must point to a live `RuntimeContext` with at least one frame
/// open (i.e. a matching `__enterStackFrame` call earlier on this path).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __exitStackFrame(ctx: *mut RuntimeContext) {
    let ctx = unsafe { &mut *ctx };
    ctx.exit_stack_frame();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_then_exit_is_balanced() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        unsafe {
            __enterStackFrame(&mut ctx);
            __exitStackFrame(&mut ctx);
        }
        assert_eq!(ctx.frame_depth(), 0);
    }
}
