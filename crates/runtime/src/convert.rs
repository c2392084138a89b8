//! `__convertI32`, `__convertF64`, `__boolConv`: the slow-path
//! conversions the lowerer falls back on when a `Set` from `Any` to a
//! scalar cannot take the fast path for the tag actually present.

use jac_core::{ErrType, HostTag, HostValue, RuntimeContext};

/// ECMAScript's `ToInt32`: wrap a finite double into the `i32` range
/// modulo 2^32; non-finite values convert to zero.
fn to_int32(f: f64) -> i32 {
    if !f.is_finite() {
        return 0;
    }
    let truncated = f.trunc();
    let wrapped = truncated.rem_euclid(4294967296.0);
    if wrapped >= 2147483648.0 { (wrapped - 4294967296.0) as i32 } else { wrapped as i32 }
}

/// # Safety
/// `ctx` must point to a live `RuntimeContext`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __convertI32(ctx: *mut RuntimeContext, v: HostValue) -> i32 {
    let ctx = unsafe { &mut *ctx };
    match v.tag() {
        HostTag::I32 => v.as_i32().unwrap(),
        HostTag::Bool => v.as_bool().unwrap() as i32,
        HostTag::F64 => to_int32(v.as_f64().unwrap()),
        _ => {
            ctx.raise_error(ErrType::TypeError, "Invalid conversion");
            0
        }
    }
}

/// # Safety
/// As [`__convertI32`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __convertF64(ctx: *mut RuntimeContext, v: HostValue) -> f64 {
    let ctx = unsafe { &mut *ctx };
    match v.tag() {
        HostTag::F64 => v.as_f64().unwrap(),
        HostTag::I32 => v.as_i32().unwrap() as f64,
        HostTag::Bool => v.as_bool().unwrap() as i32 as f64,
        _ => {
            ctx.raise_error(ErrType::TypeError, "Invalid conversion");
            0.0
        }
    }
}

/// `ToBoolean`-style truthiness. Total: every tag converts, none raise,
/// matching the host's own semantics for `!`'s "inverted-truthiness".
///
/// # Safety
/// `_ctx`, if non-null, must point to a live `RuntimeContext`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __boolConv(_ctx: *mut RuntimeContext, v: HostValue) -> bool {
    match v.tag() {
        HostTag::Undefined => false,
        HostTag::Bool => v.as_bool().unwrap(),
        HostTag::I32 => v.as_i32().unwrap() != 0,
        HostTag::F64 => {
            let f = v.as_f64().unwrap();
            f != 0.0 && !f.is_nan()
        }
        HostTag::String => !v.as_str().unwrap().is_empty(),
        HostTag::Object => true,
        HostTag::Exception => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_i32_fast_paths() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        assert_eq!(unsafe { __convertI32(&mut ctx, HostValue::from_i32(7)) }, 7);
        assert_eq!(unsafe { __convertI32(&mut ctx, HostValue::from_bool(true)) }, 1);
        assert_eq!(unsafe { __convertI32(&mut ctx, HostValue::from_f64(3.9)) }, 3);
        assert!(!ctx.has_exception());
    }

    #[test]
    fn convert_i32_on_object_raises_type_error() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let obj = jac_core::HostObject::new();
        let v = HostValue::from_object(obj);
        let result = unsafe { __convertI32(&mut ctx, v) };
        assert_eq!(result, 0);
        assert!(ctx.has_exception());
        v.release();
    }

    #[test]
    fn bool_conv_never_raises() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        assert!(!unsafe { __boolConv(&mut ctx, HostValue::undefined()) });
        assert!(unsafe { __boolConv(&mut ctx, HostValue::from_i32(1)) });
        assert!(!unsafe { __boolConv(&mut ctx, HostValue::from_f64(f64::NAN)) });
        assert!(!ctx.has_exception());
    }
}
