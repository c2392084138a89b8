//! `__add`/`__sub`/`__mul`/`__div`/`__rem` and the two `F64`-only
//! helpers called when the typed lowering already knows it needs the
//! floating-point path (`__powF64`, `__remF64`).
//!
//! The four-operator family dynamically dispatches on the operands'
//! `HostTag`, mirroring `commonUpcast` from §3: two `I32`s stay `I32`
//! (wrapping, per the host's and the interpreter's own overflow
//! behaviour); anything involving an `F64` promotes to `F64`; `__add`
//! additionally concatenates when either operand is a `String`. `__div`
//! always promotes to `F64`, matching "div and pow produce F64" in the
//! type lattice. Any other combination sets the exception flag and
//! returns a value tagged `Exception`.

use jac_core::{ErrType, HostTag, HostValue, RuntimeContext};

fn numeric_f64(v: &HostValue) -> Option<f64> {
    match v.tag() {
        HostTag::I32 => v.as_i32().map(|i| i as f64),
        HostTag::F64 => v.as_f64(),
        _ => None,
    }
}

fn display_string(v: &HostValue) -> Option<String> {
    match v.tag() {
        HostTag::String => v.as_str().map(str::to_owned),
        HostTag::I32 => v.as_i32().map(|i| i.to_string()),
        HostTag::F64 => v.as_f64().map(|f| f.to_string()),
        HostTag::Bool => v.as_bool().map(|b| b.to_string()),
        HostTag::Undefined => Some("undefined".to_string()),
        _ => None,
    }
}

fn invalid_operands(ctx: &mut RuntimeContext, op: &str) -> HostValue {
    ctx.raise_error(ErrType::TypeError, format!("Invalid operands to {op}"));
    HostValue::exception_marker()
}

/// # Safety
/// `ctx` must point to a live `RuntimeContext`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __add(ctx: *mut RuntimeContext, a: HostValue, b: HostValue) -> HostValue {
    let ctx = unsafe { &mut *ctx };
    if a.tag() == HostTag::String || b.tag() == HostTag::String {
        return match (display_string(&a), display_string(&b)) {
            (Some(sa), Some(sb)) => {
                HostValue::from_string(std::rc::Rc::new(sa + &sb))
            }
            _ => invalid_operands(ctx, "+"),
        };
    }
    binary_numeric(ctx, a, b, "+", |x, y| x.wrapping_add(y), |x, y| x + y)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn __sub(ctx: *mut RuntimeContext, a: HostValue, b: HostValue) -> HostValue {
    let ctx = unsafe { &mut *ctx };
    binary_numeric(ctx, a, b, "-", |x, y| x.wrapping_sub(y), |x, y| x - y)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn __mul(ctx: *mut RuntimeContext, a: HostValue, b: HostValue) -> HostValue {
    let ctx = unsafe { &mut *ctx };
    binary_numeric(ctx, a, b, "*", |x, y| x.wrapping_mul(y), |x, y| x * y)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn __rem(ctx: *mut RuntimeContext, a: HostValue, b: HostValue) -> HostValue {
    let ctx = unsafe { &mut *ctx };
    binary_numeric(ctx, a, b, "%", |x, y| if y == 0 { 0 } else { x.wrapping_rem(y) }, |x, y| x % y)
}

/// `__div` always promotes to `F64` regardless of operand tags.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __div(ctx: *mut RuntimeContext, a: HostValue, b: HostValue) -> HostValue {
    let ctx = unsafe { &mut *ctx };
    match (numeric_f64(&a), numeric_f64(&b)) {
        (Some(x), Some(y)) => HostValue::from_f64(x / y),
        _ => invalid_operands(ctx, "/"),
    }
}

fn binary_numeric(
    ctx: &mut RuntimeContext,
    a: HostValue,
    b: HostValue,
    op: &str,
    on_i32: impl Fn(i32, i32) -> i32,
    on_f64: impl Fn(f64, f64) -> f64,
) -> HostValue {
    match (a.tag(), b.tag()) {
        (HostTag::I32, HostTag::I32) => {
            HostValue::from_i32(on_i32(a.as_i32().unwrap(), b.as_i32().unwrap()))
        }
        _ => match (numeric_f64(&a), numeric_f64(&b)) {
            (Some(x), Some(y)) => HostValue::from_f64(on_f64(x, y)),
            _ => invalid_operands(ctx, op),
        },
    }
}

/// # Safety
/// `_ctx`, if non-null, must point to a live `RuntimeContext`. The value
/// itself is never read since exponentiation of two finite-or-not `f64`s
/// cannot fail.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __powF64(_ctx: *mut RuntimeContext, a: f64, b: f64) -> f64 {
    a.powf(b)
}

/// # Safety
/// As [`__powF64`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __remF64(_ctx: *mut RuntimeContext, a: f64, b: f64) -> f64 {
    a % b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_add_wraps() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let result = unsafe { __add(&mut ctx, HostValue::from_i32(i32::MAX), HostValue::from_i32(1)) };
        assert_eq!(result.as_i32(), Some(i32::MIN));
        assert!(!ctx.has_exception());
    }

    #[test]
    fn mixed_numeric_promotes_to_f64() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let result = unsafe { __add(&mut ctx, HostValue::from_i32(1), HostValue::from_f64(0.5)) };
        assert_eq!(result.as_f64(), Some(1.5));
    }

    #[test]
    fn string_concat() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let a = HostValue::from_string(std::rc::Rc::new("foo".to_string()));
        let b = HostValue::from_string(std::rc::Rc::new("bar".to_string()));
        let result = unsafe { __add(&mut ctx, a, b) };
        assert_eq!(result.as_str(), Some("foobar"));
        a.release();
        b.release();
        result.release();
    }

    #[test]
    fn div_always_produces_f64() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let result = unsafe { __div(&mut ctx, HostValue::from_i32(4), HostValue::from_i32(2)) };
        assert_eq!(result.tag(), HostTag::F64);
        assert_eq!(result.as_f64(), Some(2.0));
    }

    #[test]
    fn invalid_operands_raise_type_error() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let result = unsafe { __sub(&mut ctx, HostValue::undefined(), HostValue::from_i32(1)) };
        assert!(result.is_exception());
        assert!(ctx.has_exception());
    }
}
