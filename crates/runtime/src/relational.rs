//! `__lessAny`/`__lessEqAny`/`__greaterAny`/`__greaterEqAny`/`__eqAny`/
//! `__neqAny`: relational operators on tagged values.
//!
//! Ordering comparisons only make sense between two numerics (promoted
//! through the same upcast as the arithmetic family) or two strings
//! (lexicographic); any other pairing raises `TypeError` and returns
//! `false`. Equality is the host's *strict*-equality relation (§8:
//! "equal (by the host's strict-equality relation)"), which is total —
//! it never raises, it just returns `false` for values that cannot be
//! strictly equal (mismatched tags, two different objects, ...).

use jac_core::{ErrType, HostTag, HostValue, RuntimeContext};

fn numeric_f64(v: &HostValue) -> Option<f64> {
    match v.tag() {
        HostTag::I32 => v.as_i32().map(|i| i as f64),
        HostTag::F64 => v.as_f64(),
        _ => None,
    }
}

fn ordering(ctx: &mut RuntimeContext, a: HostValue, b: HostValue, op: &str) -> Option<std::cmp::Ordering> {
    if let (Some(x), Some(y)) = (numeric_f64(&a), numeric_f64(&b)) {
        return x.partial_cmp(&y);
    }
    if a.tag() == HostTag::String && b.tag() == HostTag::String {
        return a.as_str().unwrap().partial_cmp(b.as_str().unwrap());
    }
    ctx.raise_error(ErrType::TypeError, format!("Invalid operands to {op}"));
    None
}

/// # Safety
/// `ctx` must point to a live `RuntimeContext`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __lessAny(ctx: *mut RuntimeContext, a: HostValue, b: HostValue) -> bool {
    let ctx = unsafe { &mut *ctx };
    ordering(ctx, a, b, "<") == Some(std::cmp::Ordering::Less)
}

/// # Safety
/// As [`__lessAny`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __lessEqAny(ctx: *mut RuntimeContext, a: HostValue, b: HostValue) -> bool {
    let ctx = unsafe { &mut *ctx };
    matches!(
        ordering(ctx, a, b, "<="),
        Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
    )
}

/// # Safety
/// As [`__lessAny`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __greaterAny(ctx: *mut RuntimeContext, a: HostValue, b: HostValue) -> bool {
    let ctx = unsafe { &mut *ctx };
    ordering(ctx, a, b, ">") == Some(std::cmp::Ordering::Greater)
}

/// # Safety
/// As [`__lessAny`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __greaterEqAny(ctx: *mut RuntimeContext, a: HostValue, b: HostValue) -> bool {
    let ctx = unsafe { &mut *ctx };
    matches!(
        ordering(ctx, a, b, ">="),
        Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
    )
}

/// Strict equality: total, never raises.
///
/// # Safety
/// `_ctx`, if non-null, must point to a live `RuntimeContext`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __eqAny(_ctx: *mut RuntimeContext, a: HostValue, b: HostValue) -> bool {
    match (numeric_f64(&a), numeric_f64(&b)) {
        (Some(x), Some(y)) => return x == y,
        _ => {}
    }
    match (a.tag(), b.tag()) {
        (HostTag::String, HostTag::String) => a.as_str() == b.as_str(),
        (HostTag::Bool, HostTag::Bool) => a.as_bool() == b.as_bool(),
        (HostTag::Object, HostTag::Object) => a.payload == b.payload,
        (HostTag::Undefined, HostTag::Undefined) => true,
        _ => false,
    }
}

/// # Safety
/// As [`__eqAny`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __neqAny(ctx: *mut RuntimeContext, a: HostValue, b: HostValue) -> bool {
    !unsafe { __eqAny(ctx, a, b) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ordering_crosses_i32_f64() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        assert!(unsafe { __lessAny(&mut ctx, HostValue::from_i32(1), HostValue::from_f64(1.5)) });
        assert!(!ctx.has_exception());
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let a = HostValue::from_string(std::rc::Rc::new("abc".to_string()));
        let b = HostValue::from_string(std::rc::Rc::new("abd".to_string()));
        assert!(unsafe { __lessAny(&mut ctx, a, b) });
        a.release();
        b.release();
    }

    #[test]
    fn strict_equality_treats_i32_and_f64_as_the_same_number_type() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        assert!(unsafe { __eqAny(&mut ctx, HostValue::from_i32(2), HostValue::from_f64(2.0)) });
    }

    #[test]
    fn strict_equality_never_raises_on_mismatched_tags() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        assert!(!unsafe { __eqAny(&mut ctx, HostValue::undefined(), HostValue::from_i32(0)) });
        assert!(!ctx.has_exception());
    }

    #[test]
    fn ordering_on_incomparable_types_raises() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let obj = jac_core::HostObject::new();
        let v = HostValue::from_object(obj);
        assert!(!unsafe { __lessAny(&mut ctx, v, HostValue::from_i32(1)) });
        assert!(ctx.has_exception());
        v.release();
    }
}
