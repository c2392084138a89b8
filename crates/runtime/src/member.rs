//! `__getMember*`/`__setMember*`: property access across the four
//! statically-known shapes the lowerer can produce — a known `Object`
//! pointer or a boxed `Any` parent, each keyed by a `StringConst`
//! pointer, an `i32` index, or another boxed `Any`.
//!
//! This stand-in's [`jac_core::HostObject`] only has string-keyed
//! fields, so an `i32` or `Any`-typed key is first turned into its
//! string form (`"0"`, `"1"`, ...) exactly as a real engine's array/object
//! duality would for an integer-like property name.

use std::ffi::CStr;
use std::os::raw::c_char;

use jac_core::{ErrType, HostObject, HostTag, HostValue, RuntimeContext};

fn key_to_string(ctx: &mut RuntimeContext, key: HostValue) -> Option<String> {
    match key.tag() {
        HostTag::String => key.as_str().map(str::to_owned),
        HostTag::I32 => key.as_i32().map(|i| i.to_string()),
        _ => {
            ctx.raise_error(ErrType::TypeError, "Invalid property key");
            None
        }
    }
}

fn get(obj: &HostObject, key: &str) -> HostValue {
    obj.get(key).unwrap_or_else(HostValue::undefined)
}

fn as_object<'a>(ctx: &mut RuntimeContext, parent: &'a HostValue) -> Option<&'a HostObject> {
    parent.as_object().or_else(|| {
        ctx.raise_error(ErrType::TypeError, "Invalid conversion");
        None
    })
}

macro_rules! get_member_obj {
    ($name:ident, $key_ty:ty, $key_to_str:expr) => {
        /// # Safety
        /// `ctx` and `obj` must point to live values.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(
            ctx: *mut RuntimeContext,
            obj: *const HostObject,
            key: $key_ty,
        ) -> HostValue {
            let ctx = unsafe { &mut *ctx };
            let obj = unsafe { &*obj };
            match $key_to_str(ctx, key) {
                Some(k) => get(obj, &k),
                None => HostValue::undefined(),
            }
        }
    };
}

get_member_obj!(__getMemberObjCStr, *const c_char, |_ctx: &mut RuntimeContext, key: *const c_char| {
    // SAFETY: forwarded from the caller's contract.
    Some(unsafe { CStr::from_ptr(key) }.to_string_lossy().into_owned())
});
get_member_obj!(__getMemberObjI32, i32, |_ctx: &mut RuntimeContext, key: i32| Some(key.to_string()));
get_member_obj!(__getMemberObjAny, HostValue, key_to_string);

macro_rules! get_member_any {
    ($name:ident, $key_ty:ty, $key_to_str:expr) => {
        /// # Safety
        /// `ctx` must point to a live `RuntimeContext`; `parent` must
        /// borrow-valid for the duration of this call per the refcounting
        /// discipline on `HostValue`.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(
            ctx: *mut RuntimeContext,
            parent: HostValue,
            key: $key_ty,
        ) -> HostValue {
            let ctx = unsafe { &mut *ctx };
            let Some(obj) = as_object(ctx, &parent) else { return HostValue::undefined() };
            match $key_to_str(ctx, key) {
                Some(k) => get(obj, &k),
                None => HostValue::undefined(),
            }
        }
    };
}

get_member_any!(__getMemberAnyCStr, *const c_char, |_ctx: &mut RuntimeContext, key: *const c_char| {
    // SAFETY: forwarded from the caller's contract.
    Some(unsafe { CStr::from_ptr(key) }.to_string_lossy().into_owned())
});
get_member_any!(__getMemberAnyI32, i32, |_ctx: &mut RuntimeContext, key: i32| Some(key.to_string()));
get_member_any!(__getMemberAnyAny, HostValue, key_to_string);

macro_rules! set_member_obj {
    ($name:ident, $key_ty:ty, $key_to_str:expr) => {
        /// # Safety
        /// `ctx` and `obj` must point to live values.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(
            ctx: *mut RuntimeContext,
            obj: *const HostObject,
            key: $key_ty,
            value: HostValue,
        ) {
            let ctx = unsafe { &mut *ctx };
            let obj = unsafe { &*obj };
            if let Some(k) = $key_to_str(ctx, key) {
                obj.set(&k, value);
            }
        }
    };
}

set_member_obj!(__setMemberObjCStr, *const c_char, |_ctx: &mut RuntimeContext, key: *const c_char| {
    // SAFETY: forwarded from the caller's contract.
    Some(unsafe { CStr::from_ptr(key) }.to_string_lossy().into_owned())
});
set_member_obj!(__setMemberObjI32, i32, |_ctx: &mut RuntimeContext, key: i32| Some(key.to_string()));
set_member_obj!(__setMemberObjAny, HostValue, key_to_string);

macro_rules! set_member_any {
    ($name:ident, $key_ty:ty, $key_to_str:expr) => {
        /// # Safety
        /// As the `get_member_any` family.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(
            ctx: *mut RuntimeContext,
            parent: HostValue,
            key: $key_ty,
            value: HostValue,
        ) {
            let ctx = unsafe { &mut *ctx };
            let Some(obj) = as_object(ctx, &parent) else { return };
            if let Some(k) = $key_to_str(ctx, key) {
                obj.set(&k, value);
            }
        }
    };
}

set_member_any!(__setMemberAnyCStr, *const c_char, |_ctx: &mut RuntimeContext, key: *const c_char| {
    // SAFETY: forwarded from the caller's contract.
    Some(unsafe { CStr::from_ptr(key) }.to_string_lossy().into_owned())
});
set_member_any!(__setMemberAnyI32, i32, |_ctx: &mut RuntimeContext, key: i32| Some(key.to_string()));
set_member_any!(__setMemberAnyAny, HostValue, key_to_string);

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn get_set_via_obj_cstr() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let obj = HostObject::new();
        let key = CString::new("x").unwrap();
        unsafe {
            __setMemberObjCStr(&mut ctx, &*obj, key.as_ptr(), HostValue::from_i32(42));
        }
        let got = unsafe { __getMemberObjCStr(&mut ctx, &*obj, key.as_ptr()) };
        assert_eq!(got.as_i32(), Some(42));
    }

    #[test]
    fn get_member_any_requires_object_parent() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let key = CString::new("x").unwrap();
        let got = unsafe { __getMemberAnyCStr(&mut ctx, HostValue::from_i32(1), key.as_ptr()) };
        assert!(got.as_i32().is_none());
        assert!(ctx.has_exception());
    }

    #[test]
    fn nested_member_chain_through_any() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let inner = HostObject::new();
        inner.set("c", HostValue::from_i32(42));
        let outer = HostObject::new();
        outer.set("b", HostValue::from_object(std::rc::Rc::clone(&inner)));
        let outer_any = HostValue::from_object(outer);

        let key_b = CString::new("b").unwrap();
        let b_val = unsafe { __getMemberAnyCStr(&mut ctx, outer_any, key_b.as_ptr()) };
        let key_c = CString::new("c").unwrap();
        let c_val = unsafe { __getMemberAnyCStr(&mut ctx, b_val, key_c.as_ptr()) };
        assert_eq!(c_val.as_i32(), Some(42));
    }
}
