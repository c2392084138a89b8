//! The host's tagged value representation.
//!
//! The specification treats the host's boxed value (`Any`) as an external
//! collaborator: "producing the host's value representation itself" is an
//! explicit non-goal, and the only thing pinned down is its *shape* — a
//! 16-byte value with two 64-bit halves, payload and tag. [`HostValue`] is
//! that shape, plus just enough dynamic dispatch (`HostTag`, [`HostObject`])
//! for the runtime helpers in `jac-runtime` and the reference interpreter
//! used by this workspace's own tests to do something observably correct
//! with it. A real embedding would swap this module out wholesale and keep
//! everything above it (the ABI, the stack-slot convention, the refcount
//! discipline) unchanged.
//!
//! `HostValue` is `Copy` and carries no `Drop` impl on purpose: compiled
//! code treats it as a plain-old-data register pair and manages its
//! lifetime explicitly through the `Dup`/`PushFree` opcodes, which this
//! module exposes as [`HostValue::dup`] and [`HostValue::release`].
//! Forgetting to call `release` on an owned value leaks it; calling it
//! twice double-frees it. Both are the compiler's responsibility, not
//! this type's.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Discriminant stored in a [`HostValue`]'s `tag` half.
///
/// This is the *dynamic* tag carried by a boxed `Any` value at run time,
/// not to be confused with [`crate::StaticType`], the compiler's static
/// value-type lattice (`Void`/`I32`/`F64`/.../`Any`). An `Any`-typed temp
/// is a `HostValue` whose `HostTag` can be any of these at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum HostTag {
    Undefined = 0,
    Bool = 1,
    I32 = 2,
    F64 = 3,
    String = 4,
    Object = 5,
    /// Secondary signal used by indirect-call helpers: "Host values
    /// carrying the 'exception' tag are a secondary signal for indirect
    /// calls whose return is an Any" (the primary signal is always the
    /// runtime context's exception flag).
    Exception = 6,
}

impl HostTag {
    fn from_u64(raw: u64) -> Self {
        match raw {
            0 => HostTag::Undefined,
            1 => HostTag::Bool,
            2 => HostTag::I32,
            3 => HostTag::F64,
            4 => HostTag::String,
            5 => HostTag::Object,
            6 => HostTag::Exception,
            other => panic!("corrupt HostValue tag: {other}"),
        }
    }
}

/// A plain JavaScript-style object: a string-keyed bag of [`HostValue`]s.
///
/// Reference-counted via `Rc`, matching the `__dupObj`/`__pushFreeObj`
/// helpers in the runtime ABI, which accept a raw object pointer rather
/// than a full tagged value.
#[derive(Debug, Default)]
pub struct HostObject {
    pub fields: RefCell<HashMap<Rc<str>, HostValue>>,
}

impl HostObject {
    pub fn new() -> Rc<Self> {
        Rc::new(HostObject::default())
    }

    pub fn get(&self, key: &str) -> Option<HostValue> {
        self.fields.borrow().get(key).copied()
    }

    pub fn set(&self, key: &str, value: HostValue) {
        self.fields
            .borrow_mut()
            .insert(Rc::from(key), value);
    }
}

/// The host's tagged value: two 64-bit halves, payload and tag.
///
/// See the module documentation for the ownership discipline. Field
/// order and width match §9's "Host value representation" design note
/// exactly so that a generated `Set` between two `Any`s can be lowered
/// to a pair of 64-bit moves, as §4.7 specifies.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HostValue {
    pub payload: u64,
    pub tag: u64,
}

impl std::fmt::Debug for HostValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostValue")
            .field("tag", &self.tag())
            .field("payload", &self.payload)
            .finish()
    }
}

impl HostValue {
    pub fn undefined() -> Self {
        HostValue { payload: 0, tag: HostTag::Undefined as u64 }
    }

    pub fn from_bool(b: bool) -> Self {
        HostValue { payload: b as u64, tag: HostTag::Bool as u64 }
    }

    pub fn from_i32(v: i32) -> Self {
        HostValue { payload: v as u32 as u64, tag: HostTag::I32 as u64 }
    }

    pub fn from_f64(v: f64) -> Self {
        HostValue { payload: v.to_bits(), tag: HostTag::F64 as u64 }
    }

    /// Takes ownership of one reference to `s`: the returned value must
    /// eventually be [`release`](HostValue::release)d exactly once (or
    /// [`dup`](HostValue::dup)ed first to share it).
    ///
    /// Stored as `Rc<String>` rather than `Rc<str>`: `Rc::into_raw` on an
    /// unsized `Rc<str>` yields a fat pointer, which does not fit in a
    /// single 64-bit payload half. `Rc<String>` is sized, so its raw
    /// pointer is thin.
    pub fn from_string(s: Rc<String>) -> Self {
        let payload = Rc::into_raw(s) as u64;
        HostValue { payload, tag: HostTag::String as u64 }
    }

    /// Takes ownership of one reference to `obj`, as [`from_string`](HostValue::from_string).
    pub fn from_object(obj: Rc<HostObject>) -> Self {
        let payload = Rc::into_raw(obj) as u64;
        HostValue { payload, tag: HostTag::Object as u64 }
    }

    /// Marks this return slot as the "secondary signal" for an indirect
    /// call whose callee raised. The primary signal is always the
    /// runtime context's exception flag; callers must test that, not this.
    pub fn exception_marker() -> Self {
        HostValue { payload: 0, tag: HostTag::Exception as u64 }
    }

    pub fn tag(&self) -> HostTag {
        HostTag::from_u64(self.tag)
    }

    pub fn is_exception(&self) -> bool {
        matches!(self.tag(), HostTag::Exception)
    }

    pub fn as_bool(&self) -> Option<bool> {
        matches!(self.tag(), HostTag::Bool).then_some(self.payload != 0)
    }

    pub fn as_i32(&self) -> Option<i32> {
        matches!(self.tag(), HostTag::I32).then_some(self.payload as u32 as i32)
    }

    pub fn as_f64(&self) -> Option<f64> {
        matches!(self.tag(), HostTag::F64).then_some(f64::from_bits(self.payload))
    }

    /// Borrows the string payload without affecting its refcount. The
    /// borrow is valid as long as some owner holds a reference to this
    /// value (or a `dup` of it).
    pub fn as_str(&self) -> Option<&str> {
        if self.tag() != HostTag::String {
            return None;
        }
        let ptr = self.payload as *const String;
        // SAFETY: payload was produced by `Rc::into_raw` on an
        // `Rc<String>` and the caller upholds the refcount discipline
        // documented on `HostValue`, so the pointee is still alive.
        unsafe { Some((*ptr).as_str()) }
    }

    /// Borrows the object payload, as [`as_str`](HostValue::as_str).
    pub fn as_object(&self) -> Option<&HostObject> {
        if self.tag() != HostTag::Object {
            return None;
        }
        let ptr = self.payload as *const HostObject;
        // SAFETY: see `as_str`.
        unsafe { Some(&*ptr) }
    }

    /// The `Opcode::Dup` hint: increment the payload's refcount (for
    /// reference-counted tags) and return an independent owned copy.
    /// Primitive tags are returned unchanged, matching the opcode table's
    /// note that `Dup` is only meaningful for non-trivial temps.
    pub fn dup(&self) -> HostValue {
        match self.tag() {
            HostTag::String => {
                let ptr = self.payload as *const String;
                // SAFETY: see `as_str`.
                let rc = unsafe { Rc::from_raw(ptr) };
                std::mem::forget(Rc::clone(&rc));
                std::mem::forget(rc);
                *self
            }
            HostTag::Object => {
                let ptr = self.payload as *const HostObject;
                // SAFETY: see `as_object`.
                let rc = unsafe { Rc::from_raw(ptr) };
                std::mem::forget(Rc::clone(&rc));
                std::mem::forget(rc);
                *self
            }
            _ => *self,
        }
    }

    /// The `Opcode::PushFree` hint, applied immediately rather than
    /// deferred onto a free-stack frame: decrement the payload's
    /// refcount, dropping it if this was the last reference. Callers
    /// that need deferred release should push onto a
    /// [`crate::context::FreeStackFrame`] instead and let frame exit call
    /// this for them.
    pub fn release(self) {
        match self.tag() {
            HostTag::String => {
                let ptr = self.payload as *const String;
                // SAFETY: see `as_str`; this consumes the one reference
                // `self` owns.
                unsafe { drop(Rc::from_raw(ptr)) };
            }
            HostTag::Object => {
                let ptr = self.payload as *const HostObject;
                // SAFETY: see `as_object`.
                unsafe { drop(Rc::from_raw(ptr)) };
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_sixteen_bytes_two_halves() {
        assert_eq!(std::mem::size_of::<HostValue>(), 16);
        assert_eq!(std::mem::align_of::<HostValue>(), 8);
    }

    #[test]
    fn scalar_round_trip() {
        assert_eq!(HostValue::from_i32(-7).as_i32(), Some(-7));
        assert_eq!(HostValue::from_f64(3.5).as_f64(), Some(3.5));
        assert_eq!(HostValue::from_bool(true).as_bool(), Some(true));
        assert!(HostValue::undefined().as_i32().is_none());
    }

    #[test]
    fn string_refcounting_round_trip() {
        let s: Rc<String> = Rc::new("hello".to_string());
        let v = HostValue::from_string(Rc::clone(&s));
        assert_eq!(v.as_str(), Some("hello"));
        let v2 = v.dup();
        assert_eq!(Rc::strong_count(&s), 3); // s, v, v2
        v.release();
        assert_eq!(Rc::strong_count(&s), 2);
        v2.release();
        assert_eq!(Rc::strong_count(&s), 1);
    }

    #[test]
    fn object_get_set() {
        let obj = HostObject::new();
        obj.set("x", HostValue::from_i32(42));
        assert_eq!(obj.get("x").and_then(|v| v.as_i32()), Some(42));
        assert!(obj.get("missing").is_none());
    }

    #[test]
    fn exception_marker_is_secondary_signal() {
        let v = HostValue::exception_marker();
        assert!(v.is_exception());
    }
}
