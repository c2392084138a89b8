//! The runtime context: the per-host-context singleton that compiled
//! bodies and the runtime helper ABI thread through every call.
//!
//! Grounded on the shape of the teacher's thread-local error state
//! (`crates/runtime/src/error.rs`'s `LAST_ERROR`/`ERROR_CSTRING` pair and
//! its FFI-safe accessors), generalised from thread-local globals into an
//! explicit struct per §3's "Runtime context" and §5's "Shared resources"
//! ("exclusive to a single thread of execution" — a struct threaded by
//! pointer, not `thread_local!` state, since nothing in the spec requires
//! one runtime context per OS thread and an explicit struct is easier to
//! construct more than one of in tests).

use std::ffi::c_void;
use std::os::raw::c_char;

use bumpalo::Bump;

use crate::errtype::ErrType;
use crate::value::HostValue;

/// A stack of tagged values accumulated by `PushFree` during one compiled
/// call, released in LIFO order when the frame is popped.
pub type FreeStackFrame = Vec<HostValue>;

/// What `__throwError`/`__throwVal` recorded, for the host glue to
/// translate into a host-visible exception after a compiled call returns
/// with the exception flag set.
#[derive(Debug)]
pub enum ExceptionDetail {
    Error { kind: ErrType, message: String },
    Value(HostValue),
}

/// Bump-allocated owner of the `StringConst` buffers referenced by
/// generated code (e.g. the member-name constants `GetMember`/`SetMember`
/// address). Pointers returned by [`StringArena::intern`] stay valid for
/// the arena's lifetime: bumpalo never moves or frees an individual
/// allocation except by dropping the whole arena.
#[derive(Default)]
pub struct StringArena {
    bump: Bump,
}

impl StringArena {
    pub fn new() -> Self {
        StringArena::default()
    }

    /// Interns `s` as a NUL-terminated buffer and returns a pointer
    /// suitable for the `StringConst` value type. The pointee lives as
    /// long as this arena does.
    pub fn intern(&self, s: &str) -> *const c_char {
        let bytes = self
            .bump
            .alloc_slice_fill_iter(s.bytes().chain(std::iter::once(0u8)));
        bytes.as_ptr() as *const c_char
    }
}

/// Per-host-context singleton: the pointer to the embedding host's own
/// context, the exception flag, the free-stack-frame stack, and the
/// string-constant arena, exactly as enumerated in §3 and the GLOSSARY.
pub struct RuntimeContext {
    host_context: *mut c_void,
    exception_flag: i32,
    exception_detail: Option<ExceptionDetail>,
    frames: Vec<FreeStackFrame>,
    strings: StringArena,
}

impl RuntimeContext {
    /// `host_context` is an opaque pointer into the embedding host; this
    /// crate never dereferences it, it only threads it through for the
    /// benefit of runtime helpers that do (an external collaborator).
    pub fn new(host_context: *mut c_void) -> Self {
        RuntimeContext {
            host_context,
            exception_flag: 0,
            exception_detail: None,
            frames: Vec::new(),
            strings: StringArena::new(),
        }
    }

    pub fn host_context(&self) -> *mut c_void {
        self.host_context
    }

    /// `__enterStackFrame`.
    pub fn enter_stack_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    /// `__exitStackFrame`: pops the innermost frame and releases every
    /// value it accumulated, in LIFO order (invariant 4 in §3).
    pub fn exit_stack_frame(&mut self) {
        let frame = self
            .frames
            .pop()
            .expect("exit_stack_frame called without a matching enter_stack_frame");
        for value in frame.into_iter().rev() {
            value.release();
        }
    }

    /// `__pushFreeVal`/`__pushFreeObj`: schedule `value` for release when
    /// the innermost stack frame exits.
    pub fn push_free(&mut self, value: HostValue) {
        self.frames
            .last_mut()
            .expect("push_free called without an active stack frame")
            .push(value);
    }

    /// How many frames are currently open. Exposed for tests that check
    /// nesting discipline rather than for compiled code.
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// `__throwError(cstr, errtype)`.
    pub fn raise_error(&mut self, kind: ErrType, message: impl Into<String>) {
        self.exception_flag = 1;
        self.exception_detail = Some(ExceptionDetail::Error { kind, message: message.into() });
    }

    /// `__throwVal(any)`.
    pub fn raise_value(&mut self, value: HostValue) {
        self.exception_flag = 1;
        self.exception_detail = Some(ExceptionDetail::Value(value));
    }

    pub fn has_exception(&self) -> bool {
        self.exception_flag != 0
    }

    pub fn clear_exception(&mut self) {
        self.exception_flag = 0;
        self.exception_detail = None;
    }

    /// Clears the flag and returns whatever detail was recorded, for the
    /// host glue (or a compiled wrapper) to translate into a host-visible
    /// exception.
    pub fn take_exception(&mut self) -> Option<ExceptionDetail> {
        self.exception_flag = 0;
        self.exception_detail.take()
    }

    pub fn intern_string(&self, s: &str) -> *const c_char {
        self.strings.intern(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn stack_frame_releases_in_lifo_order() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        let a: Rc<String> = Rc::new("a".to_string());
        let b: Rc<String> = Rc::new("b".to_string());
        ctx.enter_stack_frame();
        ctx.push_free(HostValue::from_string(Rc::clone(&a)));
        ctx.push_free(HostValue::from_string(Rc::clone(&b)));
        assert_eq!(Rc::strong_count(&a), 2);
        assert_eq!(Rc::strong_count(&b), 2);
        ctx.exit_stack_frame();
        assert_eq!(Rc::strong_count(&a), 1);
        assert_eq!(Rc::strong_count(&b), 1);
    }

    #[test]
    fn nested_frames_only_release_their_own_scope() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        ctx.enter_stack_frame();
        ctx.enter_stack_frame();
        assert_eq!(ctx.frame_depth(), 2);
        ctx.exit_stack_frame();
        assert_eq!(ctx.frame_depth(), 1);
        ctx.exit_stack_frame();
        assert_eq!(ctx.frame_depth(), 0);
    }

    #[test]
    fn exception_round_trip() {
        let mut ctx = RuntimeContext::new(std::ptr::null_mut());
        assert!(!ctx.has_exception());
        ctx.raise_error(ErrType::TypeError, "Invalid conversion");
        assert!(ctx.has_exception());
        match ctx.take_exception() {
            Some(ExceptionDetail::Error { kind, message }) => {
                assert_eq!(kind, ErrType::TypeError);
                assert_eq!(message, "Invalid conversion");
            }
            other => panic!("unexpected exception detail: {other:?}"),
        }
        assert!(!ctx.has_exception());
    }

    #[test]
    fn string_arena_returns_stable_nul_terminated_pointers() {
        let ctx = RuntimeContext::new(std::ptr::null_mut());
        let ptr = ctx.intern_string("abc");
        let back = unsafe { std::ffi::CStr::from_ptr(ptr) };
        assert_eq!(back.to_str().unwrap(), "abc");
    }
}
