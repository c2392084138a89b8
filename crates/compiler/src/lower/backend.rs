//! The narrow facade §9 calls for: "hide the backend behind a narrow
//! facade with methods such as `newFunction`, `newReg`, `emitInsn`,
//! `emitCall`, `newLabel`, `appendBlock`, `finalise`". [`Backend`] is
//! that facade. The concrete target is textual LLVM IR assembled into a
//! `String`, shelled out to `clang` exactly as the teacher's own
//! `CodeGen` (`codegen/state.rs`) does for its stack-machine backend —
//! the rest of `jac_compiler::lower` never touches an LLVM type or opcode
//! string directly except through the methods below.

use std::collections::HashSet;
use std::fmt::Write as _;

/// An LLVM value reference, already including its sigil (`%t3`, `%ctx`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reg(pub String);

/// A block label, without the trailing colon.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(pub String);

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declares the signature of a `jac-runtime` extern function, once, the
/// first time the lowerer needs to call it. The strings are hand-picked
/// to exactly match each helper's Rust ABI (§6's table); a typo here
/// would link but miscompile, the same risk the teacher's own
/// `runtime.rs::RUNTIME_DECLARATIONS` table carried.
pub struct ExternSig {
    pub name: &'static str,
    pub ret: &'static str,
    pub params: &'static str,
}

pub struct Backend {
    body: String,
    next_reg: u32,
    next_label: u32,
    next_global: u32,
    declared_externs: HashSet<&'static str>,
    extern_decls: String,
    globals: String,
}

impl Backend {
    pub fn new() -> Self {
        Backend {
            body: String::new(),
            next_reg: 0,
            next_label: 0,
            next_global: 0,
            declared_externs: HashSet::new(),
            extern_decls: String::new(),
            globals: String::new(),
        }
    }

    pub fn new_reg(&mut self) -> Reg {
        let id = self.next_reg;
        self.next_reg += 1;
        Reg(format!("%t{id}"))
    }

    pub fn new_label(&mut self) -> Label {
        let id = self.next_label;
        self.next_label += 1;
        Label(format!("L{id}"))
    }

    /// Opens `label:` in the output. Callers are responsible for having
    /// terminated the previous block before calling this — LLVM rejects
    /// a block that falls through into the next without a terminator.
    pub fn append_block(&mut self, label: &Label) {
        writeln!(self.body, "{label}:").unwrap();
    }

    /// Appends one already-formatted instruction line, indented. This is
    /// the raw escape hatch `emitInsn` names in §9; higher-level helpers
    /// in `lower::func` format the line before calling it.
    pub fn emit_insn(&mut self, text: &str) {
        writeln!(self.body, "  {text}").unwrap();
    }

    /// `emitCall`: declares `sig` on first use, then emits a `call`
    /// instruction. Returns the destination register when `sig.ret` is
    /// not `"void"`.
    pub fn emit_call(&mut self, sig: ExternSig, args: &[String]) -> Option<Reg> {
        self.declare_external(sig.name, sig.ret, sig.params);
        let args_joined = args.join(", ");
        if sig.ret == "void" {
            self.emit_insn(&format!("call void @{}({args_joined})", sig.name));
            None
        } else {
            let dst = self.new_reg();
            self.emit_insn(&format!("{dst} = call {} @{}({args_joined})", sig.ret, sig.name));
            Some(dst)
        }
    }

    pub fn declare_external(&mut self, name: &'static str, ret: &str, params: &str) {
        if self.declared_externs.insert(name) {
            writeln!(self.extern_decls, "declare {ret} @{name}({params})").unwrap();
        }
    }

    /// Interns a string literal as a module-scope constant, returning the
    /// pointer expression to use in place of a C string argument.
    pub fn new_string_constant(&mut self, text: &str) -> Reg {
        let id = self.next_global;
        self.next_global += 1;
        let name = format!("@.str.{id}");
        let escaped = escape_llvm_string(text);
        let len = text.len() + 1;
        writeln!(self.globals, "{name} = private unnamed_addr constant [{len} x i8] c\"{escaped}\\00\"").unwrap();
        Reg(format!("getelementptr inbounds ([{len} x i8], ptr {name}, i64 0, i64 0)"))
    }

    pub fn define_function(&mut self, signature: &str, body_emit: impl FnOnce(&mut Backend)) {
        writeln!(self.body, "define {signature} {{").unwrap();
        body_emit(self);
        writeln!(self.body, "}}\n").unwrap();
    }

    /// Appends a line verbatim, with no indentation — for `define ... {`
    /// openers and `}` closers, which sit outside any basic block.
    pub fn raw(&mut self, text: &str) {
        writeln!(self.body, "{text}").unwrap();
    }

    /// `finalise`: assembles the complete `.ll` module text.
    pub fn finalize(self) -> String {
        let mut out = String::new();
        out.push_str("%HostValue = type { i64, i64 }\n\n");
        out.push_str(&self.globals);
        out.push('\n');
        out.push_str(&self.extern_decls);
        out.push('\n');
        out.push_str(&self.body);
        out
    }
}

impl Default for Backend {
    fn default() -> Self {
        Backend::new()
    }
}

fn escape_llvm_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'\\' => out.push_str("\\5C"),
            b'"' => out.push_str("\\22"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_labels_are_fresh_each_time() {
        let mut b = Backend::new();
        assert_eq!(b.new_reg().0, "%t0");
        assert_eq!(b.new_reg().0, "%t1");
        assert_eq!(b.new_label().0, "L0");
    }

    #[test]
    fn declaring_the_same_extern_twice_emits_it_once() {
        let mut b = Backend::new();
        b.declare_external("__add", "%HostValue", "ptr, %HostValue, %HostValue");
        b.declare_external("__add", "%HostValue", "ptr, %HostValue, %HostValue");
        let out = b.finalize();
        assert_eq!(out.matches("declare").count(), 1);
    }

    #[test]
    fn string_constants_get_distinct_globals() {
        let mut b = Backend::new();
        let a = b.new_string_constant("hello");
        let c = b.new_string_constant("world");
        assert_ne!(a.0, c.0);
        let out = b.finalize();
        assert!(out.contains("@.str.0"));
        assert!(out.contains("@.str.1"));
    }
}
