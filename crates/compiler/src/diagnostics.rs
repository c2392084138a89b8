//! Recoverable-diagnostic data model (SPEC_FULL §3.1), grounded in the
//! teacher's `LintDiagnostic`/`Severity` pair: a plain data record a stage
//! pushes onto a caller-supplied sink in addition to (not instead of)
//! returning its primary `Result`. Nothing here changes fallback
//! behaviour — a stage that can't proceed still returns an error from
//! `error.rs`; this is purely for tooling (`--dump-cfg`, tests) that wants
//! to see what a stage noticed along the way.
//!
//! [`crate::host::evaluate_with_diagnostics`] is the one place that
//! actually pushes onto a sink: when the compile path fails, it turns the
//! `CompileError` into a [`Diagnostic`] (position when the failing stage
//! had one, `0:0` otherwise) before falling back to the interpreter, so a
//! host that wants to surface *why* a function didn't compile has
//! somewhere to look without parsing `tracing` output.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(line: u32, column: u32, message: impl Into<String>, severity: Severity) -> Self {
        Diagnostic { line, column, message: message.into(), severity }
    }

    pub fn warning(line: u32, column: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(line, column, message, Severity::Warning)
    }

    pub fn error(line: u32, column: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(line, column, message, Severity::Error)
    }

    /// Builds the diagnostic a failed compile path reports to the host's
    /// sink: always `Severity::Error` (a compile failure is never merely a
    /// warning, even though it's recoverable at the whole-`eval` level via
    /// fallback), at the failing stage's position when it tracked one.
    pub fn from_compile_error(err: &crate::error::CompileError) -> Self {
        let pos = err.position().unwrap_or(crate::lexer::SourcePos { line: 0, column: 0 });
        Diagnostic::error(pos.line, pos.column, err.to_string())
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}:{}: {kind}: {}", self.line, self.column, self.message)
    }
}

/// A sink diagnostics are pushed onto. A plain `Vec<Diagnostic>` already
/// satisfies this trait (see `impl` below); it exists so pipeline stages
/// can take `&mut impl DiagnosticSink` instead of a concrete `Vec`,
/// matching the "caller-supplied sink" wording in SPEC_FULL §3.1.
pub trait DiagnosticSink {
    fn push(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn push(&mut self, diagnostic: Diagnostic) {
        Vec::push(self, diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_line_column_kind_message() {
        let d = Diagnostic::warning(3, 7, "fell back to the interpreter");
        assert_eq!(d.to_string(), "3:7: warning: fell back to the interpreter");
    }

    #[test]
    fn a_plain_vec_is_a_sink() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        sink.push(Diagnostic::error(1, 1, "bad"));
        assert_eq!(sink.len(), 1);
    }
}
