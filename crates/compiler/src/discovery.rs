//! Function discovery (§4.3): a post-order walk over the parsed
//! [`Program`] collecting every top-level function declaration whose
//! signature is fully typed.
//!
//! Grounded in the teacher's single-pass `Program::find_word` /
//! `validate_word_calls` traversal style: one pass over a flat top-level
//! list, no AST-wide visitor trait, because the grammar subset here (like
//! the teacher's own word list) only ever nests function declarations one
//! level deep — there is no construct in §4.2 that declares a function
//! inside another and hoists it to top level.

use crate::ast::{FunctionDecl, Program};
use crate::error::DiscoveryError;

/// A function whose every parameter and return type was annotated with a
/// recognised name. Partial annotation is not an error — the spec treats
/// it as "not collected" (§4.3) — so this module surfaces only the
/// unambiguous failure mode: two declarations claiming the same name.
#[derive(Debug, Clone)]
pub struct DiscoveredFunction<'a> {
    pub decl: &'a FunctionDecl,
}

pub fn discover(program: &Program) -> Result<Vec<DiscoveredFunction<'_>>, DiscoveryError> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for decl in &program.functions {
        if !is_fully_typed(decl) {
            continue;
        }
        if !seen.insert(decl.name.clone()) {
            return Err(DiscoveryError::DuplicateFunction { name: decl.name.clone() });
        }
        out.push(DiscoveredFunction { decl });
    }
    Ok(out)
}

fn is_fully_typed(decl: &FunctionDecl) -> bool {
    decl.return_type.is_some() && decl.params.iter().all(|p| p.type_ann.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn parse(src: &str) -> Program {
        Parser::new(src).unwrap().parse_program()
    }

    #[test]
    fn collects_fully_typed_function() {
        let program = parse("function add(a: int32, b: int32): int32 { return a + b; }");
        let found = discover(&program).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].decl.name, "add");
    }

    #[test]
    fn skips_partially_annotated_function() {
        let program = parse("function add(a: int32, b) : int32 { return a; }");
        let found = discover(&program).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn skips_function_missing_return_type() {
        let program = parse("function add(a: int32, b: int32) { return a; }");
        let found = discover(&program).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn duplicate_top_level_names_are_rejected() {
        let program = parse(
            "function f(a: int32): int32 { return a; } \
             function f(a: int32): int32 { return a; }",
        );
        assert!(matches!(discover(&program), Err(DiscoveryError::DuplicateFunction { .. })));
    }

    #[test]
    fn records_source_text_slice_for_rewriter() {
        let program = parse("function f(a: int32): int32 { return a; }");
        let found = discover(&program).unwrap();
        assert!(found[0].decl.source_text.starts_with("function"));
        assert!(found[0].decl.source_text.trim_end().ends_with('}'));
    }
}
