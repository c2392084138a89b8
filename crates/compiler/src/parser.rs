//! Recursive-descent parser for the supported grammar subset (§4.2).
//!
//! Each non-terminal exposes a `parse_*` function returning "parsed node
//! or none" (`Option`) rather than throwing, mirroring spec.md's grammar
//! description and the teacher's own tokens-as-a-flat-`Vec` parser shape
//! (`parser.rs`'s `Parser { tokens, pos }`). Unlike the teacher's parser,
//! which never needs to track nested context (a flat stack language has
//! no `yield`/`await`/`in`/return` ambiguities), this parser threads a
//! `Context` flag set through an RAII guard — pushed on construction,
//! popped on `Drop` — the scoped-guard pattern the teacher applies to its
//! own scope stack in `codegen/control_flow.rs`.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Lexer, SourcePos, Token, TokenKind};
use crate::types::StaticType;

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    yield_ok: bool,
    await_ok: bool,
    in_ok: bool,
    return_ok: bool,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    src: String,
    ctx: Context,
}

/// RAII guard restoring the parser's context flags on drop, so a nested
/// parse that temporarily disables e.g. `in` (for `for`-loop headers)
/// can't forget to restore it on an early return.
struct ContextGuard<'p> {
    parser: &'p mut Parser,
    saved: Context,
}

impl<'p> ContextGuard<'p> {
    fn new(parser: &'p mut Parser, ctx: Context) -> Self {
        let saved = parser.ctx;
        parser.ctx = ctx;
        ContextGuard { parser, saved }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.parser.ctx = self.saved;
    }
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize().map_err(|e| ParseError::UnexpectedToken {
            pos: SourcePos::default(),
            found: "<lex error>".to_string(),
            message: e.to_string(),
        })?;
        Ok(Parser { tokens, pos: 0, src: source.to_string(), ctx: Context::default() })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn pos(&self) -> SourcePos {
        self.peek().pos
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Punctuator(s) if s == p)
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Keyword(s) if s == kw)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), ParseError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                pos: self.pos(),
                found: format!("{:?}", self.peek().kind),
                message: format!("expected {p:?}"),
            })
        }
    }

    fn ident_name(&mut self) -> Option<String> {
        match &self.peek().kind {
            TokenKind::Identifier(s) => {
                let s = s.clone();
                self.advance();
                Some(s)
            }
            _ => None,
        }
    }

    // ---- type annotations (§4.2 "Type annotations") ----

    fn parse_type_ann(&mut self) -> Result<Option<StaticType>, ParseError> {
        if !self.eat_punct(":") {
            return Ok(None);
        }
        let pos = self.pos();
        let name = self.ident_name().ok_or_else(|| ParseError::UnexpectedToken {
            pos,
            found: format!("{:?}", self.peek().kind),
            message: "expected type name".to_string(),
        })?;
        match StaticType::from_annotation(&name) {
            Some(t) => Ok(Some(t)),
            None => Err(ParseError::UnknownType { pos, name }),
        }
    }

    // ---- top level ----

    pub fn parse_program(&mut self) -> Program {
        let mut functions = Vec::new();
        loop {
            if matches!(self.peek().kind, TokenKind::Eof) {
                break;
            }
            if self.is_keyword("function") {
                match self.parse_function_decl() {
                    Ok(f) => functions.push(f),
                    Err(_) => {
                        self.advance();
                    }
                }
            } else {
                self.advance();
            }
        }
        Program { functions }
    }

    fn parse_function_decl(&mut self) -> Result<FunctionDecl, ParseError> {
        let start = self.pos();
        let start_idx = self.pos;
        self.eat_keyword("function");
        let name_pos = self.pos();
        let name = self.ident_name().ok_or(ParseError::UnexpectedToken {
            pos: name_pos,
            found: format!("{:?}", self.peek().kind),
            message: "expected function name".to_string(),
        })?;
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.is_punct(")") {
            let ppos = self.pos();
            let pname = self.ident_name().ok_or(ParseError::UnexpectedToken {
                pos: ppos,
                found: format!("{:?}", self.peek().kind),
                message: "expected parameter name".to_string(),
            })?;
            let type_ann = self.parse_type_ann()?;
            params.push(Param { name: pname, type_ann, pos: ppos });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        let return_type = self.parse_type_ann()?;
        let body = self.parse_block(Context { return_ok: true, ..self.ctx })?;
        let end_idx = self.pos;
        let source_text = self.slice_source(start_idx, end_idx);
        Ok(FunctionDecl { name, params, return_type, body, pos: start, source_text })
    }

    fn slice_source(&self, start_idx: usize, end_idx: usize) -> String {
        let start_pos = self.tokens[start_idx].pos;
        let end_pos =
            self.tokens.get(end_idx).map(|t| t.pos).unwrap_or(self.tokens.last().unwrap().pos);
        let lines: Vec<&str> = self.src.lines().collect();
        if start_pos.line == 0 || end_pos.line as usize > lines.len() {
            return self.src.clone();
        }
        let start_line = (start_pos.line - 1) as usize;
        let end_line = (end_pos.line.saturating_sub(1)) as usize;
        if start_line > end_line || end_line >= lines.len() {
            return self.src.clone();
        }
        lines[start_line..=end_line].join("\n")
    }

    // ---- statements (§3) ----

    fn parse_block(&mut self, ctx: Context) -> Result<Block, ParseError> {
        let _guard = ContextGuard::new(self, ctx);
        self.expect_punct("{")?;
        let mut statements = Vec::new();
        while !self.is_punct("}") && !matches!(self.peek().kind, TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        self.expect_punct("}")?;
        Ok(Block { statements })
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        if self.is_punct("{") {
            return Ok(Stmt::Block(self.parse_block(self.ctx)?));
        }
        if self.is_punct(";") {
            self.advance();
            return Ok(Stmt::Empty);
        }
        if self.is_keyword("var") || self.is_keyword("let") || self.is_keyword("const") {
            return self.parse_var_decl();
        }
        if self.is_keyword("if") {
            return self.parse_if();
        }
        if self.is_keyword("while") {
            return self.parse_while();
        }
        if self.is_keyword("do") {
            return self.parse_do_while();
        }
        if self.is_keyword("for") {
            return self.parse_for();
        }
        if self.is_keyword("return") {
            return self.parse_return();
        }
        if self.is_keyword("throw") {
            return self.parse_throw();
        }
        if self.is_keyword("break") {
            self.advance();
            self.eat_punct(";");
            return Ok(Stmt::Break);
        }
        if self.is_keyword("continue") {
            self.advance();
            self.eat_punct(";");
            return Ok(Stmt::Continue);
        }
        let expr = self.parse_expression()?;
        self.eat_punct(";");
        Ok(Stmt::Expr(expr))
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, ParseError> {
        let kind = if self.eat_keyword("var") {
            DeclKind::Var
        } else if self.eat_keyword("let") {
            DeclKind::Let
        } else {
            self.eat_keyword("const");
            DeclKind::Const
        };
        let mut declarators = Vec::new();
        loop {
            let pos = self.pos();
            let name = self.ident_name().ok_or(ParseError::UnexpectedToken {
                pos,
                found: format!("{:?}", self.peek().kind),
                message: "expected binding name".to_string(),
            })?;
            let type_ann = self.parse_type_ann()?;
            let init = if self.eat_punct("=") { Some(self.parse_assignment()?) } else { None };
            declarators.push(VarDeclarator { name, type_ann, init });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.eat_punct(";");
        Ok(Stmt::VarDecl { kind, declarators })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.eat_keyword("if");
        self.expect_punct("(")?;
        let cond = self.parse_expression()?;
        self.expect_punct(")")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat_keyword("else") {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If { cond, then_branch, else_branch })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.eat_keyword("while");
        self.expect_punct("(")?;
        let cond = self.parse_expression()?;
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While { cond, body })
    }

    fn parse_do_while(&mut self) -> Result<Stmt, ParseError> {
        self.eat_keyword("do");
        let body = Box::new(self.parse_statement()?);
        if !self.eat_keyword("while") {
            return Err(ParseError::UnexpectedToken {
                pos: self.pos(),
                found: format!("{:?}", self.peek().kind),
                message: "expected 'while' after do-block".to_string(),
            });
        }
        self.expect_punct("(")?;
        let cond = self.parse_expression()?;
        self.expect_punct(")")?;
        self.eat_punct(";");
        Ok(Stmt::DoWhile { body, cond })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.eat_keyword("for");
        self.expect_punct("(")?;
        let ctx_no_in = Context { in_ok: false, ..self.ctx };
        let init = if self.is_punct(";") {
            None
        } else if self.is_keyword("var") || self.is_keyword("let") || self.is_keyword("const") {
            let _guard = ContextGuard::new(self, ctx_no_in);
            Some(Box::new(self.parse_var_decl_no_semi()?))
        } else {
            let _guard = ContextGuard::new(self, ctx_no_in);
            let e = self.parse_expression()?;
            Some(Box::new(Stmt::Expr(e)))
        };
        self.expect_punct(";")?;
        let cond = if self.is_punct(";") { None } else { Some(self.parse_expression()?) };
        self.expect_punct(";")?;
        let update = if self.is_punct(")") { None } else { Some(self.parse_expression()?) };
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For { init, cond, update, body })
    }

    fn parse_var_decl_no_semi(&mut self) -> Result<Stmt, ParseError> {
        let kind = if self.eat_keyword("var") {
            DeclKind::Var
        } else if self.eat_keyword("let") {
            DeclKind::Let
        } else {
            self.eat_keyword("const");
            DeclKind::Const
        };
        let mut declarators = Vec::new();
        loop {
            let pos = self.pos();
            let name = self.ident_name().ok_or(ParseError::UnexpectedToken {
                pos,
                found: format!("{:?}", self.peek().kind),
                message: "expected binding name".to_string(),
            })?;
            let type_ann = self.parse_type_ann()?;
            let init = if self.eat_punct("=") { Some(self.parse_assignment()?) } else { None };
            declarators.push(VarDeclarator { name, type_ann, init });
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(Stmt::VarDecl { kind, declarators })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let pos = self.pos();
        if !self.ctx.return_ok {
            return Err(ParseError::ContextViolation { pos, name: "return".to_string() });
        }
        self.eat_keyword("return");
        if self.is_punct(";") || self.is_punct("}") {
            self.eat_punct(";");
            return Ok(Stmt::Return(None));
        }
        let expr = self.parse_expression()?;
        self.eat_punct(";");
        Ok(Stmt::Return(Some(expr)))
    }

    fn parse_throw(&mut self) -> Result<Stmt, ParseError> {
        self.eat_keyword("throw");
        let expr = self.parse_expression()?;
        self.eat_punct(";");
        Ok(Stmt::Throw(expr))
    }

    // ---- expressions (§4.2) ----

    /// Cover-grammar entry point: a comma expression inside parentheses is
    /// resolved to the plain expression form only — no arrow-parameter-
    /// list refinement is attempted (arrow functions are out of scope),
    /// so a top-level comma expression here simply evaluates to its last
    /// operand, same as the ordinary comma operator.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_assignment()?;
        if !self.is_punct(",") {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat_punct(",") {
            operands.push(self.parse_assignment()?);
        }
        Ok(Expr::Sequence(operands))
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_conditional()?;
        let op = match &self.peek().kind {
            TokenKind::Punctuator(p) => match p.as_str() {
                "=" => Some(AssignOp::Assign),
                "+=" => Some(AssignOp::AddAssign),
                "-=" => Some(AssignOp::SubAssign),
                "*=" => Some(AssignOp::MulAssign),
                "/=" => Some(AssignOp::DivAssign),
                "%=" => Some(AssignOp::RemAssign),
                "&&=" => Some(AssignOp::AndAssign),
                "||=" => Some(AssignOp::OrAssign),
                "??=" => Some(AssignOp::NullishAssign),
                _ => None,
            },
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let value = Box::new(self.parse_assignment()?);
                Ok(Expr::Assign { op, target: Box::new(lhs), value })
            }
            None => Ok(lhs),
        }
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_binary(0)?;
        if self.eat_punct("?") {
            let then_expr = Box::new(self.parse_assignment()?);
            self.expect_punct(":")?;
            let else_expr = Box::new(self.parse_assignment()?);
            Ok(Expr::Conditional { cond: Box::new(cond), then_expr, else_expr })
        } else {
            Ok(cond)
        }
    }

    fn binop_for(&self, p: &str) -> Option<(BinOp, u8, bool)> {
        // (opcode, precedence, right_associative)
        Some(match p {
            "??" => (BinOp::Nullish, 1, false),
            "||" => (BinOp::Or, 2, false),
            "&&" => (BinOp::And, 3, false),
            "|" => (BinOp::BitOr, 4, false),
            "^" => (BinOp::BitXor, 5, false),
            "&" => (BinOp::BitAnd, 6, false),
            "==" => (BinOp::Eq, 7, false),
            "!=" => (BinOp::Neq, 7, false),
            "===" => (BinOp::StrictEq, 7, false),
            "!==" => (BinOp::StrictNeq, 7, false),
            "<" => (BinOp::Lt, 8, false),
            "<=" => (BinOp::Lte, 8, false),
            ">" => (BinOp::Gt, 8, false),
            ">=" => (BinOp::Gte, 8, false),
            "in" if self.ctx.in_ok => return None,
            "<<" => (BinOp::LShift, 9, false),
            ">>" => (BinOp::RShift, 9, false),
            ">>>" => (BinOp::URShift, 9, false),
            "+" => (BinOp::Add, 10, false),
            "-" => (BinOp::Sub, 10, false),
            "*" => (BinOp::Mul, 11, false),
            "/" => (BinOp::Div, 11, false),
            "%" => (BinOp::Rem, 11, false),
            "**" => (BinOp::Pow, 12, true),
            _ => return None,
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let p = match &self.peek().kind {
                TokenKind::Punctuator(p) => p.clone(),
                _ => break,
            };
            let Some((op, prec, right_assoc)) = self.binop_for(&p) else { break };
            if prec < min_prec {
                break;
            }
            self.advance();
            let next_min = if right_assoc { prec } else { prec + 1 };
            let rhs = self.parse_binary(next_min)?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let unop = match &self.peek().kind {
            TokenKind::Punctuator(p) => match p.as_str() {
                "+" => Some(UnOp::Plus),
                "-" => Some(UnOp::Minus),
                "~" => Some(UnOp::BitNot),
                "!" => Some(UnOp::BoolNot),
                _ => None,
            },
            TokenKind::Keyword(k) if k == "typeof" => Some(UnOp::Typeof),
            TokenKind::Keyword(k) if k == "void" => Some(UnOp::Void),
            _ => None,
        };
        if let Some(op) = unop {
            self.advance();
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary { op, operand });
        }
        if self.is_punct("++") || self.is_punct("--") {
            let op = if self.is_punct("++") { UpdateOp::Inc } else { UpdateOp::Dec };
            self.advance();
            let target = Box::new(self.parse_unary()?);
            return Ok(Expr::Update { op, prefix: true, target });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_call_or_member(true)?;
        if self.is_punct("++") || self.is_punct("--") {
            let op = if self.is_punct("++") { UpdateOp::Inc } else { UpdateOp::Dec };
            self.advance();
            return Ok(Expr::Update { op, prefix: false, target: Box::new(expr) });
        }
        Ok(expr)
    }

    /// Member expression (optionally starting with `new`), then a
    /// left-recursive suffix chain of `.name`, `.#private`, `[expr]`, and
    /// (when `allow_call` is set) call-argument lists (§4.2).
    fn parse_call_or_member(&mut self, allow_call: bool) -> Result<Expr, ParseError> {
        let mut expr = if self.is_keyword("new") {
            self.advance();
            let callee = Box::new(self.parse_call_or_member(false)?);
            let args = if self.is_punct("(") { self.parse_arguments()? } else { Vec::new() };
            Expr::New { callee, args }
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat_punct(".") {
                if self.is_punct("#") {
                    self.advance();
                    let pos = self.pos();
                    let name = self.ident_name().ok_or(ParseError::UnexpectedToken {
                        pos,
                        found: format!("{:?}", self.peek().kind),
                        message: "expected private member name".to_string(),
                    })?;
                    expr = Expr::Member { object: Box::new(expr), property: MemberKey::Private(name) };
                } else {
                    let pos = self.pos();
                    let name = self.ident_name().ok_or(ParseError::UnexpectedToken {
                        pos,
                        found: format!("{:?}", self.peek().kind),
                        message: "expected member name".to_string(),
                    })?;
                    expr = Expr::Member { object: Box::new(expr), property: MemberKey::Name(name) };
                }
            } else if self.eat_punct("[") {
                let key = self.parse_expression()?;
                self.expect_punct("]")?;
                expr =
                    Expr::Member { object: Box::new(expr), property: MemberKey::Computed(Box::new(key)) };
            } else if allow_call && self.is_punct("(") {
                let args = self.parse_arguments()?;
                expr = Expr::Call { callee: Box::new(expr), args };
            } else if self.is_punct("?.") {
                self.advance();
                return Ok(Expr::Unsupported { what: "optional chaining" });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.is_punct(")") {
            args.push(self.parse_assignment()?);
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let pos = self.pos();
        match self.peek().kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(n)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenKind::Keyword(k) if k == "true" => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            TokenKind::Keyword(k) if k == "false" => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            TokenKind::Keyword(k) if k == "this" => {
                self.advance();
                Ok(Expr::This)
            }
            TokenKind::Keyword(k) if k == "null" => {
                self.advance();
                Ok(Expr::Unsupported { what: "null literal" })
            }
            TokenKind::Keyword(k) if k == "super" => {
                self.advance();
                Ok(Expr::Unsupported { what: "super" })
            }
            TokenKind::Keyword(k) if k == "class" => {
                self.advance();
                Ok(Expr::Unsupported { what: "class expression" })
            }
            TokenKind::Keyword(k) if k == "yield" => {
                self.advance();
                if !self.ctx.yield_ok {
                    return Err(ParseError::ContextViolation { pos, name: "yield".to_string() });
                }
                Ok(Expr::Unsupported { what: "yield" })
            }
            TokenKind::Keyword(k) if k == "await" => {
                self.advance();
                if !self.ctx.await_ok {
                    return Err(ParseError::ContextViolation { pos, name: "await".to_string() });
                }
                Ok(Expr::Unsupported { what: "await" })
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if name == "import" {
                    return Ok(Expr::Unsupported { what: "dynamic import" });
                }
                Ok(Expr::Ident(name))
            }
            TokenKind::Punctuator(p) if p == "(" => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            TokenKind::Punctuator(p) if p == "{" => {
                self.advance();
                let mut depth = 1;
                while depth > 0 && !matches!(self.peek().kind, TokenKind::Eof) {
                    if self.is_punct("{") {
                        depth += 1;
                    } else if self.is_punct("}") {
                        depth -= 1;
                    }
                    self.advance();
                }
                Ok(Expr::Unsupported { what: "object literal" })
            }
            TokenKind::Punctuator(p) if p == "[" => {
                self.advance();
                let mut depth = 1;
                while depth > 0 && !matches!(self.peek().kind, TokenKind::Eof) {
                    if self.is_punct("[") {
                        depth += 1;
                    } else if self.is_punct("]") {
                        depth -= 1;
                    }
                    self.advance();
                }
                Ok(Expr::Unsupported { what: "array literal" })
            }
            other => Err(ParseError::UnexpectedToken {
                pos,
                found: format!("{other:?}"),
                message: "expected expression".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one_fn(src: &str) -> FunctionDecl {
        let mut p = Parser::new(src).unwrap();
        let prog = p.parse_program();
        prog.functions.into_iter().next().expect("no function parsed")
    }

    #[test]
    fn parses_typed_function_signature() {
        let f = parse_one_fn("function add(a: int32, b: int32): int32 { return a + b; }");
        assert_eq!(f.name, "add");
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[0].type_ann, Some(StaticType::I32));
        assert_eq!(f.return_type, Some(StaticType::I32));
    }

    #[test]
    fn unrecognised_type_annotation_is_an_error() {
        let err = Parser::new("function f(a: weird) {}").unwrap().parse_function_decl();
        assert!(matches!(err, Err(ParseError::UnknownType { .. })));
    }

    #[test]
    fn parses_if_while_for_return() {
        let f = parse_one_fn(
            "function f(n: int32): int32 { \
             let total: int32 = 0; \
             for (let i: int32 = 0; i < n; i++) { total += i; } \
             if (total > 10) { return total; } else { return 0; } }",
        );
        assert_eq!(f.body.statements.len(), 3);
    }

    #[test]
    fn binary_precedence_respects_mul_over_add() {
        let f = parse_one_fn("function f(): int32 { return 1 + 2 * 3; }");
        match &f.body.statements[0] {
            Stmt::Return(Some(Expr::Binary { op: BinOp::Add, rhs, .. })) => {
                assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn pow_is_right_associative() {
        let f = parse_one_fn("function f(): float64 { return 2 ** 3 ** 2; }");
        match &f.body.statements[0] {
            Stmt::Return(Some(Expr::Binary { op: BinOp::Pow, rhs, .. })) => {
                assert!(matches!(**rhs, Expr::Binary { op: BinOp::Pow, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn member_and_call_chain() {
        let f = parse_one_fn("function f(o: object): any { return o.a.b(1, 2); }");
        match &f.body.statements[0] {
            Stmt::Return(Some(Expr::Call { callee, args })) => {
                assert_eq!(args.len(), 2);
                assert!(matches!(**callee, Expr::Member { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unsupported_constructs_resolve_to_placeholder_nodes() {
        let f = parse_one_fn("function f(): any { return null; }");
        match &f.body.statements[0] {
            Stmt::Return(Some(Expr::Unsupported { what })) => assert_eq!(*what, "null literal"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn return_outside_function_context_is_rejected() {
        let mut p = Parser::new("return 1;").unwrap();
        assert!(matches!(p.parse_statement(), Err(ParseError::ContextViolation { .. })));
    }

    #[test]
    fn comma_operator_keeps_every_operand() {
        let f = parse_one_fn("function f(a: int32, b: int32): int32 { return (a++, b++, a + b); }");
        match &f.body.statements[0] {
            Stmt::Return(Some(Expr::Sequence(operands))) => {
                assert_eq!(operands.len(), 3);
                assert!(matches!(operands[0], Expr::Update { prefix: false, .. }));
                assert!(matches!(operands[1], Expr::Update { prefix: false, .. }));
                assert!(matches!(operands[2], Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn a_single_assignment_expression_is_not_wrapped_in_a_sequence() {
        let f = parse_one_fn("function f(a: int32): int32 { return a = a + 1; }");
        assert!(matches!(f.body.statements[0], Stmt::Return(Some(Expr::Assign { .. }))));
    }

    #[test]
    fn for_update_comma_expression_keeps_every_operand() {
        let f = parse_one_fn(
            "function f(n: int32): int32 { let i: int32 = 0; let j: int32 = 0; \
             for (; i < n; i++, j++) {} return j; }",
        );
        match &f.body.statements[2] {
            Stmt::For { update: Some(Expr::Sequence(operands)), .. } => assert_eq!(operands.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
