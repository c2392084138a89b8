//! Tokeniser (§4.1 "Lexing"): source text to a `Token` stream plus
//! `SourcePos` diagnostics.
//!
//! Transliterated from the original engine's `Scanner`
//! (`jac::machine::parser::Scanner`, `scanner.h`): the same scan order
//! (numeric literal, then string literal, then punctuator, then
//! `/`-disambiguation between divide/comment, then identifier/keyword),
//! the same greedy-longest-match punctuator table, and the same
//! decimal/hex/octal/binary numeric-literal grammar. What changes is the
//! error-handling style: the original throws on a malformed token: this
//! scanner reports a [`LexError`] and stops, which is what drives the
//! "syntax error means fall back to the interpreter" behaviour in §7.

use crate::error::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourcePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Keyword(String),
    Number(f64),
    String(String),
    Punctuator(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: SourcePos,
}

const KEYWORDS: &[&str] = &[
    "function", "return", "if", "else", "while", "for", "break", "continue", "let", "const",
    "var", "true", "false", "null", "undefined", "new", "this", "typeof", "void", "in", "of",
    "yield", "await", "async", "class", "extends", "super", "throw", "try", "catch", "finally",
    "do", "switch", "case", "default", "delete", "instanceof",
];

/// Longest-match first, mirroring `scanPunctuator`'s greedy table in the
/// original scanner: a 3-char punctuator must be tried before its 2-char
/// and 1-char prefixes, or e.g. `===` would scan as `==` followed by `=`.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "===", "!==", "**=", "<<=", ">>=", ">>>", "...", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "#",
];

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src: src.as_bytes(), pos: 0, line: 1, col: 1 }
    }

    fn here(&self) -> SourcePos {
        SourcePos { line: self.line, column: self.col }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.here();
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(c) = self.peek() {
                        if c == b'*' && self.peek_at(1) == Some(b'/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        return Err(LexError::UnterminatedComment { pos: start });
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn scan_numeric(&mut self) -> Result<Option<Token>, LexError> {
        let start = self.here();
        let c = match self.peek() {
            Some(c) if c.is_ascii_digit() => c,
            Some(b'.') if matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) => b'.',
            _ => return Ok(None),
        };

        let mut text = String::new();

        if c == b'0' && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            text.push(self.advance().unwrap() as char);
            text.push(self.advance().unwrap() as char);
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit() || c == b'_') {
                text.push(self.advance().unwrap() as char);
            }
            let digits: String = text[2..].chars().filter(|c| *c != '_').collect();
            let value = i64::from_str_radix(&digits, 16)
                .map_err(|e| LexError::BadNumericLiteral { pos: start, message: e.to_string() })?;
            return Ok(Some(Token { kind: TokenKind::Number(value as f64), pos: start }));
        }
        if c == b'0' && matches!(self.peek_at(1), Some(b'o') | Some(b'O')) {
            text.push(self.advance().unwrap() as char);
            text.push(self.advance().unwrap() as char);
            while matches!(self.peek(), Some(c) if (b'0'..=b'7').contains(&c) || c == b'_') {
                text.push(self.advance().unwrap() as char);
            }
            let digits: String = text[2..].chars().filter(|c| *c != '_').collect();
            let value = i64::from_str_radix(&digits, 8)
                .map_err(|e| LexError::BadNumericLiteral { pos: start, message: e.to_string() })?;
            return Ok(Some(Token { kind: TokenKind::Number(value as f64), pos: start }));
        }
        if c == b'0' && matches!(self.peek_at(1), Some(b'b') | Some(b'B')) {
            text.push(self.advance().unwrap() as char);
            text.push(self.advance().unwrap() as char);
            while matches!(self.peek(), Some(b'0') | Some(b'1') | Some(b'_')) {
                text.push(self.advance().unwrap() as char);
            }
            let digits: String = text[2..].chars().filter(|c| *c != '_').collect();
            let value = i64::from_str_radix(&digits, 2)
                .map_err(|e| LexError::BadNumericLiteral { pos: start, message: e.to_string() })?;
            return Ok(Some(Token { kind: TokenKind::Number(value as f64), pos: start }));
        }

        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'_') {
            text.push(self.advance().unwrap() as char);
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) {
            text.push(self.advance().unwrap() as char);
            while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'_') {
                text.push(self.advance().unwrap() as char);
            }
        } else if self.peek() == Some(b'.') && text.starts_with('.') {
            text.push(self.advance().unwrap() as char);
            while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'_') {
                text.push(self.advance().unwrap() as char);
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            text.push(self.advance().unwrap() as char);
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                text.push(self.advance().unwrap() as char);
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap() as char);
            }
        }

        let clean: String = text.chars().filter(|c| *c != '_').collect();
        let value = clean
            .parse::<f64>()
            .map_err(|e| LexError::BadNumericLiteral { pos: start, message: e.to_string() })?;
        Ok(Some(Token { kind: TokenKind::Number(value), pos: start }))
    }

    fn scan_string(&mut self) -> Result<Option<Token>, LexError> {
        let quote = match self.peek() {
            Some(c @ (b'"' | b'\'')) => c,
            _ => return Ok(None),
        };
        let start = self.here();
        self.advance();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::UnterminatedString { pos: start }),
                Some(b'\n') => return Err(LexError::UnterminatedString { pos: start }),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    match self.advance() {
                        Some(b'b') => out.push('\u{0008}'),
                        Some(b'f') => out.push('\u{000C}'),
                        Some(b'n') => out.push('\n'),
                        Some(b'r') => out.push('\r'),
                        Some(b't') => out.push('\t'),
                        Some(b'v') => out.push('\u{000B}'),
                        Some(b'0') => out.push('\0'),
                        Some(b'\\') => out.push('\\'),
                        Some(c) if c == quote => out.push(c as char),
                        Some(c) => out.push(c as char),
                        None => return Err(LexError::UnterminatedString { pos: start }),
                    }
                }
                Some(c) => {
                    out.push(c as char);
                    self.advance();
                }
            }
        }
        Ok(Some(Token { kind: TokenKind::String(out), pos: start }))
    }

    fn scan_punctuator(&mut self) -> Option<Token> {
        let start = self.here();
        let remaining = &self.src[self.pos..];
        for p in PUNCTUATORS {
            let bytes = p.as_bytes();
            if remaining.starts_with(bytes) {
                for _ in 0..bytes.len() {
                    self.advance();
                }
                return Some(Token { kind: TokenKind::Punctuator((*p).to_string()), pos: start });
            }
        }
        None
    }

    fn scan_identifier(&mut self) -> Option<Token> {
        let start = self.here();
        let is_start = |c: u8| c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c == b'#';
        let is_cont = |c: u8| c.is_ascii_alphanumeric() || c == b'_' || c == b'$';
        match self.peek() {
            Some(c) if is_start(c) => {}
            _ => return None,
        }
        let mut name = String::new();
        name.push(self.advance().unwrap() as char);
        while matches!(self.peek(), Some(c) if is_cont(c)) {
            name.push(self.advance().unwrap() as char);
        }
        let kind = if KEYWORDS.contains(&name.as_str()) {
            TokenKind::Keyword(name)
        } else {
            TokenKind::Identifier(name)
        };
        Some(Token { kind, pos: start })
    }

    /// Mirrors the original `Scanner::scanToken` dispatch order: numeric,
    /// then string, then punctuator (which also handles `/` as an
    /// operator once the comment cases have been skipped), then
    /// identifier.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments()?;
        let pos = self.here();
        if self.peek().is_none() {
            return Ok(Token { kind: TokenKind::Eof, pos });
        }
        if let Some(tok) = self.scan_numeric()? {
            return Ok(tok);
        }
        if let Some(tok) = self.scan_string()? {
            return Ok(tok);
        }
        if let Some(tok) = self.scan_identifier() {
            return Ok(tok);
        }
        if let Some(tok) = self.scan_punctuator() {
            return Ok(tok);
        }
        Err(LexError::InvalidToken { pos })
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut out = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            out.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_keywords_and_identifiers() {
        assert_eq!(
            kinds("function foo"),
            vec![
                TokenKind::Keyword("function".into()),
                TokenKind::Identifier("foo".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_decimal_and_hex_numbers() {
        assert_eq!(kinds("42"), vec![TokenKind::Number(42.0), TokenKind::Eof]);
        assert_eq!(kinds("0x2A"), vec![TokenKind::Number(42.0), TokenKind::Eof]);
        assert_eq!(kinds("3.5"), vec![TokenKind::Number(3.5), TokenKind::Eof]);
    }

    #[test]
    fn scans_string_with_escapes() {
        assert_eq!(
            kinds(r#""a\nb""#),
            vec![TokenKind::String("a\nb".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn scans_every_escape_in_the_documented_set() {
        assert_eq!(
            kinds(r#""\b\f\n\r\t\v\0\'\"\\""#),
            vec![
                TokenKind::String("\u{0008}\u{000C}\n\r\t\u{000B}\0\'\"\\".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn greedy_punctuator_match_prefers_longest() {
        assert_eq!(
            kinds("==="),
            vec![TokenKind::Punctuator("===".into()), TokenKind::Eof]
        );
        assert_eq!(
            kinds(">>>="),
            vec![TokenKind::Punctuator(">>>=".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn skips_line_and_block_comments() {
        assert_eq!(
            kinds("1 // comment\n2 /* block */ 3"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(2.0),
                TokenKind::Number(3.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = Lexer::new("/* abc").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedComment { .. }));
    }

    #[test]
    fn invalid_token_is_reported_with_position() {
        let err = Lexer::new("  @").tokenize().unwrap_err();
        match err {
            LexError::InvalidToken { pos } => assert_eq!(pos, SourcePos { line: 1, column: 3 }),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
