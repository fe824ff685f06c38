//! Parser for the qualified-id syntax of signal expressions.
//!
//! Recursive descent over:
//!
//! ```text
//! expr     := ident literals? signals? select?
//! literals := '<' (ident '=' literal (',' ident '=' literal)*)? '>'
//! signals  := '(' (ident '=' expr (',' ident '=' expr)*)? ')'
//! select   := '[' ident ']'
//! literal  := '"' chars '"' | bare-token
//! ```
//!
//! Bare tokens are classified as int, float, bool or text. Whitespace between
//! tokens is ignored, so hand-written expressions may be spaced out.

use crate::domain::error::ParseError;
use crate::domain::signal_expr::{Arg, Literal, SignalExpr};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(|c| format!("'{c}'"))
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error(format!("expected '{}', found {}", expected, self.found()))),
        }
    }

    fn consume_char(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_ident(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error(format!("expected identifier, found {}", self.found())));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_quoted(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.expect_char('"')?;
        let mut out = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(out),
                Some('\\') => match self.advance() {
                    Some(ch) => out.push(ch),
                    None => break,
                },
                Some(ch) => out.push(ch),
                None => break,
            }
        }
        Err(ParseError {
            message: "unterminated string literal".into(),
            position: start,
        })
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        self.skip_whitespace();
        if self.peek() == Some('"') {
            return self.parse_quoted().map(Literal::Text);
        }
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if Literal::is_bare_char(ch) {
                self.advance();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error(format!("expected literal value, found {}", self.found())));
        }
        Ok(Literal::classify(&self.input[start..self.pos]))
    }

    /// Comma-separated `name=value` list up to `close`.
    fn parse_group<F>(&mut self, close: char, expr: &mut SignalExpr, mut value: F) -> Result<(), ParseError>
    where
        F: FnMut(&mut Self) -> Result<Arg, ParseError>,
    {
        if self.consume_char(close) {
            return Ok(());
        }
        loop {
            self.skip_whitespace();
            let name_pos = self.pos;
            let name = self.parse_ident()?;
            self.expect_char('=')?;
            let arg = value(self)?;
            if expr.args.insert(name.clone(), arg).is_some() {
                return Err(ParseError {
                    message: format!("duplicate argument '{name}'"),
                    position: name_pos,
                });
            }
            if self.consume_char(',') {
                continue;
            }
            self.expect_char(close)?;
            return Ok(());
        }
    }

    fn parse_expr(&mut self) -> Result<SignalExpr, ParseError> {
        let id = self.parse_ident()?;
        let mut expr = SignalExpr::new(id);

        if self.consume_char('<') {
            self.parse_group('>', &mut expr, |p| p.parse_literal().map(Arg::Value))?;
        }
        if self.consume_char('(') {
            self.parse_group(')', &mut expr, |p| p.parse_expr().map(Arg::Signal))?;
        }
        if self.consume_char('[') {
            let field = self.parse_ident()?;
            self.expect_char(']')?;
            expr.select = Some(field);
        }
        Ok(expr)
    }
}

/// Parse a qualified id back into an expression tree.
pub fn parse_expr(input: &str) -> Result<SignalExpr, ParseError> {
    let mut parser = Parser::new(input);
    let expr = parser.parse_expr()?;
    parser.skip_whitespace();
    if parser.pos != input.len() {
        return Err(parser.error(format!("unexpected trailing input {}", parser.found())));
    }
    Ok(expr)
}

/// Parse a `;`-separated list of expressions, as given on the command line.
pub fn parse_expr_list(input: &str) -> Result<Vec<SignalExpr>, ParseError> {
    parse_expr_list_with(input, ';')
}

/// Parse a list of expressions separated by `separator`. Separators inside
/// quoted literals belong to the literal; empty entries are skipped.
pub fn parse_expr_list_with(input: &str, separator: char) -> Result<Vec<SignalExpr>, ParseError> {
    let mut parser = Parser::new(input);
    let mut out = Vec::new();
    loop {
        if parser.consume_char(separator) {
            continue;
        }
        parser.skip_whitespace();
        if parser.pos == input.len() {
            return Ok(out);
        }
        out.push(parser.parse_expr()?);
        parser.skip_whitespace();
        if parser.pos != input.len() && !parser.consume_char(separator) {
            return Err(parser.error(format!(
                "expected '{separator}' between expressions, found {}",
                parser.found()
            )));
        }
    }
}
