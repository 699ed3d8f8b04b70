// src/parser.rs
use crate::errors::ParseError;
use serde_json::Value;

/// Deepest syntax tree one expression may build.
pub const MAX_DEPTH: usize = 256;

/// Character cursor shared by the expression and template parsers.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self::at(s, 0)
    }

    pub fn at(s: &'a str, i: usize) -> Self {
        Self { s, i, depth: 0 }
    }

    pub fn pos(&self) -> usize {
        self.i
    }

    pub fn rewind(&mut self, pos: usize) {
        self.i = pos;
    }

    /// Account for `levels` more tree depth below the current node.
    pub fn descend(&mut self, levels: usize) -> Result<(), ParseError> {
        self.depth += levels;
        if self.depth > MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        Ok(())
    }

    pub fn ascend(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    pub fn rest(&self) -> &'a str {
        &self.s[self.i..]
    }

    pub fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::syntax(msg, self.i)
    }

    pub fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let start = self.i;
        match self.peek_char() {
            Some(c) if c == '_' || c == '$' || c.is_alphabetic() => self.i += c.len_utf8(),
            _ => return Err(self.error("identifier expected")),
        }
        while let Some(c) = self.peek_char() {
            if c == '_' || c == '$' || c.is_alphanumeric() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
        Ok(self.s[start..self.i].to_string())
    }

    /// Unsigned integer or decimal literal; the sign is handled as a unary operator.
    pub fn parse_number_literal(&mut self) -> Result<Value, ParseError> {
        self.parse_signed_number(false)
    }

    /// Integer or decimal literal whose `-` was already consumed when `negative`.
    /// Integers may carry an `L` suffix.
    pub fn parse_signed_number(&mut self, negative: bool) -> Result<Value, ParseError> {
        let start = self.i;
        self.skip_digits();
        let mut is_float = false;
        if self.peek_char() == Some('.') && self.char_after(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.i += 1;
            self.skip_digits();
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let save = self.i;
            self.i += 1;
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.i += 1;
            }
            if self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.skip_digits();
            } else {
                self.i = save;
            }
        }
        let s = &self.s[start..self.i];
        if s.is_empty() {
            return Err(self.error("number expected"));
        }
        if is_float {
            let f: f64 = s
                .parse()
                .map_err(|_| ParseError::syntax("bad float", start))?;
            return Ok(Value::from(if negative { -f } else { f }));
        }
        let signed = if negative { format!("-{s}") } else { s.to_string() };
        let i: i64 = signed
            .parse()
            .map_err(|_| ParseError::syntax("integer literal out of range", start))?;
        if matches!(self.peek_char(), Some('L' | 'l')) {
            self.i += 1;
        }
        Ok(Value::from(i))
    }

    fn skip_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
    }

    /// Quoted string; a doubled quote or a backslash escapes the quote character.
    pub fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        let start = self.i;
        let quote = self
            .peek_char()
            .ok_or_else(|| self.error("string expected"))?;
        if quote != '\'' && quote != '"' {
            return Err(self.error("expected quoted string"));
        }
        self.i += 1;
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            if c == quote {
                if self.peek_char() == Some(quote) {
                    self.i += 1;
                    out.push(quote);
                    continue;
                }
                return Ok(out);
            }
            if c == '\\' {
                if let Some(nc) = self.peek_char() {
                    self.i += nc.len_utf8();
                    match nc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '\\' => out.push('\\'),
                        '"' => out.push('"'),
                        '\'' => out.push('\''),
                        _ => {
                            out.push('\\');
                            out.push(nc);
                        }
                    }
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        Err(ParseError::syntax("unterminated string", start))
    }

    pub fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn consume_str(&mut self, lit: &str) -> bool {
        if self.peek_str(lit) {
            self.i += lit.len();
            true
        } else {
            false
        }
    }

    /// Case-insensitive word match that does not run into a following identifier character.
    pub fn consume_keyword(&mut self, word: &str) -> bool {
        let rest = self.rest();
        let Some(head) = rest.get(..word.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(word) {
            return false;
        }
        let boundary = rest[word.len()..]
            .chars()
            .next()
            .map_or(true, |c| !(c == '_' || c == '$' || c.is_alphanumeric()));
        if boundary {
            self.i += word.len();
        }
        boundary
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn char_after(&self, n: usize) -> Option<char> {
        self.s[self.i..].chars().nth(n)
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}
