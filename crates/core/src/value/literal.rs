//! Parser for Python-style literal expressions (`['a', 'b']`, `{'k': True}`),
//! producing the JSON value the literal would encode to.
//!
//! Accepted: quoted strings (single, double, triple, `r`/`u` prefixes, adjacent
//! concatenation), integers that fit in 64 bits, finite floats, a single unary
//! sign on numbers, `True`/`False`/`None`, lists, tuples and dicts with scalar
//! keys. Sets, bytes, f-strings, complex numbers and bare names are rejected.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Containers nested deeper than this are rejected, matching `serde_json`.
pub const MAX_DEPTH: usize = 128;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected character `{ch}` at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("invalid numeric literal `{0}`")]
    InvalidNumber(String),
    #[error("integer literal `{0}` does not fit in 64 bits")]
    IntegerOverflow(String),
    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
    #[error("`{0}` literals cannot be encoded")]
    Unsupported(&'static str),
    #[error("name `{0}` is not a literal")]
    UnknownName(String),
    #[error("dict key at offset {0} is not a scalar")]
    UnhashableKey(usize),
    #[error("trailing input at offset {0}")]
    TrailingInput(usize),
    #[error("nesting deeper than 128 levels at offset {0}")]
    TooDeep(usize),
}

pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let trimmed = input.trim_start_matches([' ', '\t']);
    let mut parser = Parser { chars: trimmed.chars().collect(), pos: 0, depth: 0 };

    let value = parser.parse_top()?;
    parser.skip_ws();
    if parser.pos < parser.chars.len() {
        return Err(LiteralError::TrailingInput(parser.pos));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => Err(LiteralError::UnexpectedChar { ch, offset: self.pos - 1 }),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.pos += 1;
            } else if ch == '#' {
                while let Some(next) = self.peek() {
                    if next == '\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// A bare `a, b` at the top level is a tuple.
    fn parse_top(&mut self) -> Result<Value, LiteralError> {
        self.skip_ws();
        let first = self.parse_value()?;
        self.skip_ws();
        if self.peek() != Some(',') {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.peek() == Some(',') {
            self.pos += 1;
            self.skip_ws();
            if self.peek().is_none() {
                break;
            }
            items.push(self.parse_value()?);
            self.skip_ws();
        }
        Ok(Value::Array(items))
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        self.skip_ws();
        let ch = self.peek().ok_or(LiteralError::UnexpectedEnd)?;
        match ch {
            '[' | '(' | '{' => {
                if self.depth >= MAX_DEPTH {
                    return Err(LiteralError::TooDeep(self.pos));
                }
                self.depth += 1;
                let container = match ch {
                    '[' => {
                        self.pos += 1;
                        self.parse_sequence(']').map(Value::Array)
                    }
                    '(' => self.parse_parenthesized(),
                    _ => self.parse_braced(),
                };
                self.depth -= 1;
                container
            }
            '\'' | '"' => self.parse_strings(),
            '+' | '-' => self.parse_signed(),
            '0'..='9' => self.parse_number(false),
            '.' if self.peek_at(1).is_some_and(|next| next.is_ascii_digit()) => {
                self.parse_number(false)
            }
            c if c.is_alphabetic() || c == '_' => {
                if self.string_prefix_len().is_some() {
                    self.parse_strings()
                } else {
                    self.parse_name()
                }
            }
            other => Err(LiteralError::UnexpectedChar { ch: other, offset: self.pos }),
        }
    }

    /// Comma separated values up to `close`; the opening delimiter is already consumed.
    fn parse_sequence(&mut self, close: char) -> Result<Vec<Value>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(ch) if ch == close => return Ok(items),
                Some(ch) => return Err(LiteralError::UnexpectedChar { ch, offset: self.pos - 1 }),
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    fn parse_parenthesized(&mut self) -> Result<Value, LiteralError> {
        self.expect('(')?;
        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(Value::Array(Vec::new()));
        }

        let first = self.parse_value()?;
        self.skip_ws();
        match self.bump() {
            Some(')') => Ok(first),
            Some(',') => {
                let mut items = vec![first];
                items.extend(self.parse_sequence(')')?);
                Ok(Value::Array(items))
            }
            Some(ch) => Err(LiteralError::UnexpectedChar { ch, offset: self.pos - 1 }),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    fn parse_braced(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }

            let key_offset = self.pos;
            let key = self.parse_value()?;
            self.skip_ws();
            if self.peek() != Some(':') {
                return Err(LiteralError::Unsupported("set"));
            }
            self.pos += 1;
            let value = self.parse_value()?;
            map.insert(object_key(key, key_offset)?, value);

            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(ch) => return Err(LiteralError::UnexpectedChar { ch, offset: self.pos - 1 }),
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    fn parse_name(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_alphanumeric() || ch == '_') {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        match name.as_str() {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ => Err(LiteralError::UnknownName(name)),
        }
    }

    fn parse_signed(&mut self) -> Result<Value, LiteralError> {
        let negative = self.bump() == Some('-');
        self.skip_ws();
        match self.peek() {
            Some('0'..='9') => self.parse_number(negative),
            Some('.') if self.peek_at(1).is_some_and(|next| next.is_ascii_digit()) => {
                self.parse_number(negative)
            }
            Some(ch) => Err(LiteralError::UnexpectedChar { ch, offset: self.pos }),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    fn parse_number(&mut self, negative: bool) -> Result<Value, LiteralError> {
        let start = self.pos;
        let radix = match (self.peek(), self.peek_at(1).map(|ch| ch.to_ascii_lowercase())) {
            (Some('0'), Some('x')) => Some(16),
            (Some('0'), Some('o')) => Some(8),
            (Some('0'), Some('b')) => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
                self.pos += 1;
            }
            let digits: String =
                self.chars[digits_start..self.pos].iter().filter(|ch| **ch != '_').collect();
            let text: String = self.chars[start..self.pos].iter().collect();
            let magnitude = u128::from_str_radix(&digits, radix)
                .map_err(|_| LiteralError::InvalidNumber(text.clone()))?;
            return signed_integer(magnitude, negative, &text);
        }

        let mut is_float = false;
        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' | '_' => self.pos += 1,
                '.' => {
                    is_float = true;
                    self.pos += 1;
                }
                'e' | 'E' => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.pos += 1;
                    }
                }
                'j' | 'J' => return Err(LiteralError::Unsupported("complex")),
                _ => break,
            }
        }
        if self.peek().is_some_and(|ch| ch.is_alphabetic()) {
            let text: String = self.chars[start..=self.pos].iter().collect();
            return Err(LiteralError::InvalidNumber(text));
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        let digits: String = text.chars().filter(|ch| *ch != '_').collect();

        if is_float {
            let parsed =
                digits.parse::<f64>().map_err(|_| LiteralError::InvalidNumber(text.clone()))?;
            let signed = if negative { -parsed } else { parsed };
            return Number::from_f64(signed)
                .map(Value::Number)
                .ok_or(LiteralError::InvalidNumber(text));
        }

        if digits.len() > 1 && digits.starts_with('0') && digits.chars().any(|ch| ch != '0') {
            return Err(LiteralError::InvalidNumber(text));
        }
        let magnitude =
            digits.parse::<u128>().map_err(|_| LiteralError::IntegerOverflow(text.clone()))?;
        signed_integer(magnitude, negative, &text)
    }

    /// Length of a string prefix (`r`, `u`, `b`, `f`, ...) if a quote follows it.
    fn string_prefix_len(&self) -> Option<usize> {
        let mut len = 0;
        while len < 2 && self.peek_at(len).is_some_and(|ch| "rRuUbBfF".contains(ch)) {
            len += 1;
        }
        matches!(self.peek_at(len), Some('\'' | '"')).then_some(len)
    }

    fn parse_strings(&mut self) -> Result<Value, LiteralError> {
        let mut text = self.parse_string()?;
        loop {
            self.skip_ws();
            let next_is_string = matches!(self.peek(), Some('\'' | '"'))
                || (self.peek().is_some_and(char::is_alphabetic)
                    && self.string_prefix_len().is_some());
            if !next_is_string {
                return Ok(Value::String(text));
            }
            text.push_str(&self.parse_string()?);
        }
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let prefix_len = self.string_prefix_len().unwrap_or(0);
        let prefix: String = self.chars[self.pos..self.pos + prefix_len]
            .iter()
            .map(char::to_ascii_lowercase)
            .collect();
        if prefix.contains('b') {
            return Err(LiteralError::Unsupported("bytes"));
        }
        if prefix.contains('f') {
            return Err(LiteralError::Unsupported("f-string"));
        }
        let raw = prefix.contains('r');
        self.pos += prefix_len;

        let start = self.pos;
        let quote = self.bump().ok_or(LiteralError::UnexpectedEnd)?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let ch = self.bump().ok_or(LiteralError::UnterminatedString(start))?;
            if ch == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    return Ok(out);
                }
                out.push(ch);
                continue;
            }
            if ch == '\n' && !triple {
                return Err(LiteralError::UnterminatedString(start));
            }
            if ch != '\\' {
                out.push(ch);
                continue;
            }

            let escape_offset = self.pos - 1;
            let next = self.bump().ok_or(LiteralError::UnterminatedString(start))?;
            if raw {
                out.push('\\');
                out.push(next);
                continue;
            }
            match next {
                '\n' => {}
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                'a' => out.push('\u{07}'),
                'b' => out.push('\u{08}'),
                'f' => out.push('\u{0C}'),
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                'v' => out.push('\u{0B}'),
                '0'..='7' => {
                    let mut code = next.to_digit(8).unwrap_or(0);
                    for _ in 0..2 {
                        match self.peek().and_then(|ch| ch.to_digit(8)) {
                            Some(digit) => {
                                code = code * 8 + digit;
                                self.pos += 1;
                            }
                            None => break,
                        }
                    }
                    let decoded =
                        char::from_u32(code).ok_or(LiteralError::InvalidEscape(escape_offset))?;
                    out.push(decoded);
                }
                'x' => out.push(self.hex_escape(2, escape_offset)?),
                'u' => out.push(self.hex_escape(4, escape_offset)?),
                'U' => out.push(self.hex_escape(8, escape_offset)?),
                'N' => return Err(LiteralError::Unsupported("named unicode escape")),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }
    }

    fn hex_escape(&mut self, width: usize, offset: usize) -> Result<char, LiteralError> {
        let mut code = 0u32;
        for _ in 0..width {
            let digit = self
                .bump()
                .and_then(|ch| ch.to_digit(16))
                .ok_or(LiteralError::InvalidEscape(offset))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or(LiteralError::InvalidEscape(offset))
    }
}

fn signed_integer(magnitude: u128, negative: bool, text: &str) -> Result<Value, LiteralError> {
    if negative {
        if magnitude <= i64::MAX as u128 + 1 {
            let value = (magnitude as i128).wrapping_neg() as i64;
            return Ok(Value::from(value));
        }
    } else if magnitude <= u64::MAX as u128 {
        return Ok(Value::from(magnitude as u64));
    }
    Err(LiteralError::IntegerOverflow(text.to_string()))
}

/// Dict keys become strings the way a JSON encoder renders scalar keys.
fn object_key(key: Value, offset: usize) -> Result<String, LiteralError> {
    match key {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Array(_) | Value::Object(_) => Err(LiteralError::UnhashableKey(offset)),
    }
}
