// ABOUTME: Single-pass JSON tokenizer with peek/consume discipline over a UTF-8 string.
// ABOUTME: Zero-copy string fast path, negative-accumulating integer scan, and bracket-matching skip.

#![allow(clippy::missing_errors_doc)]

use super::config::Hint;
use super::path::JsonPath;
use crate::error::{minify, Error, Result};
use std::borrow::Cow;

/// Token classes the decoders branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    BeginObject,
    EndObject,
    BeginList,
    EndList,
    Comma,
    Colon,
    String,
    /// Numbers, literals and unquoted lenient strings.
    Other,
    Eof,
    Invalid,
}

impl Token {
    fn describe(self) -> &'static str {
        match self {
            Token::BeginObject => "start of the object '{'",
            Token::EndObject => "end of the object '}'",
            Token::BeginList => "start of the array '['",
            Token::EndList => "end of the array ']'",
            Token::Comma => "comma ','",
            Token::Colon => "colon ':'",
            Token::String => "quotation mark '\"'",
            Token::Other => "valid token",
            Token::Eof => "end of the input",
            Token::Invalid => "valid token",
        }
    }
}

#[inline]
fn classify(byte: u8) -> Token {
    match byte {
        b'{' => Token::BeginObject,
        b'}' => Token::EndObject,
        b'[' => Token::BeginList,
        b']' => Token::EndList,
        b',' => Token::Comma,
        b':' => Token::Colon,
        b'"' => Token::String,
        0x00..=0x1f => Token::Invalid,
        _ => Token::Other,
    }
}

#[inline]
fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\n' | b'\r' | b'\t')
}

/// Bytes that may continue an unquoted token.
#[inline]
fn is_token_byte(byte: u8) -> bool {
    !is_whitespace(byte) && classify(byte) == Token::Other
}

/// Tokenizer state. Offsets are byte offsets into the input.
pub(crate) struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    lenient: bool,
    pub(crate) path: JsonPath,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str, lenient: bool) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            lenient,
            path: JsonPath::new(),
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    // =========================================================================
    // Failures
    // =========================================================================

    pub(crate) fn fail(&self, message: impl Into<String>) -> Error {
        self.fail_at(message, self.pos, None)
    }

    pub(crate) fn fail_at(&self, message: impl Into<String>, position: usize, hint: Option<Hint>) -> Error {
        Error::JsonDecoding {
            message: message.into(),
            offset: Some(position),
            path: Some(self.path.render()),
            hint: hint.map(|h| h.message().to_owned()),
            input: Some(minify(self.input, Some(position))),
        }
    }

    pub(crate) fn invalid_trailing_comma(&self, entity: &str) -> Error {
        self.fail_at(
            format!("Trailing comma before the end of JSON {entity}"),
            self.pos.saturating_sub(1),
            Some(Hint::TrailingComma),
        )
    }

    fn describe_at(&self, position: usize) -> String {
        if position >= self.bytes.len() {
            return "EOF".to_owned();
        }
        self.input[position..]
            .chars()
            .next()
            .map_or_else(|| "EOF".to_owned(), |c| c.to_string())
    }

    /// Failure for a position where a value was expected but a separator or
    /// closer was found.
    pub(crate) fn unexpected_value_token(&mut self) -> Error {
        let position = self.skip_whitespace();
        self.fail_at(
            format!(
                "Cannot read Json element because of unexpected '{}'",
                self.describe_at(position)
            ),
            position,
            None,
        )
    }

    fn unexpected(&self, expected: Token, position: usize) -> Error {
        let found = self.describe_at(position);
        let hint = (expected == Token::String && self.peek_class(position) == Token::Other).then_some(Hint::Lenient);
        self.fail_at(
            format!("Expected {}, but had '{found}' instead", expected.describe()),
            position,
            hint,
        )
    }

    // =========================================================================
    // Token peeking and consumption
    // =========================================================================

    /// Advances past whitespace and returns the new position.
    #[inline]
    pub(crate) fn skip_whitespace(&mut self) -> usize {
        while self.pos < self.bytes.len() && is_whitespace(self.bytes[self.pos]) {
            self.pos += 1;
        }
        self.pos
    }

    fn peek_class(&self, position: usize) -> Token {
        self.bytes.get(position).map_or(Token::Eof, |&b| classify(b))
    }

    pub(crate) fn peek_next_token(&mut self) -> Token {
        let position = self.skip_whitespace();
        self.peek_class(position)
    }

    /// Consumes one structural token and returns its class. Strings and other
    /// tokens are not consumed; use the dedicated methods.
    pub(crate) fn consume_next_token(&mut self) -> Token {
        let token = self.peek_next_token();
        if matches!(
            token,
            Token::BeginObject | Token::EndObject | Token::BeginList | Token::EndList | Token::Comma | Token::Colon
        ) {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn consume_token(&mut self, expected: Token) -> Result<()> {
        let position = self.skip_whitespace();
        if self.peek_class(position) != expected {
            return Err(self.unexpected(expected, position));
        }
        self.pos += 1;
        Ok(())
    }

    pub(crate) fn try_consume_comma(&mut self) -> bool {
        if self.peek_next_token() == Token::Comma {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// True when a value (not a separator or closer) follows.
    pub(crate) fn can_consume_value(&mut self) -> bool {
        matches!(
            self.peek_next_token(),
            Token::BeginObject | Token::BeginList | Token::String | Token::Other
        )
    }

    /// True when the bare literal `null` follows; consumes it when `consume`.
    pub(crate) fn try_consume_null(&mut self, consume: bool) -> bool {
        let start = self.skip_whitespace();
        let end = start + 4;
        let matches = self.bytes.get(start..end) == Some(b"null".as_slice())
            && !self.bytes.get(end).is_some_and(|&b| is_token_byte(b));
        if matches && consume {
            self.pos = end;
        }
        matches
    }

    pub(crate) fn consume_null(&mut self) -> Result<()> {
        if self.try_consume_null(true) {
            Ok(())
        } else {
            let position = self.pos;
            Err(self.fail_at(
                format!("Expected 'null' literal, but had '{}' instead", self.describe_at(position)),
                position,
                None,
            ))
        }
    }

    pub(crate) fn expect_eof(&mut self) -> Result<()> {
        let position = self.skip_whitespace();
        if position == self.bytes.len() {
            return Ok(());
        }
        Err(self.fail_at(
            format!(
                "Expected EOF after parsing, but had '{}' instead",
                self.describe_at(position)
            ),
            position,
            None,
        ))
    }

    // =========================================================================
    // Strings
    // =========================================================================

    /// Reads an object key. Keys must be quoted unless the lexer is lenient.
    pub(crate) fn consume_key_string(&mut self) -> Result<Cow<'a, str>> {
        if self.lenient {
            self.consume_string_lenient()
        } else {
            self.consume_string()
        }
    }

    /// Reads a quoted string.
    pub(crate) fn consume_string(&mut self) -> Result<Cow<'a, str>> {
        let position = self.skip_whitespace();
        if self.peek_class(position) != Token::String {
            return Err(self.unexpected(Token::String, position));
        }
        self.read_quoted(position + 1)
    }

    /// Reads a quoted string or an unquoted token such as a number or literal.
    pub(crate) fn consume_string_lenient(&mut self) -> Result<Cow<'a, str>> {
        self.consume_literal().map(|(content, _)| content)
    }

    /// Like [`consume_string_lenient`](Self::consume_string_lenient), also
    /// reporting whether the token was quoted.
    pub(crate) fn consume_literal(&mut self) -> Result<(Cow<'a, str>, bool)> {
        let position = self.skip_whitespace();
        match self.peek_class(position) {
            Token::String => Ok((self.read_quoted(position + 1)?, true)),
            Token::Other => {
                let mut end = position;
                while end < self.bytes.len() && is_token_byte(self.bytes[end]) {
                    end += 1;
                }
                self.pos = end;
                Ok((Cow::Borrowed(&self.input[position..end]), false))
            }
            _ => Err(self.fail_at(
                format!(
                    "Expected beginning of the string, but got {}",
                    self.describe_at(position)
                ),
                position,
                None,
            )),
        }
    }

    /// Scans from just past the opening quote. Escape-free strings are
    /// returned as a borrowed slice.
    fn read_quoted(&mut self, start: usize) -> Result<Cow<'a, str>> {
        match memchr::memchr2(b'"', b'\\', &self.bytes[start..]) {
            Some(offset) if self.bytes[start + offset] == b'"' => {
                let end = start + offset;
                self.pos = end + 1;
                Ok(Cow::Borrowed(&self.input[start..end]))
            }
            Some(offset) => self.read_escaped(start, start + offset).map(Cow::Owned),
            None => Err(self.fail_at("Unexpected EOF during string", self.bytes.len(), None)),
        }
    }

    fn read_escaped(&mut self, start: usize, first_escape: usize) -> Result<String> {
        let mut out = String::with_capacity(first_escape - start + 16);
        out.push_str(&self.input[start..first_escape]);
        let mut pos = first_escape;
        loop {
            // pos is at a backslash
            pos = self.append_escape(&mut out, pos + 1)?;
            match memchr::memchr2(b'"', b'\\', &self.bytes[pos..]) {
                Some(offset) => {
                    let next = pos + offset;
                    out.push_str(&self.input[pos..next]);
                    if self.bytes[next] == b'"' {
                        self.pos = next + 1;
                        return Ok(out);
                    }
                    pos = next;
                }
                None => return Err(self.fail_at("Unexpected EOF during string", self.bytes.len(), None)),
            }
        }
    }

    /// Decodes the escape whose character is at `pos`; returns the position after it.
    fn append_escape(&self, out: &mut String, pos: usize) -> Result<usize> {
        let Some(&c) = self.bytes.get(pos) else {
            return Err(self.fail_at("Expected escape sequence to continue, got EOF", pos, None));
        };
        let decoded = match c {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => return self.append_unicode_escape(out, pos + 1),
            _ => {
                return Err(self.fail_at(
                    format!("Invalid escaped char '{}'", self.describe_at(pos)),
                    pos,
                    None,
                ))
            }
        };
        out.push(decoded);
        Ok(pos + 1)
    }

    fn read_hex4(&self, pos: usize) -> Result<u32> {
        let Some(digits) = self.bytes.get(pos..pos + 4) else {
            return Err(self.fail_at("Unexpected EOF during unicode escape", pos, None));
        };
        let mut value = 0u32;
        for (i, &d) in digits.iter().enumerate() {
            let nibble = match d {
                b'0'..=b'9' => d - b'0',
                b'a'..=b'f' => d - b'a' + 10,
                b'A'..=b'F' => d - b'A' + 10,
                _ => {
                    return Err(self.fail_at(
                        format!("Invalid toHexChar char '{}' in unicode escape", char::from(d)),
                        pos + i,
                        None,
                    ))
                }
            };
            value = (value << 4) | u32::from(nibble);
        }
        Ok(value)
    }

    fn append_unicode_escape(&self, out: &mut String, pos: usize) -> Result<usize> {
        let unit = self.read_hex4(pos)?;
        let mut next = pos + 4;
        let code = if (0xD800..0xDC00).contains(&unit) {
            // High surrogate: the low half must follow as another \u escape.
            if self.bytes.get(next..next + 2) != Some(b"\\u".as_slice()) {
                return Err(self.fail_at("Unpaired surrogate in unicode escape", pos, None));
            }
            let low = self.read_hex4(next + 2)?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.fail_at("Unpaired surrogate in unicode escape", next + 2, None));
            }
            next += 6;
            0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
        } else {
            unit
        };
        let c = char::from_u32(code).ok_or_else(|| self.fail_at("Unpaired surrogate in unicode escape", pos, None))?;
        out.push(c);
        Ok(next)
    }

    // =========================================================================
    // Numbers and booleans
    // =========================================================================

    /// Reads an integer without materializing a string. Accepts an optional
    /// surrounding quote pair and an exponent that keeps the value integral.
    pub(crate) fn consume_numeric_literal(&mut self) -> Result<i64> {
        let start = self.skip_whitespace();
        let mut current = start;
        if current >= self.bytes.len() {
            return Err(self.fail_at("EOF", start, None));
        }
        let quoted = self.bytes[current] == b'"';
        if quoted {
            current += 1;
        }
        let negative = self.bytes.get(current) == Some(&b'-');
        if negative {
            current += 1;
        }
        let digits_start = current;
        // Accumulate negatively so i64::MIN is representable.
        let mut accumulator: i64 = 0;
        let mut exponent: Option<(bool, i32)> = None;
        while let Some(&c) = self.bytes.get(current) {
            match (c, exponent) {
                (b'0'..=b'9', None) => {
                    accumulator = accumulator
                        .checked_mul(10)
                        .and_then(|a| a.checked_sub(i64::from(c - b'0')))
                        .ok_or_else(|| self.fail_at("Numeric value overflow", start, None))?;
                }
                (b'0'..=b'9', Some((positive, value))) => {
                    exponent = Some((positive, value.saturating_mul(10).saturating_add(i32::from(c - b'0'))));
                }
                (b'e' | b'E', None) if current > digits_start => exponent = Some((true, 0)),
                (b'-', Some((_, 0))) if matches!(self.bytes[current - 1], b'e' | b'E') => {
                    exponent = Some((false, 0));
                }
                (b'+', Some((_, 0))) if matches!(self.bytes[current - 1], b'e' | b'E') => {}
                _ if !is_token_byte(c) => break,
                _ => {
                    return Err(self.fail_at(
                        format!("Unexpected symbol '{}' in numeric literal", self.describe_at(current)),
                        current,
                        None,
                    ))
                }
            }
            current += 1;
        }
        if current == digits_start {
            return Err(self.fail_at("Expected numeric literal", start, None));
        }
        if quoted {
            if self.bytes.get(current) != Some(&b'"') {
                return Err(self.fail_at("Expected closing quotation mark", current, None));
            }
            current += 1;
        }
        self.pos = current;

        let value = if negative {
            accumulator
        } else {
            accumulator
                .checked_neg()
                .ok_or_else(|| self.fail_at("Numeric value overflow", start, None))?
        };
        match exponent {
            None => Ok(value),
            Some((positive, exp)) => self.apply_exponent(value, if positive { exp } else { -exp }, start),
        }
    }

    /// Parses a complete integer literal with the grammar of
    /// [`Lexer::consume_numeric_literal`]. `None` unless all of `content` is
    /// one unquoted literal.
    pub(crate) fn parse_integer(content: &str) -> Option<i64> {
        if !content.bytes().next().is_some_and(|b| b == b'-' || b.is_ascii_digit()) {
            return None;
        }
        let mut lexer = Lexer::new(content, false);
        let value = lexer.consume_numeric_literal().ok()?;
        (lexer.position() == content.len()).then_some(value)
    }

    /// Scales in integer arithmetic; the result must be exact and in range.
    #[allow(clippy::cast_precision_loss)]
    fn apply_exponent(&self, value: i64, exponent: i32, start: usize) -> Result<i64> {
        if value == 0 {
            return Ok(0);
        }
        let factor = 10i64.checked_pow(exponent.unsigned_abs());
        if exponent >= 0 {
            return factor
                .and_then(|factor| value.checked_mul(factor))
                .ok_or_else(|| self.fail_at("Numeric value overflow", start, None));
        }
        match factor {
            Some(divisor) if value % divisor == 0 => Ok(value / divisor),
            _ => {
                let scaled = value as f64 * 10f64.powi(exponent);
                Err(self.fail_at(format!("Can't convert {scaled} to Long"), start, None))
            }
        }
    }

    /// Reads `true` or `false`, optionally quoted. Case-insensitive when lenient.
    pub(crate) fn consume_boolean(&mut self) -> Result<bool> {
        let start = self.skip_whitespace();
        let (content, _) = self.consume_literal()?;
        let value = if self.lenient {
            if content.eq_ignore_ascii_case("true") {
                Some(true)
            } else if content.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        } else {
            match content.as_ref() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            }
        };
        value.ok_or_else(|| self.fail_at(format!("Expected valid boolean literal, but had '{content}'"), start, None))
    }

    // =========================================================================
    // Skipping and lookahead
    // =========================================================================

    /// Skips one complete value, matching brackets with an explicit stack.
    pub(crate) fn skip_element(&mut self) -> Result<()> {
        let first = self.peek_next_token();
        if first != Token::BeginList && first != Token::BeginObject {
            self.consume_string_lenient()?;
            return Ok(());
        }
        let mut open: Vec<Token> = Vec::new();
        loop {
            match self.peek_next_token() {
                Token::String | Token::Other => {
                    self.consume_string_lenient()?;
                    continue;
                }
                token @ (Token::BeginList | Token::BeginObject) => open.push(token),
                Token::EndList => {
                    if open.pop() != Some(Token::BeginList) {
                        return Err(self.fail("found ] instead of } while skipping an element"));
                    }
                }
                Token::EndObject => {
                    if open.pop() != Some(Token::BeginObject) {
                        return Err(self.fail("found } instead of ] while skipping an element"));
                    }
                }
                Token::Eof => {
                    return Err(self.fail("Unexpected end of input due to malformed JSON during ignoring unknown keys"))
                }
                Token::Invalid => return Err(self.fail(format!("Invalid token '{}'", self.describe_at(self.pos)))),
                Token::Comma | Token::Colon => {}
            }
            self.pos += 1;
            if open.is_empty() {
                return Ok(());
            }
        }
    }

    /// Returns the discriminator value when the upcoming object starts with
    /// `"key": "value"`. Never consumes input.
    pub(crate) fn peek_leading_matching_value(&mut self, key: &str) -> Option<String> {
        let saved = self.pos;
        let found = self.leading_matching_value(key);
        self.pos = saved;
        found
    }

    fn leading_matching_value(&mut self, key: &str) -> Option<String> {
        if self.peek_next_token() != Token::BeginObject {
            return None;
        }
        self.pos += 1;
        let found_key = self.consume_key_string().ok()?;
        if found_key != key {
            return None;
        }
        self.consume_token(Token::Colon).ok()?;
        let value = if self.lenient {
            self.consume_string_lenient()
        } else {
            self.consume_string()
        };
        value.ok().map(Cow::into_owned)
    }

    /// Returns the string value that follows without consuming it.
    pub(crate) fn peek_string(&mut self) -> Option<String> {
        let saved = self.pos;
        let value = if self.lenient {
            self.consume_string_lenient()
        } else {
            self.consume_string()
        };
        self.pos = saved;
        value.ok().map(Cow::into_owned)
    }
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
