//! Best-effort JSON parsing for truncated documents.
//!
//! Streamed bodies are often a single JSON document that grows with every
//! chunk. [`parse_json`] in [`ParseMode::BestEffort`] returns the value the
//! bytes received so far describe:
//!
//! - an unterminated string, object or array is closed where the input ends;
//! - a number or literal cut off at the end is dropped, since its final value
//!   is unknown;
//! - an object key with no value yet is dropped;
//! - an incomplete UTF-8 sequence at the very end is ignored.
//!
//! Complete elements are never dropped. Input that cannot be the prefix of any
//! valid document is rejected with [`StreamError::PartialJson`].

use serde_json::{Map, Number, Value};

use crate::error::{StreamError, StreamResult};

/// How strictly to parse a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// The buffer must be one complete, valid document.
    Strict,
    /// The buffer may be any prefix of a valid document.
    BestEffort,
}

/// Parse `input` in the given mode.
///
/// Returns `Ok(None)` when a best-effort parse finds nothing usable yet, e.g.
/// an empty buffer or a lone truncated number.
pub fn parse_json(input: &[u8], mode: ParseMode) -> StreamResult<Option<Value>> {
    match mode {
        ParseMode::Strict => parse_strict(input).map(Some),
        ParseMode::BestEffort => parse_best_effort(input),
    }
}

/// Parse a complete document.
pub fn parse_strict(input: &[u8]) -> StreamResult<Value> {
    Ok(serde_json::from_slice(input)?)
}

/// Parse a possibly truncated document.
pub fn parse_best_effort(input: &[u8]) -> StreamResult<Option<Value>> {
    let text = match std::str::from_utf8(input) {
        Ok(s) => s,
        Err(e) if e.error_len().is_none() => {
            // Only the tail is incomplete; valid_up_to is a char boundary.
            let valid = e.valid_up_to();
            std::str::from_utf8(&input[..valid])
                .map_err(|e| StreamError::partial_json(e.valid_up_to(), "invalid UTF-8"))?
        }
        Err(e) => return Err(StreamError::partial_json(e.valid_up_to(), "invalid UTF-8")),
    };

    let mut parser = Parser::new(text);
    let value = parser.parse_value()?;
    if let Some((_, true)) = &value {
        parser.skip_whitespace();
        if let Some(b) = parser.peek() {
            return Err(parser.unexpected(b));
        }
    }
    Ok(value.map(|(v, _)| v))
}

/// A parsed value plus whether it was closed before the input ended.
type Parsed = Option<(Value, bool)>;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\n' | b'\r' | b'\t') = self.peek() {
            self.pos += 1;
        }
    }

    fn unexpected(&self, b: u8) -> StreamError {
        let found = self.input[self.pos..]
            .chars()
            .next()
            .unwrap_or(char::from(b));
        StreamError::partial_json(self.pos, format!("unexpected character '{}'", found))
    }

    fn parse_value(&mut self) -> StreamResult<Parsed> {
        self.skip_whitespace();
        let Some(b) = self.peek() else {
            return Ok(None);
        };
        match b {
            b'{' => self.parse_object().map(Some),
            b'[' => self.parse_array().map(Some),
            b'"' => {
                let (s, complete) = self.parse_string()?;
                Ok(Some((Value::String(s), complete)))
            }
            b'-' | b'0'..=b'9' => self.parse_number(),
            b't' => self.parse_literal("true", Value::Bool(true)),
            b'f' => self.parse_literal("false", Value::Bool(false)),
            b'n' => self.parse_literal("null", Value::Null),
            other => Err(self.unexpected(other)),
        }
    }

    fn parse_object(&mut self) -> StreamResult<(Value, bool)> {
        self.pos += 1;
        let mut map = Map::new();

        self.skip_whitespace();
        match self.peek() {
            None => return Ok((Value::Object(map), false)),
            Some(b'}') => {
                self.pos += 1;
                return Ok((Value::Object(map), true));
            }
            Some(_) => {}
        }

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Ok((Value::Object(map), false)),
                Some(b'"') => {}
                Some(other) => return Err(self.unexpected(other)),
            }
            let (key, key_complete) = self.parse_string()?;
            if !key_complete {
                return Ok((Value::Object(map), false));
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok((Value::Object(map), false)),
                Some(b':') => self.pos += 1,
                Some(other) => return Err(self.unexpected(other)),
            }

            match self.parse_value()? {
                None => return Ok((Value::Object(map), false)),
                Some((value, complete)) => {
                    map.insert(key, value);
                    if !complete {
                        return Ok((Value::Object(map), false));
                    }
                }
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok((Value::Object(map), false)),
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok((Value::Object(map), true));
                }
                Some(other) => return Err(self.unexpected(other)),
            }
        }
    }

    fn parse_array(&mut self) -> StreamResult<(Value, bool)> {
        self.pos += 1;
        let mut items = Vec::new();

        self.skip_whitespace();
        match self.peek() {
            None => return Ok((Value::Array(items), false)),
            Some(b']') => {
                self.pos += 1;
                return Ok((Value::Array(items), true));
            }
            Some(_) => {}
        }

        loop {
            match self.parse_value()? {
                None => return Ok((Value::Array(items), false)),
                Some((value, complete)) => {
                    items.push(value);
                    if !complete {
                        return Ok((Value::Array(items), false));
                    }
                }
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok((Value::Array(items), false)),
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok((Value::Array(items), true));
                }
                Some(other) => return Err(self.unexpected(other)),
            }
        }
    }

    fn parse_string(&mut self) -> StreamResult<(String, bool)> {
        self.pos += 1;
        let mut out = String::new();

        loop {
            let start = self.pos;
            while let Some(b) = self.peek() {
                if b == b'"' || b == b'\\' || b < 0x20 {
                    break;
                }
                self.pos += 1;
            }
            out.push_str(&self.input[start..self.pos]);

            match self.peek() {
                None => return Ok((out, false)),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok((out, true));
                }
                Some(b'\\') => {
                    if !self.parse_escape(&mut out)? {
                        return Ok((out, false));
                    }
                }
                Some(_) => {
                    return Err(StreamError::partial_json(
                        self.pos,
                        "control character in string",
                    ))
                }
            }
        }
    }

    /// Decode one escape sequence. Returns false if the input ends inside it.
    fn parse_escape(&mut self, out: &mut String) -> StreamResult<bool> {
        let escape_start = self.pos;
        self.pos += 1;
        let Some(b) = self.peek() else {
            return Ok(false);
        };
        self.pos += 1;
        let c = match b {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                let Some(high) = self.parse_hex4()? else {
                    return Ok(false);
                };
                if (0xD800..0xDC00).contains(&high) {
                    if self.pos >= self.bytes().len() {
                        return Ok(false);
                    }
                    if !self.input[self.pos..].starts_with("\\u") {
                        if "\\u".starts_with(&self.input[self.pos..]) {
                            return Ok(false);
                        }
                        return Err(StreamError::partial_json(escape_start, "lone surrogate"));
                    }
                    self.pos += 2;
                    let Some(low) = self.parse_hex4()? else {
                        return Ok(false);
                    };
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(StreamError::partial_json(escape_start, "lone surrogate"));
                    }
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    char::from_u32(code).ok_or_else(|| {
                        StreamError::partial_json(escape_start, "invalid unicode escape")
                    })?
                } else {
                    char::from_u32(high).ok_or_else(|| {
                        StreamError::partial_json(escape_start, "lone surrogate")
                    })?
                }
            }
            _ => {
                return Err(StreamError::partial_json(
                    escape_start,
                    "invalid escape sequence",
                ))
            }
        };
        out.push(c);
        Ok(true)
    }

    fn parse_hex4(&mut self) -> StreamResult<Option<u32>> {
        let mut code = 0u32;
        for _ in 0..4 {
            let Some(b) = self.peek() else {
                return Ok(None);
            };
            let digit = char::from(b)
                .to_digit(16)
                .ok_or_else(|| StreamError::partial_json(self.pos, "invalid unicode escape"))?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        Ok(Some(code))
    }

    fn parse_number(&mut self) -> StreamResult<Parsed> {
        let start = self.pos;
        while let Some(b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
        if self.peek().is_none() {
            // The next chunk may extend this number.
            return Ok(None);
        }
        let text = &self.input[start..self.pos];
        let number: Number = serde_json::from_str(text)
            .map_err(|_| StreamError::partial_json(start, format!("invalid number '{}'", text)))?;
        Ok(Some((Value::Number(number), true)))
    }

    fn parse_literal(&mut self, literal: &str, value: Value) -> StreamResult<Parsed> {
        let rest = &self.input[self.pos..];
        if rest.starts_with(literal) {
            self.pos += literal.len();
            return Ok(Some((value, true)));
        }
        if literal.starts_with(rest) {
            self.pos = self.input.len();
            return Ok(None);
        }
        Err(StreamError::partial_json(
            self.pos,
            format!("invalid literal, expected '{}'", literal),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn best_effort(input: &str) -> Option<Value> {
        parse_best_effort(input.as_bytes()).unwrap()
    }

    #[rstest]
    #[case("{\"a\": 1, \"b\": [true, null]}", json!({"a": 1, "b": [true, null]}))]
    #[case("[]", json!([]))]
    #[case("\"plain\"", json!("plain"))]
    #[case("  {\"n\": -1.5e3}  ", json!({"n": -1500.0}))]
    fn test_complete_documents(#[case] input: &str, #[case] expected: Value) {
        assert_eq!(best_effort(input), Some(expected.clone()));
        assert_eq!(parse_strict(input.as_bytes()).unwrap(), expected);
    }

    #[rstest]
    #[case("", None)]
    #[case("   ", None)]
    #[case("[", Some(json!([])))]
    #[case("[{\"a\": 1}, {\"b\"", Some(json!([{"a": 1}, {}])))]
    #[case("[{\"a\": 1}, {\"b\": \"tex", Some(json!([{"a": 1}, {"b": "tex"}])))]
    #[case("{\"a\": 12", Some(json!({})))]
    #[case("[1, 2, 3", Some(json!([1, 2])))]
    #[case("[1, 2, 3,", Some(json!([1, 2, 3])))]
    #[case("{\"ok\": tr", Some(json!({})))]
    #[case("{\"k\": \"a\\", Some(json!({"k": "a"})))]
    #[case("{\"k\": \"a\\u00", Some(json!({"k": "a"})))]
    #[case("{\"k\": \"\\ud83d", Some(json!({"k": ""})))]
    #[case("{\"partial_ke", Some(json!({})))]
    #[case("12", None)]
    fn test_truncated_documents(#[case] input: &str, #[case] expected: Option<Value>) {
        assert_eq!(best_effort(input), expected);
    }

    #[test]
    fn test_escapes_and_surrogates() {
        let value = best_effort(r#"["line\nbreak", "quote\"", "é", "😀"]"#);
        assert_eq!(value, Some(json!(["line\nbreak", "quote\"", "\u{e9}", "\u{1F600}"])));
    }

    #[test]
    fn test_trailing_partial_utf8_is_ignored() {
        let full = "[\"caf\u{e9}\"]".as_bytes();
        // Cut inside the two-byte encoding of the accented character.
        let cut = &full[..full.len() - 3];
        assert_eq!(parse_best_effort(cut).unwrap(), Some(json!(["caf"])));
    }

    #[test]
    fn test_never_drops_complete_elements() {
        let text = r#"[{"candidates": [{"content": {"parts": [{"text": "Hello"}]}}]}, {"candidates": [{"content": {"parts": [{"text": " wor"#;
        let value = best_effort(text).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["candidates"][0]["content"]["parts"][0]["text"], "Hello");
        assert_eq!(items[1]["candidates"][0]["content"]["parts"][0]["text"], " wor");
    }

    #[rstest]
    #[case("[1 2]")]
    #[case("{\"a\" 1}")]
    #[case("{\"a\": 1,}")]
    #[case("[1]]")]
    #[case("{\"a\": nope}")]
    #[case("{\"a\": \"bad\\q\"}")]
    #[case("@")]
    fn test_malformed_is_rejected(#[case] input: &str) {
        let err = parse_best_effort(input.as_bytes()).unwrap_err();
        assert!(matches!(err, StreamError::PartialJson { .. }), "{err:?}");
    }

    #[test]
    fn test_strict_rejects_truncation() {
        assert!(parse_strict(b"[{\"a\": 1}").is_err());
        assert!(parse_json(b"[{\"a\": 1}", ParseMode::Strict).is_err());
        assert_eq!(
            parse_json(b"[{\"a\": 1}", ParseMode::BestEffort).unwrap(),
            Some(json!([{"a": 1}]))
        );
    }
}
