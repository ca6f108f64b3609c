// Curriculum KG - Curriculum Knowledge Graph Migration
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parsing of structured cell values.
//!
//! Source extracts carry arrays and objects either as JSON text or as
//! Python literal text (`[{'slug': 'algebra'}]`, `True`, `None`). Both are
//! read by [`parse_structured`]: strict JSON first, then the literal grammar.

use serde_json::{Map, Number, Value};

/// Deepest nesting accepted by the literal grammar, matching `serde_json`.
const MAX_DEPTH: usize = 128;

/// Parse a structured value from text.
///
/// Tries strict JSON first, then Python literal syntax (single or
/// double-quoted strings with escapes, `True`/`False`/`None`, integers,
/// floats, lists, tuples, and dicts with trailing commas allowed).
/// Returns `None` when neither grammar accepts the whole input, or when
/// the input nests deeper than 128 levels.
///
/// ```
/// # use curriculum_kg::structured::parse_structured;
/// # use serde_json::json;
/// assert_eq!(parse_structured(r#"[{"id": 1}]"#), Some(json!([{"id": 1}])));
/// assert_eq!(parse_structured("[{'id': 1, 'ok': True}]"), Some(json!([{"id": 1, "ok": true}])));
/// assert_eq!(parse_structured("not [structured"), None);
/// ```
pub fn parse_structured(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    let mut parser = LiteralParser::new(trimmed);
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.at_end() {
        Some(value)
    } else {
        None
    }
}

/// Parse text that must hold an array. Scalars and objects yield `None`.
pub fn parse_array(text: &str) -> Option<Vec<Value>> {
    match parse_structured(text)? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// Decode `\uXXXX` escape sequences embedded in plain text, including
/// surrogate pairs. Malformed sequences are left as they are.
///
/// ```
/// # use curriculum_kg::structured::decode_unicode_escapes;
/// assert_eq!(decode_unicode_escapes(r"caf\u00e9"), "caf\u{e9}");
/// assert_eq!(decode_unicode_escapes("plain"), "plain");
/// ```
pub fn decode_unicode_escapes(text: &str) -> String {
    if !text.contains("\\u") {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if let Some(high) = hex_escape_at(&chars, i) {
            if (0xD800..0xDC00).contains(&high) {
                if let Some(low) = hex_escape_at(&chars, i + 6) {
                    if (0xDC00..0xE000).contains(&low) {
                        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                        if let Some(c) = char::from_u32(code) {
                            out.push(c);
                            i += 12;
                            continue;
                        }
                    }
                }
            } else if let Some(c) = char::from_u32(high) {
                out.push(c);
                i += 6;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn hex_escape_at(chars: &[char], i: usize) -> Option<u32> {
    if chars.get(i) != Some(&'\\') || chars.get(i + 1) != Some(&'u') {
        return None;
    }
    let digits: String = chars.get(i + 2..i + 6)?.iter().collect();
    if digits.chars().all(|c| c.is_ascii_hexdigit()) {
        u32::from_str_radix(&digits, 16).ok()
    } else {
        None
    }
}

/// Recursive-descent parser for Python literal syntax.
struct LiteralParser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn parse_value(&mut self) -> Option<Value> {
        self.skip_whitespace();
        match self.peek()? {
            open @ ('[' | '(' | '{') => {
                if self.depth >= MAX_DEPTH {
                    return None;
                }
                self.bump();
                self.depth += 1;
                let value = match open {
                    '[' => self.parse_sequence(']').map(Value::Array),
                    '(' => self.parse_sequence(')').map(Value::Array),
                    _ => self.parse_dict(),
                };
                self.depth -= 1;
                value
            }
            '\'' | '"' => self.parse_string().map(Value::String),
            c if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.parse_number(),
            _ => self.parse_keyword(),
        }
    }

    fn parse_sequence(&mut self, close: char) -> Option<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Some(items);
            }
            items.push(self.parse_value()?);
            if self.eat(',') {
                continue;
            }
            return if self.eat(close) { Some(items) } else { None };
        }
    }

    fn parse_dict(&mut self) -> Option<Value> {
        let mut map = Map::new();
        loop {
            if self.eat('}') {
                return Some(Value::Object(map));
            }
            let key = match self.parse_value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            if !self.eat(':') {
                return None;
            }
            let value = self.parse_value()?;
            map.insert(key, value);
            if self.eat(',') {
                continue;
            }
            return if self.eat('}') {
                Some(Value::Object(map))
            } else {
                None
            };
        }
    }

    fn parse_string(&mut self) -> Option<String> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                c if c == quote => return Some(out),
                '\\' => match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    'u' => {
                        let digits = self.rest().get(..4)?;
                        let code = u32::from_str_radix(digits, 16).ok()?;
                        self.pos += 4;
                        out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                    }
                    'x' => {
                        let digits = self.rest().get(..2)?;
                        let code = u32::from_str_radix(digits, 16).ok()?;
                        self.pos += 2;
                        out.push(char::from_u32(code)?);
                    }
                    // \\, \', \" and unknown escapes keep the escaped character.
                    other => out.push(other),
                },
                c => out.push(c),
            }
        }
    }

    fn parse_number(&mut self) -> Option<Value> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_')
        ) {
            self.pos += 1;
        }
        let text: String = self.input[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if let Ok(i) = text.parse::<i64>() {
            return Some(Value::Number(Number::from(i)));
        }
        let f = text.parse::<f64>().ok()?;
        Some(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
    }

    fn parse_keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        match &self.input[start..self.pos] {
            "True" | "true" => Some(Value::Bool(true)),
            "False" | "false" => Some(Value::Bool(false)),
            "None" | "null" => Some(Value::Null),
            "nan" | "NaN" => Some(Value::Null),
            _ => None,
        }
    }
}
