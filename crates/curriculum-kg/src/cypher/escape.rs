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

//! Cypher string escaping and identifier validation.
//!
//! Labels, relationship types and property names come from the mapping
//! configuration and are spliced into write templates, so every one of them
//! passes through this module before reaching a query string.

use crate::error::{MigrationError, Result};
use std::borrow::Cow;
use unicode_normalization::UnicodeNormalization;

#[inline]
fn needs_escaping(s: &str) -> bool {
    s.chars().any(|ch| matches!(ch, '\\' | '\'' | '"' | '\n' | '\r' | '\t' | '\x00'))
}

/// Escape a string value for use inside a single-quoted Cypher literal.
///
/// Returns `Cow::Borrowed` when nothing needs escaping.
///
/// ```
/// # use curriculum_kg::cypher::escape_string;
/// assert_eq!(escape_string("it's"), "it\\'s");
/// assert!(matches!(escape_string("plain"), std::borrow::Cow::Borrowed(_)));
/// ```
pub fn escape_string(s: &str) -> Cow<'_, str> {
    if !needs_escaping(s) {
        return Cow::Borrowed(s);
    }

    let mut escaped = String::with_capacity(s.len() + 10);
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\x00' => escaped.push_str("\\u0000"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Quote a string value for Cypher with single quotes.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", escape_string(s))
}

/// Check if a string is a plain Cypher identifier (ASCII letter or
/// underscore, followed by letters, digits, or underscores).
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Reject names that cannot be used as a label, type, or property even
/// after backtick quoting: empty names and names made only of control or
/// invisible characters.
pub fn validate_name<'a>(kind: &str, s: &'a str) -> Result<&'a str> {
    if sanitize(s).trim().is_empty() {
        return Err(MigrationError::config(format!(
            "{} name '{}' is empty or unprintable",
            kind,
            s.escape_debug()
        )));
    }
    Ok(s)
}

/// Normalize a string to NFC form, so visually identical names map to the
/// same label or property.
///
/// ```
/// # use curriculum_kg::cypher::normalize_unicode;
/// assert_eq!(normalize_unicode("cafe\u{0301}"), normalize_unicode("caf\u{00e9}"));
/// ```
pub fn normalize_unicode(s: &str) -> String {
    s.nfc().collect()
}

/// Control, zero-width, and bidirectional formatting characters.
fn is_dangerous_unicode(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            '\u{200B}'
                | '\u{200C}'
                | '\u{200D}'
                | '\u{FEFF}'
                | '\u{202A}'
                | '\u{202B}'
                | '\u{202C}'
                | '\u{202D}'
                | '\u{202E}'
                | '\u{2066}'
                | '\u{2067}'
                | '\u{2068}'
                | '\u{2069}'
                | '\u{00AD}'
                | '\u{061C}'
                | '\u{180E}'
        )
}

fn sanitize(s: &str) -> String {
    normalize_unicode(s)
        .chars()
        .filter(|c| !is_dangerous_unicode(*c))
        .collect()
}

fn quote_if_needed(sanitized: String) -> String {
    if is_valid_identifier(&sanitized) && !is_cypher_keyword(&sanitized) {
        sanitized
    } else {
        format!("`{}`", sanitized.replace('`', "``"))
    }
}

/// Escape a property name or variable, using backticks when needed.
///
/// ```
/// # use curriculum_kg::cypher::escape_identifier;
/// assert_eq!(escape_identifier("lessonTitle"), "lessonTitle");
/// assert_eq!(escape_identifier("key-stage"), "`key-stage`");
/// assert_eq!(escape_identifier("MATCH"), "`MATCH`");
/// ```
pub fn escape_identifier(s: &str) -> String {
    quote_if_needed(sanitize(s))
}

/// Escape a node label, including the leading colon.
///
/// ```
/// # use curriculum_kg::cypher::escape_label;
/// assert_eq!(escape_label("Lesson"), ":Lesson");
/// assert_eq!(escape_label("Key Stage"), ":`Key Stage`");
/// ```
pub fn escape_label(s: &str) -> String {
    format!(":{}", quote_if_needed(sanitize(s)))
}

/// Escape a relationship type, including the leading colon.
///
/// ```
/// # use curriculum_kg::cypher::escape_relationship_type;
/// assert_eq!(escape_relationship_type("HAS_UNIT"), ":HAS_UNIT");
/// assert_eq!(escape_relationship_type("has-unit"), ":`has-unit`");
/// ```
pub fn escape_relationship_type(s: &str) -> String {
    format!(":{}", quote_if_needed(sanitize(s)))
}

/// Convert an arbitrary string to a plain identifier by replacing invalid
/// characters with underscores. Used for generated constraint names.
pub fn to_identifier(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 1);
    for (i, c) in s.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            result.push('_');
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            result.push(c);
        } else {
            result.push('_');
        }
    }
    if result.is_empty() {
        result.push('_');
    }
    result
}

fn is_cypher_keyword(s: &str) -> bool {
    matches!(
        s.to_uppercase().as_str(),
        "ALL"
            | "AND"
            | "ANY"
            | "AS"
            | "ASC"
            | "ASCENDING"
            | "BY"
            | "CALL"
            | "CASE"
            | "CONTAINS"
            | "COUNT"
            | "CREATE"
            | "DELETE"
            | "DESC"
            | "DESCENDING"
            | "DETACH"
            | "DISTINCT"
            | "DO"
            | "DROP"
            | "ELSE"
            | "END"
            | "ENDS"
            | "EXISTS"
            | "FALSE"
            | "FILTER"
            | "FOREACH"
            | "IN"
            | "IS"
            | "LIMIT"
            | "MANDATORY"
            | "MATCH"
            | "MERGE"
            | "NODE"
            | "NONE"
            | "NOT"
            | "NULL"
            | "OF"
            | "ON"
            | "OPTIONAL"
            | "OR"
            | "ORDER"
            | "REDUCE"
            | "RELATIONSHIP"
            | "REMOVE"
            | "RETURN"
            | "SET"
            | "SINGLE"
            | "SKIP"
            | "SOME"
            | "STARTS"
            | "THEN"
            | "TRUE"
            | "UNION"
            | "UNIQUE"
            | "UNWIND"
            | "USING"
            | "WHEN"
            | "WHERE"
            | "WITH"
            | "XOR"
            | "YIELD"
    )
}
