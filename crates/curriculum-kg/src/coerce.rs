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

//! Value coercion from source cells to typed graph values.
//!
//! Coercion never fails. A value that cannot be converted to its target type
//! is logged at `warn` and converted with the `string` rule instead.
//!
//! Absent values are native nulls, blank strings, `NaN` in any case, and the
//! strings `"[]"` and `"{}"`. They coerce to [`CypherValue::Null`], which
//! callers omit.

use crate::config::TargetType;
use crate::cypher::CypherValue;
use crate::error::{MigrationError, Result};
use crate::structured::{decode_unicode_escapes, parse_structured};
use crate::table::cell_text;
use serde_json::Value;

const TRUTHY: [&str; 4] = ["true", "1", "yes", "on"];

/// Whether a raw cell counts as absent.
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let t = s.trim();
            t.is_empty() || t == "[]" || t == "{}" || t.eq_ignore_ascii_case("nan")
        }
        _ => false,
    }
}

/// Coerce a raw cell to `target`. Absent cells, and list cells that parse
/// to an empty list, yield `Null`.
///
/// ```
/// # use curriculum_kg::coerce::coerce;
/// # use curriculum_kg::{CypherValue, TargetType};
/// # use serde_json::json;
/// assert_eq!(coerce(&json!("123.0"), TargetType::Int), CypherValue::Int(123));
/// assert_eq!(coerce(&json!("TRUE"), TargetType::Boolean), CypherValue::Bool(true));
/// assert_eq!(coerce(&json!("[]"), TargetType::List), CypherValue::Null);
/// assert_eq!(coerce(&json!("abc"), TargetType::Int), CypherValue::from("abc"));
/// ```
pub fn coerce(value: &Value, target: TargetType) -> CypherValue {
    if is_absent(value) {
        return CypherValue::Null;
    }
    match try_coerce(value, target) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "using string conversion");
            coerce_string(value)
        }
    }
}

/// Like [`coerce`], but absent values become the zero value of `target`.
pub fn coerce_or_default(value: &Value, target: TargetType) -> CypherValue {
    match coerce(value, target) {
        CypherValue::Null => zero_value(target),
        other => other,
    }
}

/// The zero-equivalent default for a target type.
pub fn zero_value(target: TargetType) -> CypherValue {
    match target {
        TargetType::String | TargetType::Datetime => CypherValue::String(String::new()),
        TargetType::Int => CypherValue::Int(0),
        TargetType::Float => CypherValue::Float(0.0),
        TargetType::Boolean => CypherValue::Bool(false),
        TargetType::List => CypherValue::List(Vec::new()),
    }
}

/// Shape an already-typed value for submission to a graph store.
///
/// Lists and maps become JSON strings; string values declared numeric or
/// boolean are coerced again. Everything else passes through.
pub fn convert_for_store(value: &CypherValue, target: TargetType) -> CypherValue {
    match (value, target) {
        (CypherValue::List(_) | CypherValue::Map(_), _) => CypherValue::String(value.to_text()),
        (CypherValue::String(s), TargetType::Int | TargetType::Float | TargetType::Boolean) => {
            coerce(&Value::String(s.clone()), target)
        }
        _ => value.clone(),
    }
}

fn failure(value: &Value, target: TargetType) -> MigrationError {
    MigrationError::Coercion {
        value: value.to_string(),
        target: target.as_str().to_string(),
    }
}

fn try_coerce(value: &Value, target: TargetType) -> Result<CypherValue> {
    match target {
        TargetType::Int => to_int(value).map(CypherValue::Int),
        TargetType::Float => to_float(value).map(CypherValue::Float),
        TargetType::Boolean => Ok(CypherValue::Bool(to_bool(value))),
        TargetType::List => Ok(to_list(value)),
        TargetType::Datetime => Ok(cell_text(value).map(CypherValue::String).into()),
        TargetType::String => Ok(coerce_string(value)),
    }
}

fn to_int(value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(i),
            None => n
                .as_f64()
                .and_then(truncate)
                .ok_or_else(|| failure(value, TargetType::Int)),
        },
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => {
            let t = s.trim();
            t.parse::<i64>()
                .ok()
                .or_else(|| t.parse::<f64>().ok().and_then(truncate))
                .ok_or_else(|| failure(value, TargetType::Int))
        }
        _ => Err(failure(value, TargetType::Int)),
    }
}

fn truncate(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

fn to_float(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| failure(value, TargetType::Float)),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(|| failure(value, TargetType::Float)),
        _ => Err(failure(value, TargetType::Float)),
    }
}

fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let t = s.trim().to_ascii_lowercase();
            TRUTHY.contains(&t.as_str())
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
    }
}

fn to_list(value: &Value) -> CypherValue {
    let items = match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => match parse_structured(s) {
            Some(Value::Array(items)) => items,
            _ => vec![Value::String(s.clone())],
        },
        other => vec![other.clone()],
    };
    let elements: Vec<CypherValue> = items
        .iter()
        .filter_map(|item| match item {
            Value::Array(_) | Value::Object(_) => Some(item.to_string()),
            Value::String(s) => Some(decode_unicode_escapes(s.trim())),
            other => cell_text(other),
        })
        .map(CypherValue::String)
        .collect();
    if elements.is_empty() {
        CypherValue::Null
    } else {
        CypherValue::List(elements)
    }
}

fn coerce_string(value: &Value) -> CypherValue {
    match value {
        Value::Null => CypherValue::Null,
        Value::String(s) => CypherValue::String(decode_unicode_escapes(s.trim())),
        Value::Array(_) | Value::Object(_) => CypherValue::String(value.to_string()),
        other => cell_text(other).map(CypherValue::String).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_values() {
        for v in [json!(null), json!(""), json!("   "), json!("[]"), json!(" {} ")] {
            assert!(is_absent(&v), "{v} should be absent");
            assert_eq!(coerce(&v, TargetType::String), CypherValue::Null);
        }
        assert!(!is_absent(&json!(0)));
        assert!(!is_absent(&json!(false)));
    }

    #[test]
    fn test_nan_text_is_absent() {
        for v in [json!("NaN"), json!("nan"), json!(" NAN ")] {
            assert!(is_absent(&v), "{v} should be absent");
            assert_eq!(coerce(&v, TargetType::Float), CypherValue::Null);
            assert_eq!(coerce(&v, TargetType::String), CypherValue::Null);
        }
        assert_eq!(coerce_or_default(&json!("NaN"), TargetType::Float), CypherValue::Float(0.0));
        assert!(!is_absent(&json!("nancy")));
    }

    #[test]
    fn test_infinite_floats_fall_back_to_string() {
        assert_eq!(coerce(&json!("inf"), TargetType::Float), CypherValue::from("inf"));
        assert_eq!(coerce(&json!("-Infinity"), TargetType::Float), CypherValue::from("-Infinity"));
    }

    #[test]
    fn test_int_truncates_floats() {
        assert_eq!(coerce(&json!("123.0"), TargetType::Int), CypherValue::Int(123));
        assert_eq!(coerce(&json!(" 7.9 "), TargetType::Int), CypherValue::Int(7));
        assert_eq!(coerce(&json!(-2.5), TargetType::Int), CypherValue::Int(-2));
        assert_eq!(coerce(&json!(true), TargetType::Int), CypherValue::Int(1));
    }

    #[test]
    fn test_int_failures_fall_back_to_string() {
        assert_eq!(coerce(&json!("inf"), TargetType::Int), CypherValue::from("inf"));
        assert_eq!(coerce(&json!("1e300"), TargetType::Int), CypherValue::from("1e300"));
        assert_eq!(coerce(&json!("n/a"), TargetType::Int), CypherValue::from("n/a"));
    }

    #[test]
    fn test_float() {
        assert_eq!(coerce(&json!("2.5"), TargetType::Float), CypherValue::Float(2.5));
        assert_eq!(coerce(&json!(3), TargetType::Float), CypherValue::Float(3.0));
        assert_eq!(coerce(&json!("x"), TargetType::Float), CypherValue::from("x"));
    }

    #[test]
    fn test_boolean_tokens() {
        for t in ["true", "TRUE", "1", "yes", "On"] {
            assert_eq!(coerce(&json!(t), TargetType::Boolean), CypherValue::Bool(true));
        }
        for f in ["false", "0", "no", "maybe"] {
            assert_eq!(coerce(&json!(f), TargetType::Boolean), CypherValue::Bool(false));
        }
        assert_eq!(coerce(&json!(2), TargetType::Boolean), CypherValue::Bool(true));
        assert_eq!(coerce(&json!(0.0), TargetType::Boolean), CypherValue::Bool(false));
    }

    #[test]
    fn test_datetime_is_trimmed_text() {
        assert_eq!(
            coerce(&json!(" 2024-01-02T03:04:05 "), TargetType::Datetime),
            CypherValue::from("2024-01-02T03:04:05")
        );
    }

    #[test]
    fn test_list_sources() {
        let expected = CypherValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(coerce(&json!(["a", " b "]), TargetType::List), expected);
        assert_eq!(coerce(&json!(r#"["a","b"]"#), TargetType::List), expected);
        assert_eq!(coerce(&json!("['a', 'b']"), TargetType::List), expected);
        assert_eq!(
            coerce(&json!("solo"), TargetType::List),
            CypherValue::List(vec!["solo".into()])
        );
        assert_eq!(coerce(&json!("[ ]"), TargetType::List), CypherValue::Null);
    }

    #[test]
    fn test_list_structured_elements_are_json() {
        let value = coerce(&json!("[{'slug': 'caf\u{e9}'}]"), TargetType::List);
        assert_eq!(
            value,
            CypherValue::List(vec![CypherValue::from("{\"slug\":\"caf\u{e9}\"}")])
        );
    }

    #[test]
    fn test_string_rule() {
        assert_eq!(coerce(&json!(42), TargetType::String), CypherValue::from("42"));
        assert_eq!(
            coerce(&json!({"a": 1}), TargetType::String),
            CypherValue::from("{\"a\":1}")
        );
        assert_eq!(
            coerce(&json!(r" caf\u00e9 "), TargetType::String),
            CypherValue::from("caf\u{e9}")
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(coerce_or_default(&json!(null), TargetType::Int), CypherValue::Int(0));
        assert_eq!(coerce_or_default(&json!(""), TargetType::Float), CypherValue::Float(0.0));
        assert_eq!(
            coerce_or_default(&json!("[]"), TargetType::Boolean),
            CypherValue::Bool(false)
        );
        assert_eq!(coerce_or_default(&json!(null), TargetType::String), CypherValue::from(""));
        assert_eq!(
            coerce_or_default(&json!("[]"), TargetType::List),
            CypherValue::List(vec![])
        );
    }

    #[test]
    fn test_convert_for_store() {
        let list = CypherValue::List(vec!["a".into()]);
        assert_eq!(
            convert_for_store(&list, TargetType::List),
            CypherValue::from(r#"["a"]"#)
        );
        assert_eq!(
            convert_for_store(&CypherValue::from("5"), TargetType::Int),
            CypherValue::Int(5)
        );
        assert_eq!(
            convert_for_store(&CypherValue::Int(5), TargetType::String),
            CypherValue::Int(5)
        );
    }
}
