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

//! Typed graph values and Cypher statement types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A typed value as stored on a node or relationship, or passed as a
/// query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CypherValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    String(String),
    /// List value.
    List(Vec<CypherValue>),
    /// Map value (used for parameter rows).
    Map(BTreeMap<String, CypherValue>),
}

impl From<bool> for CypherValue {
    fn from(v: bool) -> Self {
        CypherValue::Bool(v)
    }
}

impl From<i64> for CypherValue {
    fn from(v: i64) -> Self {
        CypherValue::Int(v)
    }
}

impl From<i32> for CypherValue {
    fn from(v: i32) -> Self {
        CypherValue::Int(v as i64)
    }
}

impl From<f64> for CypherValue {
    fn from(v: f64) -> Self {
        CypherValue::Float(v)
    }
}

impl From<String> for CypherValue {
    fn from(v: String) -> Self {
        CypherValue::String(v)
    }
}

impl From<&str> for CypherValue {
    fn from(v: &str) -> Self {
        CypherValue::String(v.to_string())
    }
}

impl<T: Into<CypherValue>> From<Vec<T>> for CypherValue {
    fn from(v: Vec<T>) -> Self {
        CypherValue::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<CypherValue>> From<Option<T>> for CypherValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(x) => x.into(),
            None => CypherValue::Null,
        }
    }
}

impl CypherValue {
    /// Convert to Cypher literal syntax.
    pub fn to_cypher_literal(&self) -> String {
        match self {
            CypherValue::Null => "null".to_string(),
            CypherValue::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            CypherValue::Int(i) => i.to_string(),
            CypherValue::Float(f) => {
                if f.is_nan() {
                    "0.0/0.0".to_string()
                } else if f.is_infinite() {
                    if *f > 0.0 {
                        "1.0/0.0".to_string()
                    } else {
                        "-1.0/0.0".to_string()
                    }
                } else {
                    format_float(*f)
                }
            }
            CypherValue::String(s) => super::escape::quote_string(s),
            CypherValue::List(items) => {
                let inner: Vec<String> = items.iter().map(|v| v.to_cypher_literal()).collect();
                format!("[{}]", inner.join(", "))
            }
            CypherValue::Map(map) => {
                let pairs: Vec<String> = map
                    .iter()
                    .map(|(k, v)| {
                        format!(
                            "{}: {}",
                            super::escape::escape_identifier(k),
                            v.to_cypher_literal()
                        )
                    })
                    .collect();
                format!("{{{}}}", pairs.join(", "))
            }
        }
    }

    /// Render as plain text, the way a cell in a bulk-import file shows it.
    ///
    /// Strings are returned verbatim, lists and maps as compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            CypherValue::Null => String::new(),
            CypherValue::Bool(b) => b.to_string(),
            CypherValue::Int(i) => i.to_string(),
            CypherValue::Float(f) => format_float(*f),
            CypherValue::String(s) => s.clone(),
            CypherValue::List(_) | CypherValue::Map(_) => self.to_json().to_string(),
        }
    }

    /// Convert to a `serde_json::Value`. Non-finite floats become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CypherValue::Null => serde_json::Value::Null,
            CypherValue::Bool(b) => serde_json::Value::Bool(*b),
            CypherValue::Int(i) => serde_json::Value::from(*i),
            CypherValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CypherValue::String(s) => serde_json::Value::String(s.clone()),
            CypherValue::List(items) => {
                serde_json::Value::Array(items.iter().map(|v| v.to_json()).collect())
            }
            CypherValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, CypherValue::Null)
    }

    /// Try to get as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CypherValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Format a finite float so it always reads back as a float.
fn format_float(f: f64) -> String {
    let s = f.to_string();
    if s.contains('.') || s.contains('e') || s.contains('E') || !f.is_finite() {
        s
    } else {
        format!("{}.0", s)
    }
}

/// The type of Cypher statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementType {
    /// Uniqueness constraint creation.
    Constraint,
    /// Node upsert batch.
    CreateNode,
    /// Relationship merge batch.
    CreateRelationship,
    /// Destructive wipe of the target store.
    Clear,
    /// General query.
    Query,
}

/// A single Cypher statement with optional parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CypherStatement {
    /// The Cypher query text.
    pub query: String,
    /// Optional parameters for the query.
    pub parameters: BTreeMap<String, CypherValue>,
    /// Type of statement.
    pub statement_type: StatementType,
    /// Optional comment describing the statement.
    pub comment: Option<String>,
}

impl CypherStatement {
    /// Create a new Cypher statement.
    pub fn new(query: impl Into<String>, statement_type: StatementType) -> Self {
        Self {
            query: query.into(),
            parameters: BTreeMap::new(),
            statement_type,
            comment: None,
        }
    }

    /// Create a constraint statement.
    pub fn constraint(query: impl Into<String>) -> Self {
        Self::new(query, StatementType::Constraint)
    }

    /// Create a node upsert statement.
    pub fn create_node(query: impl Into<String>) -> Self {
        Self::new(query, StatementType::CreateNode)
    }

    /// Create a relationship merge statement.
    pub fn create_relationship(query: impl Into<String>) -> Self {
        Self::new(query, StatementType::CreateRelationship)
    }

    /// Create a clear statement.
    pub fn clear(query: impl Into<String>) -> Self {
        Self::new(query, StatementType::Clear)
    }

    /// Create a general query statement.
    pub fn query(query: impl Into<String>) -> Self {
        Self::new(query, StatementType::Query)
    }

    /// Add a parameter to this statement.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<CypherValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Add a comment to this statement.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Render this statement as a string with embedded values.
    ///
    /// Longer parameter names are substituted first so `$batch` never
    /// clobbers `$batch_size`.
    pub fn render_inline(&self) -> String {
        let mut names: Vec<&String> = self.parameters.keys().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut result = self.query.clone();
        for name in names {
            let placeholder = format!("${}", name);
            result = result.replace(&placeholder, &self.parameters[name].to_cypher_literal());
        }
        result
    }

    /// Format this statement with optional comment prefix.
    pub fn format(&self, include_comment: bool) -> String {
        let mut lines = Vec::new();

        if include_comment {
            if let Some(comment) = &self.comment {
                lines.push(format!("// {}", comment));
            }
        }

        lines.push(format!("{};", self.render_inline()));

        lines.join("\n")
    }
}

/// A collection of Cypher statements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CypherScript {
    /// The statements in this script.
    pub statements: Vec<CypherStatement>,
}

impl CypherScript {
    /// Create a new empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement to the script.
    pub fn add(&mut self, statement: CypherStatement) {
        self.statements.push(statement);
    }

    /// Get all statements of a specific type.
    pub fn statements_of_type(&self, statement_type: StatementType) -> Vec<&CypherStatement> {
        self.statements
            .iter()
            .filter(|s| s.statement_type == statement_type)
            .collect()
    }

    /// Render the script as a single string.
    pub fn render(&self, include_comments: bool) -> String {
        self.statements
            .iter()
            .map(|s| s.format(include_comments))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Get the number of statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Check if the script is empty.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl IntoIterator for CypherScript {
    type Item = CypherStatement;
    type IntoIter = std::vec::IntoIter<CypherStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cypher_value_literals() {
        assert_eq!(CypherValue::Null.to_cypher_literal(), "null");
        assert_eq!(CypherValue::Bool(true).to_cypher_literal(), "true");
        assert_eq!(CypherValue::Int(42).to_cypher_literal(), "42");
        assert_eq!(CypherValue::Float(3.25).to_cypher_literal(), "3.25");
        assert_eq!(CypherValue::Float(2.0).to_cypher_literal(), "2.0");
        assert_eq!(
            CypherValue::String("it's".to_string()).to_cypher_literal(),
            "'it\\'s'"
        );
    }

    #[test]
    fn test_cypher_value_map_literal() {
        let mut map = BTreeMap::new();
        map.insert("title".to_string(), CypherValue::from("Fractions"));
        map.insert("order".to_string(), CypherValue::Int(3));
        let value = CypherValue::Map(map);
        assert_eq!(value.to_cypher_literal(), "{`order`: 3, title: 'Fractions'}");
    }

    #[test]
    fn test_to_text() {
        assert_eq!(CypherValue::Null.to_text(), "");
        assert_eq!(CypherValue::Float(1.0).to_text(), "1.0");
        assert_eq!(CypherValue::from("abc").to_text(), "abc");
        assert_eq!(
            CypherValue::List(vec!["a".into(), "b".into()]).to_text(),
            r#"["a","b"]"#
        );
    }

    #[test]
    fn test_to_json_drops_non_finite() {
        assert_eq!(CypherValue::Float(f64::NAN).to_json(), serde_json::Value::Null);
        assert_eq!(CypherValue::Int(7).to_json(), serde_json::json!(7));
    }

    #[test]
    fn test_render_inline_prefers_longer_names() {
        let stmt = CypherStatement::query("RETURN $batch, $batch_size")
            .with_param("batch", 1i64)
            .with_param("batch_size", 2i64);
        assert_eq!(stmt.render_inline(), "RETURN 1, 2");
    }

    #[test]
    fn test_statement_format_with_comment() {
        let stmt = CypherStatement::constraint("CREATE CONSTRAINT x IF NOT EXISTS")
            .with_comment("Ensure unique Lesson ids");
        let formatted = stmt.format(true);
        assert!(formatted.starts_with("// Ensure unique Lesson ids\n"));
        assert!(formatted.ends_with(';'));
        assert!(!stmt.format(false).contains("//"));
    }

    #[test]
    fn test_script_statements_of_type() {
        let mut script = CypherScript::new();
        script.add(CypherStatement::constraint("C1"));
        script.add(CypherStatement::create_node("N1"));
        script.add(CypherStatement::constraint("C2"));
        assert_eq!(script.len(), 3);
        assert_eq!(script.statements_of_type(StatementType::Constraint).len(), 2);
    }
}
