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

//! The source table: named-column rows read from JSON or CSV.

use crate::error::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One source record. Columns keep their input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw cell value, `None` when the column does not exist.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Cell value if the column exists and is not null.
    pub fn get_present(&self, column: &str) -> Option<&Value> {
        self.0.get(column).filter(|v| !v.is_null())
    }

    /// Cell rendered as trimmed text; `None` for missing or null cells.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get_present(column).and_then(cell_text)
    }

    /// Whether the column exists (null or not).
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Set a cell, returning the previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(column.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Iterate over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Mutable iteration over cell values.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.0.values_mut()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Render a scalar cell as trimmed text. Arrays and objects render as
/// compact JSON. Null yields `None`.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Read rows from a JSON array of objects.
pub fn read_json_rows<R: Read>(reader: R) -> Result<Vec<Row>> {
    let document: Value = serde_json::from_reader(reader)?;
    let Value::Array(items) = document else {
        return Err(MigrationError::Mapping {
            mapping: "table".to_string(),
            message: "expected a JSON array of row objects".to_string(),
        });
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(Row(map)),
            _ => Err(MigrationError::Mapping {
                mapping: "table".to_string(),
                message: format!("row {} is not an object", index + 1),
            }),
        })
        .collect()
}

/// Read rows from CSV with a header row. Cells are strings; empty cells
/// become null.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<Row>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(column, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (column.to_string(), value)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Read rows from a file, choosing CSV for a `.csv` extension and JSON
/// otherwise.
pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<Row>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let rows = if is_csv {
        read_csv_rows(reader)?
    } else {
        read_json_rows(reader)?
    };
    tracing::info!(path = %path.display(), rows = rows.len(), "loaded source table");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_json_rows() {
        let rows = read_json_rows(r#"[{"unit_id": 7, "title": " Algebra "}]"#.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("unit_id"), Some(&json!(7)));
        assert_eq!(rows[0].text("title").as_deref(), Some("Algebra"));
    }

    #[test]
    fn test_read_json_rejects_non_objects() {
        assert!(read_json_rows("[1, 2]".as_bytes()).is_err());
        assert!(read_json_rows(r#"{"a": 1}"#.as_bytes()).is_err());
    }

    #[test]
    fn test_read_csv_rows_empty_cells_are_null() {
        let csv = "unit_id,title,threads\n1,Algebra,\"[{'slug': 'a'}]\"\n2,,\n";
        let rows = read_csv_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("unit_id"), Some(&json!("1")));
        assert_eq!(rows[0].get("threads"), Some(&json!("[{'slug': 'a'}]")));
        assert_eq!(rows[1].get("title"), Some(&Value::Null));
        assert!(rows[1].get_present("title").is_none());
        assert!(rows[1].contains("title"));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!(null)), None);
        assert_eq!(cell_text(&json!(3.5)).as_deref(), Some("3.5"));
        assert_eq!(cell_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(cell_text(&json!([1, 2])).as_deref(), Some("[1,2]"));
    }

    #[test]
    fn test_row_builder() {
        let row = Row::new().with("a", 1).with("b", "x");
        assert_eq!(row.len(), 2);
        let cols: Vec<_> = row.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(cols, vec!["a", "b"]);
    }
}
