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

//! Row preparation ahead of materialization.
//!
//! Rows whose every cell is empty are dropped, string cells are trimmed,
//! and the configured row filters are applied in declaration order.

use crate::table::{cell_text, Row};
use serde_json::Value;

/// Keeps only rows whose `column` matches one of the allowed values.
///
/// Cells and allowed values are compared by their text form, so a filter
/// value of `7` matches a CSV cell `"7"`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFilter {
    /// Column to test.
    pub column: String,
    /// Accepted values.
    pub allowed: Vec<Value>,
}

impl RowFilter {
    /// Filter for `column == value`.
    pub fn equals(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            allowed: vec![value],
        }
    }

    /// Filter for `column in values`.
    pub fn one_of(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            column: column.into(),
            allowed: values,
        }
    }

    /// Whether the row passes. Rows with a null or missing cell never pass.
    pub fn matches(&self, row: &Row) -> bool {
        let Some(cell) = row.text(&self.column) else {
            return false;
        };
        self.allowed
            .iter()
            .filter_map(cell_text)
            .any(|allowed| allowed == cell)
    }

    fn describe(&self) -> String {
        match self.allowed.as_slice() {
            [single] => format!("{} == {}", self.column, single),
            many => format!("{} in {}", self.column, Value::Array(many.to_vec())),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Clean and filter rows.
///
/// A filter whose column appears in no row is skipped with a warning.
pub fn prepare_rows(rows: Vec<Row>, filters: &[RowFilter]) -> Vec<Row> {
    let total = rows.len();
    let mut rows: Vec<Row> = rows
        .into_iter()
        .filter(|row| !row.iter().all(|(_, v)| is_blank(v)))
        .map(|mut row| {
            for value in row.values_mut() {
                if let Value::String(s) = value {
                    let trimmed = s.trim();
                    if trimmed.len() != s.len() {
                        *s = trimmed.to_string();
                    }
                }
            }
            row
        })
        .collect();
    tracing::info!(removed = total - rows.len(), remaining = rows.len(), "removed empty rows");

    for filter in filters {
        if !rows.iter().any(|row| row.contains(&filter.column)) {
            tracing::warn!(column = %filter.column, "filter column not found; skipping");
            continue;
        }
        rows.retain(|row| filter.matches(row));
        tracing::info!(remaining = rows.len(), "applied filter: {}", filter.describe());
    }
    rows
}
