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

//! Materialization of table rows into graph records.
//!
//! [`NodeMaterializer`] owns the per-run
//! [`IdentityRegistry`](crate::registry::IdentityRegistry). The
//! [`RelationshipMaterializer`] borrows it read-only, so node mappings must
//! be materialized before any relationship mapping.

pub mod node;
pub mod relationship;

pub use node::{NodeMaterializer, NodeRecord};
pub use relationship::{RelationshipMaterializer, RelationshipRecord};

use crate::coerce::{coerce, convert_for_store, is_absent};
use crate::config::{PropertySource, PropertySpecs};
use crate::cypher::CypherValue;
use crate::structured::parse_array;
use crate::table::{cell_text, Row};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Source of the value written for `current_timestamp` properties.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// Record properties in declaration order.
pub type Properties = IndexMap<String, CypherValue>;

/// Local wall-clock time in ISO-8601 form with microseconds.
pub fn system_clock() -> Clock {
    Arc::new(|| {
        chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string()
    })
}

/// A clock that always returns `timestamp`.
pub fn fixed_clock(timestamp: impl Into<String>) -> Clock {
    let timestamp = timestamp.into();
    Arc::new(move || timestamp.clone())
}

/// Counters collected while materializing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeStats {
    /// Records emitted.
    pub records: usize,
    /// Keys or triples dropped because they were already emitted.
    pub duplicates: usize,
    /// Rows or pairs that could not be resolved.
    pub skipped: usize,
}

impl MaterializeStats {
    /// Add another set of counters to this one.
    pub fn merge(&mut self, other: &MaterializeStats) {
        self.records += other.records;
        self.duplicates += other.duplicates;
        self.skipped += other.skipped;
    }
}

/// Every record produced by one run, grouped by mapping key in
/// declaration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaterializedGraph {
    /// Node records per node mapping key.
    pub nodes: Vec<(String, Vec<NodeRecord>)>,
    /// Relationship records per relationship mapping key.
    pub relationships: Vec<(String, Vec<RelationshipRecord>)>,
    /// Node materialization counters.
    pub node_stats: MaterializeStats,
    /// Relationship materialization counters.
    pub relationship_stats: MaterializeStats,
}

impl MaterializedGraph {
    /// All node records, in mapping order.
    pub fn node_records(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.iter().flat_map(|(_, records)| records)
    }

    /// All relationship records, in mapping order.
    pub fn relationship_records(&self) -> impl Iterator<Item = &RelationshipRecord> {
        self.relationships.iter().flat_map(|(_, records)| records)
    }

    /// Records produced for one node mapping.
    pub fn nodes_for(&self, key: &str) -> &[NodeRecord] {
        self.nodes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, records)| records.as_slice())
            .unwrap_or_default()
    }

    /// Records produced for one relationship mapping.
    pub fn relationships_for(&self, key: &str) -> &[RelationshipRecord] {
        self.relationships
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, records)| records.as_slice())
            .unwrap_or_default()
    }

    /// Total node records.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(|(_, r)| r.len()).sum()
    }

    /// Total relationship records.
    pub fn relationship_count(&self) -> usize {
        self.relationships.iter().map(|(_, r)| r.len()).sum()
    }
}

/// Empty, `nan`, `null`, and `none` keys identify nothing.
pub(crate) fn is_null_key(key: &str) -> bool {
    let t = key.trim();
    t.is_empty()
        || t.eq_ignore_ascii_case("nan")
        || t.eq_ignore_ascii_case("null")
        || t.eq_ignore_ascii_case("none")
}

/// Text substituted for a template placeholder. Absent and null-like
/// cells resolve to nothing, so the template does not render.
pub(crate) fn placeholder_text(row: &Row, column: &str) -> Option<String> {
    row.get_present(column)
        .filter(|v| !is_absent(v))
        .and_then(cell_text)
        .filter(|t| !is_null_key(t))
}

/// Outcome of reading an array-valued cell.
pub(crate) enum ArrayCell {
    /// Column missing, null, or blank.
    Absent,
    /// Text that does not parse as an array.
    Unparseable,
    /// Parsed items.
    Items(Vec<Value>),
}

pub(crate) fn read_array(row: &Row, column: &str) -> ArrayCell {
    match row.get_present(column) {
        None => ArrayCell::Absent,
        Some(Value::Array(items)) => ArrayCell::Items(items.clone()),
        Some(Value::String(s)) if s.trim().is_empty() => ArrayCell::Absent,
        Some(Value::String(s)) => match parse_array(s) {
            Some(items) => ArrayCell::Items(items),
            None => ArrayCell::Unparseable,
        },
        Some(_) => ArrayCell::Unparseable,
    }
}

/// The business key held under `id_key` in an array element, if the
/// element is an object with a usable key.
pub(crate) fn element_key(item: &Value, id_key: &str) -> Option<String> {
    let key = cell_text(item.as_object()?.get(id_key)?)?;
    if is_null_key(&key) {
        None
    } else {
        Some(key)
    }
}

/// Resolve mapped properties. `object` is consulted before the row for
/// column-backed properties. Null results are omitted and lists are
/// stored as JSON strings.
pub(crate) fn resolve_properties(
    specs: &PropertySpecs,
    row: Option<&Row>,
    object: Option<&Map<String, Value>>,
    clock: &Clock,
) -> Properties {
    let mut properties = Properties::new();
    for (name, spec) in specs {
        let value = match &spec.source {
            PropertySource::Synthetic(value) => coerce(value, spec.target_type),
            PropertySource::CurrentTimestamp => coerce(&Value::String(clock()), spec.target_type),
            PropertySource::Column(column) => {
                let raw = object
                    .and_then(|o| o.get(column))
                    .filter(|v| !v.is_null())
                    .or_else(|| row.and_then(|r| r.get_present(column)));
                match raw {
                    Some(raw) => coerce(raw, spec.target_type),
                    None => CypherValue::Null,
                }
            }
        };
        if !value.is_null() {
            properties.insert(name.clone(), convert_for_store(&value, spec.target_type));
        }
    }
    properties
}
