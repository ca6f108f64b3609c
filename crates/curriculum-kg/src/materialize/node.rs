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

//! Node materialization.

use super::{
    element_key, is_null_key, placeholder_text, read_array, resolve_properties, system_clock,
    ArrayCell, Clock, MaterializeStats, Properties,
};
use crate::coerce::{coerce, convert_for_store};
use crate::config::{IdFieldSpec, NodeMapping};
use crate::cypher::CypherValue;
use crate::registry::IdentityRegistry;
use crate::table::Row;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A materialized node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    /// The identity value: the typed business key, or a surrogate UUID.
    pub generated_id: CypherValue,
    /// The business key as read from the source.
    pub business_key: String,
    /// Node label.
    pub label: String,
    /// Properties, including the identity property.
    pub properties: Properties,
}

/// Turns rows into deduplicated node records.
///
/// One materializer serves one run: its registry remembers every key it has
/// emitted, across all mappings and calls.
pub struct NodeMaterializer {
    registry: IdentityRegistry,
    clock: Clock,
    stats: MaterializeStats,
}

impl Default for NodeMaterializer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeMaterializer")
            .field("registry", &self.registry)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl NodeMaterializer {
    /// Create a materializer with an empty registry and the system clock.
    pub fn new() -> Self {
        Self {
            registry: IdentityRegistry::new(),
            clock: system_clock(),
            stats: MaterializeStats::default(),
        }
    }

    /// Use `clock` for `current_timestamp` properties.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The identity registry built so far.
    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Counters across every call so far.
    pub fn stats(&self) -> MaterializeStats {
        self.stats
    }

    /// Materialize the nodes of one mapping.
    pub fn materialize(&mut self, rows: &[Row], mapping: &NodeMapping) -> Vec<NodeRecord> {
        let before = self.stats;
        let mut records = Vec::new();

        match &mapping.id_field {
            IdFieldSpec::StaticSynthetic { value } => {
                if let Some(record) = self.admit(mapping, value, None, None) {
                    records.push(record);
                }
            }
            IdFieldSpec::SourceField { column } => {
                for row in rows {
                    match row.text(column).filter(|k| !is_null_key(k)) {
                        Some(key) => records.extend(self.admit(mapping, &key, Some(row), None)),
                        None => self.skip(mapping, "missing id value"),
                    }
                }
            }
            IdFieldSpec::TemplatedSynthetic { template } => {
                for row in rows {
                    let key = template
                        .render(|c| placeholder_text(row, c))
                        .filter(|k| !is_null_key(k));
                    match key {
                        Some(key) => records.extend(self.admit(mapping, &key, Some(row), None)),
                        None => self.skip(mapping, "template placeholder unresolved"),
                    }
                }
            }
            IdFieldSpec::ArrayExpansion {
                source_column,
                id_key,
            } => {
                for row in rows {
                    let items = match read_array(row, source_column) {
                        ArrayCell::Items(items) => items,
                        ArrayCell::Absent => continue,
                        ArrayCell::Unparseable => {
                            warn!(
                                label = %mapping.label,
                                column = %source_column,
                                "skipping row with unparseable array"
                            );
                            self.stats.skipped += 1;
                            continue;
                        }
                    };
                    for item in &items {
                        match element_key(item, id_key) {
                            Some(key) => records.extend(self.admit(
                                mapping,
                                &key,
                                Some(row),
                                item.as_object(),
                            )),
                            None => self.skip(mapping, "array element without id key"),
                        }
                    }
                }
            }
        }

        info!(
            label = %mapping.label,
            strategy = mapping.id_field.kind(),
            records = records.len(),
            duplicates = self.stats.duplicates - before.duplicates,
            skipped = self.stats.skipped - before.skipped,
            "materialized nodes"
        );
        records
    }

    fn skip(&mut self, mapping: &NodeMapping, reason: &str) {
        debug!(label = %mapping.label, reason, "skipping node source");
        self.stats.skipped += 1;
    }

    /// Register `key` and build its record, or count a duplicate.
    fn admit(
        &mut self,
        mapping: &NodeMapping,
        key: &str,
        row: Option<&Row>,
        object: Option<&Map<String, Value>>,
    ) -> Option<NodeRecord> {
        let typed_key = convert_for_store(
            &coerce(&Value::String(key.to_string()), mapping.id_type),
            mapping.id_type,
        );
        let canonical = canonical_key(&typed_key, key);
        if self.registry.contains(&mapping.label, &canonical) {
            self.stats.duplicates += 1;
            return None;
        }

        let generated_id = if mapping.generate_surrogate_key {
            CypherValue::String(Uuid::new_v4().to_string())
        } else {
            typed_key
        };
        self.registry
            .register(&mapping.label, &canonical, generated_id.to_text());

        let mut properties = Properties::new();
        properties.insert(mapping.id_property.clone(), generated_id.clone());
        properties.extend(
            resolve_properties(&mapping.properties, row, object, &self.clock)
                .into_iter()
                .filter(|(name, _)| *name != mapping.id_property),
        );

        self.stats.records += 1;
        Some(NodeRecord {
            generated_id,
            business_key: key.trim().to_string(),
            label: mapping.label.clone(),
            properties,
        })
    }
}

/// The registry key for a business key: its typed form as text.
pub(crate) fn canonical_key(typed: &CypherValue, raw: &str) -> String {
    match typed {
        CypherValue::Null => raw.trim().to_string(),
        other => other.to_text(),
    }
}
