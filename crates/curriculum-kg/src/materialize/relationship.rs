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

//! Relationship materialization, including array-expansion fan-out.

use super::node::canonical_key;
use super::{
    element_key, is_null_key, placeholder_text, read_array, resolve_properties, system_clock,
    ArrayCell, Clock, MaterializeStats, Properties,
};
use crate::coerce::{coerce, convert_for_store};
use crate::config::{IdFieldSpec, MappingConfig, NodeMapping, RelationshipMapping};
use crate::cypher::CypherValue;
use crate::error::{MigrationError, Result};
use crate::registry::IdentityRegistry;
use crate::table::Row;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info};

/// A materialized relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipRecord {
    /// Identity value of the start node.
    pub start_id: CypherValue,
    /// Identity value of the end node.
    pub end_id: CypherValue,
    /// Relationship type.
    pub relationship_type: String,
    /// Label of the start node.
    pub start_label: String,
    /// Label of the end node.
    pub end_label: String,
    /// Properties.
    pub properties: Properties,
}

/// A resolved endpoint: the value written on the relationship and the text
/// used for deduplication.
struct Endpoint {
    id: CypherValue,
    key: String,
}

/// Turns rows into deduplicated relationship records.
///
/// Reads the identity registry built by the node materializer. Triples are
/// deduplicated across every call on the same instance.
pub struct RelationshipMaterializer<'a> {
    config: &'a MappingConfig,
    registry: &'a IdentityRegistry,
    seen: HashSet<(String, String, String)>,
    clock: Clock,
    stats: MaterializeStats,
}

impl<'a> RelationshipMaterializer<'a> {
    /// Create a materializer over a validated mapping and a filled registry.
    pub fn new(config: &'a MappingConfig, registry: &'a IdentityRegistry) -> Self {
        Self {
            config,
            registry,
            seen: HashSet::new(),
            clock: system_clock(),
            stats: MaterializeStats::default(),
        }
    }

    /// Use `clock` for `current_timestamp` properties.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Counters across every call so far.
    pub fn stats(&self) -> MaterializeStats {
        self.stats
    }

    /// Materialize the relationships of one mapping.
    ///
    /// Fails only when the mapping names a node type the configuration does
    /// not declare.
    pub fn materialize(
        &mut self,
        rows: &[Row],
        mapping: &RelationshipMapping,
    ) -> Result<Vec<RelationshipRecord>> {
        let start_node = self.node_mapping(mapping, &mapping.start_node_type)?;
        let end_node = self.node_mapping(mapping, &mapping.end_node_type)?;
        let before = self.stats;
        let mut records = Vec::new();

        for row in rows {
            let starts = self.endpoints(row, &mapping.start_field, start_node);
            let ends = self.endpoints(row, &mapping.end_field, end_node);
            if starts.is_empty() || ends.is_empty() {
                self.stats.skipped += 1;
                debug!(
                    relationship_type = %mapping.relationship_type,
                    "skipping row without both endpoints"
                );
                continue;
            }

            for start in &starts {
                for end in &ends {
                    let triple = (
                        start.key.clone(),
                        end.key.clone(),
                        mapping.relationship_type.clone(),
                    );
                    if !self.seen.insert(triple) {
                        self.stats.duplicates += 1;
                        continue;
                    }
                    let properties =
                        resolve_properties(&mapping.properties, Some(row), None, &self.clock);
                    records.push(RelationshipRecord {
                        start_id: start.id.clone(),
                        end_id: end.id.clone(),
                        relationship_type: mapping.relationship_type.clone(),
                        start_label: start_node.label.clone(),
                        end_label: end_node.label.clone(),
                        properties,
                    });
                    self.stats.records += 1;
                }
            }
        }

        info!(
            relationship_type = %mapping.relationship_type,
            records = records.len(),
            duplicates = self.stats.duplicates - before.duplicates,
            skipped = self.stats.skipped - before.skipped,
            "materialized relationships"
        );
        Ok(records)
    }

    fn node_mapping(
        &self,
        mapping: &RelationshipMapping,
        node_type: &str,
    ) -> Result<&'a NodeMapping> {
        let config: &'a MappingConfig = self.config;
        config
            .node_mapping(node_type)
            .ok_or_else(|| MigrationError::Mapping {
                mapping: mapping.key.clone(),
                message: format!("undeclared node type '{}'", node_type),
            })
    }

    /// Candidate endpoints for one side of a relationship in one row.
    fn endpoints(&mut self, row: &Row, field: &str, node: &NodeMapping) -> Vec<Endpoint> {
        let keys: Vec<String> = match &node.id_field {
            IdFieldSpec::ArrayExpansion {
                source_column,
                id_key,
            } => {
                let column = if row.contains(source_column) {
                    source_column.as_str()
                } else {
                    field
                };
                match read_array(row, column) {
                    ArrayCell::Items(items) => {
                        items.iter().filter_map(|i| element_key(i, id_key)).collect()
                    }
                    ArrayCell::Absent | ArrayCell::Unparseable => Vec::new(),
                }
            }
            IdFieldSpec::StaticSynthetic { value } => {
                vec![row.text(field).unwrap_or_else(|| value.clone())]
            }
            IdFieldSpec::TemplatedSynthetic { template } => row
                .text(field)
                .or_else(|| {
                    if field == node.id_property || field == template.as_str() {
                        template.render(|c| placeholder_text(row, c))
                    } else {
                        None
                    }
                })
                .into_iter()
                .collect(),
            IdFieldSpec::SourceField { .. } => row.text(field).into_iter().collect(),
        };

        let mut endpoints = Vec::with_capacity(keys.len());
        for key in keys.iter().filter(|k| !is_null_key(k)) {
            let typed = convert_for_store(
                &coerce(&Value::String(key.clone()), node.id_type),
                node.id_type,
            );
            let canonical = canonical_key(&typed, key);
            if node.generate_surrogate_key {
                match self.registry.get(&node.label, &canonical) {
                    Some(surrogate) => endpoints.push(Endpoint {
                        id: CypherValue::String(surrogate.to_string()),
                        key: surrogate.to_string(),
                    }),
                    None => {
                        debug!(label = %node.label, key = %canonical, "unresolved surrogate key");
                        self.stats.skipped += 1;
                    }
                }
            } else {
                endpoints.push(Endpoint {
                    id: typed,
                    key: canonical,
                });
            }
        }
        endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PropertySpec, TargetType, Template};
    use crate::materialize::{fixed_clock, NodeMaterializer};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn thread_node() -> NodeMapping {
        NodeMapping::from_column("Thread", "unused").with_id_field(IdFieldSpec::ArrayExpansion {
            source_column: "threads".to_string(),
            id_key: "slug".to_string(),
        })
    }

    fn config(nodes: Vec<NodeMapping>, rels: Vec<RelationshipMapping>) -> MappingConfig {
        MappingConfig::new(nodes, rels).unwrap()
    }

    #[test]
    fn test_direct_endpoints_deduplicated() {
        let rel = RelationshipMapping::new("HAS_LESSON", "Unit", "unit_id", "Lesson", "lesson_id");
        let config = config(
            vec![
                NodeMapping::from_column("Unit", "unit_id"),
                NodeMapping::from_column("Lesson", "lesson_id"),
            ],
            vec![rel.clone()],
        );
        let rows = vec![
            Row::new().with("unit_id", "u1").with("lesson_id", "l1"),
            Row::new().with("unit_id", "u1").with("lesson_id", "l1"),
            Row::new().with("unit_id", "u1").with("lesson_id", "null"),
        ];
        let registry = IdentityRegistry::new();
        let mut materializer = RelationshipMaterializer::new(&config, &registry);
        let records = materializer.materialize(&rows, &rel).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].start_id, CypherValue::from("u1"));
        assert_eq!(records[0].end_label, "Lesson");
        assert_eq!(materializer.stats().duplicates, 1);
        assert_eq!(materializer.stats().skipped, 1);
    }

    #[test]
    fn test_cross_product_fan_out() {
        let topic = NodeMapping::from_column("Topic", "unused").with_id_field(
            IdFieldSpec::ArrayExpansion {
                source_column: "topics".to_string(),
                id_key: "id".to_string(),
            },
        );
        let rel = RelationshipMapping::new("COVERS", "Thread", "threads", "Topic", "topics");
        let config = config(vec![thread_node(), topic], vec![rel.clone()]);
        let rows = vec![Row::new()
            .with("threads", "[{'slug': 'A'}, {'slug': 'B'}]")
            .with("topics", r#"[{"id": "C"}, {"id": "D"}]"#)];
        let registry = IdentityRegistry::new();
        let mut materializer = RelationshipMaterializer::new(&config, &registry);
        let records = materializer.materialize(&rows, &rel).unwrap();
        let pairs: Vec<_> = records
            .iter()
            .map(|r| format!("{}{}", r.start_id.to_text(), r.end_id.to_text()))
            .collect();
        assert_eq!(pairs, vec!["AC", "AD", "BC", "BD"]);
    }

    #[test]
    fn test_one_side_expanded() {
        let rel = RelationshipMapping::new("IN_THREAD", "Unit", "unit_id", "Thread", "threads")
            .with_property("source", PropertySpec::column("source", TargetType::String));
        let config = config(
            vec![NodeMapping::from_column("Unit", "unit_id"), thread_node()],
            vec![rel.clone()],
        );
        let rows = vec![
            Row::new()
                .with("unit_id", "1")
                .with("source", "api")
                .with("threads", "[{'slug': 'x'}, {'slug': 'y'}]"),
            Row::new().with("unit_id", "2").with("threads", "[]"),
        ];
        let registry = IdentityRegistry::new();
        let mut materializer = RelationshipMaterializer::new(&config, &registry);
        let records = materializer.materialize(&rows, &rel).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.properties["source"] == CypherValue::from("api")));
    }

    #[test]
    fn test_synthetic_endpoints() {
        let programme = NodeMapping::from_column("Programme", "unused").with_id_field(
            IdFieldSpec::StaticSynthetic {
                value: "national".to_string(),
            },
        );
        let variant = NodeMapping::from_column("Variant", "unused")
            .with_identity("variantId", TargetType::String)
            .with_id_field(IdFieldSpec::TemplatedSynthetic {
                template: Template::parse("{unit_id}-{tier}").unwrap(),
            });
        let rel = RelationshipMapping::new("HAS_VARIANT", "Programme", "programmeId", "Variant", "variantId");
        let config = config(vec![programme, variant], vec![rel.clone()]);
        let rows = vec![Row::new().with("unit_id", "3").with("tier", "core")];
        let registry = IdentityRegistry::new();
        let mut materializer = RelationshipMaterializer::new(&config, &registry);
        let records = materializer.materialize(&rows, &rel).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].start_id, CypherValue::from("national"));
        assert_eq!(records[0].end_id, CypherValue::from("3-core"));
    }

    #[test]
    fn test_surrogate_endpoints_resolved_through_registry() {
        let unit = NodeMapping::from_column("Unit", "unit_id").with_surrogate_keys();
        let lesson = NodeMapping::from_column("Lesson", "lesson_id");
        let rel = RelationshipMapping::new("HAS_LESSON", "Unit", "unit_id", "Lesson", "lesson_id");
        let config = config(vec![unit.clone(), lesson], vec![rel.clone()]);
        let rows = vec![
            Row::new().with("unit_id", "1").with("lesson_id", "a"),
            Row::new().with("unit_id", "9").with("lesson_id", "b"),
        ];

        let mut nodes = NodeMaterializer::new();
        let units = nodes.materialize(&rows[..1], &unit);
        let mut materializer = RelationshipMaterializer::new(&config, nodes.registry());
        let records = materializer.materialize(&rows, &rel).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].start_id, units[0].generated_id);
        assert_eq!(materializer.stats().skipped, 2);
    }

    #[test]
    fn test_timestamp_evaluated_per_pair() {
        let rel = RelationshipMapping::new("IN_THREAD", "Unit", "unit_id", "Thread", "threads")
            .with_property("linkedAt", PropertySpec::timestamp(TargetType::Datetime));
        let config = config(
            vec![NodeMapping::from_column("Unit", "unit_id"), thread_node()],
            vec![rel.clone()],
        );
        let rows = vec![Row::new()
            .with("unit_id", "1")
            .with("threads", "[{'slug': 'x'}, {'slug': 'y'}, {'slug': 'z'}]")];
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let clock: Clock = Arc::new(move || counter.fetch_add(1, Ordering::SeqCst).to_string());

        let registry = IdentityRegistry::new();
        let mut materializer = RelationshipMaterializer::new(&config, &registry).with_clock(clock);
        let records = materializer.materialize(&rows, &rel).unwrap();
        let stamps: Vec<_> = records.iter().map(|r| r.properties["linkedAt"].to_text()).collect();
        assert_eq!(stamps, vec!["0", "1", "2"]);
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_undeclared_endpoint_is_an_error() {
        let config = config(vec![NodeMapping::from_column("Unit", "unit_id")], vec![]);
        let rel = RelationshipMapping::new("R", "Unit", "unit_id", "Ghost", "ghost_id");
        let registry = IdentityRegistry::new();
        let mut materializer =
            RelationshipMaterializer::new(&config, &registry).with_clock(fixed_clock("t"));
        assert!(materializer.materialize(&[], &rel).is_err());
    }
}
