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

//! Batch planning.
//!
//! Records are grouped by label (nodes) or by relationship type and endpoint
//! labels, split into shards, then into batches. Every batch carries the
//! parametrized write template for its group; the rows are submitted as
//! `$batch`.

use crate::coerce::convert_for_store;
use crate::config::{LoadConfig, MappingConfig, NodeMapping, TargetType};
use crate::cypher::{
    escape_identifier, escape_label, escape_relationship_type, to_identifier, CypherStatement,
    CypherValue,
};
use crate::error::{MigrationError, Result};
use crate::materialize::{NodeRecord, RelationshipRecord};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Name of the query parameter holding a batch's rows.
pub const BATCH_PARAMETER: &str = "batch";

/// Whether a batch writes nodes or relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    /// Node upserts.
    Node,
    /// Relationship merges.
    Relationship,
}

/// What a write template writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WriteTarget {
    /// Upsert nodes of one label, matched on the identity property.
    Node {
        /// Node label.
        label: String,
        /// Identity property.
        id_property: String,
    },
    /// Merge relationships of one type between two labels.
    Relationship {
        /// Relationship type.
        relationship_type: String,
        /// Start node label.
        start_label: String,
        /// Start node identity property.
        start_id_property: String,
        /// End node label.
        end_label: String,
        /// End node identity property.
        end_id_property: String,
    },
}

/// A parametrized write shared by every batch of a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteTemplate {
    /// Structured description of the write.
    pub target: WriteTarget,
    /// The Cypher text, taking rows as `$batch`.
    pub query: String,
    /// Declared type of each property written.
    pub property_types: BTreeMap<String, TargetType>,
}

impl WriteTemplate {
    /// Template for a node label.
    pub fn node(
        label: &str,
        id_property: &str,
        property_types: BTreeMap<String, TargetType>,
    ) -> Self {
        let id = escape_identifier(id_property);
        let mut query = format!(
            "UNWIND ${} AS row\nMERGE (n{} {{{}: row.{}}})",
            BATCH_PARAMETER,
            escape_label(label),
            id,
            id
        );
        query.push_str(&set_clause(
            "n",
            property_types.keys().filter(|k| k.as_str() != id_property),
        ));
        Self {
            target: WriteTarget::Node {
                label: label.to_string(),
                id_property: id_property.to_string(),
            },
            query,
            property_types,
        }
    }

    /// Template for a relationship type between two labels.
    pub fn relationship(
        relationship_type: &str,
        (start_label, start_id_property): (&str, &str),
        (end_label, end_id_property): (&str, &str),
        property_types: BTreeMap<String, TargetType>,
    ) -> Self {
        let mut query = format!(
            "UNWIND ${} AS row\n\
             MATCH (start{} {{{}: row.start_id}})\n\
             MATCH (end{} {{{}: row.end_id}})\n\
             MERGE (start)-[r{}]->(end)",
            BATCH_PARAMETER,
            escape_label(start_label),
            escape_identifier(start_id_property),
            escape_label(end_label),
            escape_identifier(end_id_property),
            escape_relationship_type(relationship_type),
        );
        query.push_str(&set_clause("r", property_types.keys()));
        Self {
            target: WriteTarget::Relationship {
                relationship_type: relationship_type.to_string(),
                start_label: start_label.to_string(),
                start_id_property: start_id_property.to_string(),
                end_label: end_label.to_string(),
                end_id_property: end_id_property.to_string(),
            },
            query,
            property_types,
        }
    }

    /// Declared type of a property, `string` when undeclared.
    pub fn property_type(&self, name: &str) -> TargetType {
        self.property_types.get(name).copied().unwrap_or_default()
    }
}

fn set_clause<'a>(variable: &str, names: impl Iterator<Item = &'a String>) -> String {
    let assignments: Vec<String> = names
        .map(|name| {
            let escaped = escape_identifier(name);
            format!("{}: row.{}", escaped, escaped)
        })
        .collect();
    if assignments.is_empty() {
        String::new()
    } else {
        format!("\nSET {} += {{{}}}", variable, assignments.join(", "))
    }
}

/// A bounded group of rows written in one transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    /// Node or relationship batch.
    pub kind: BatchKind,
    /// Label or relationship type.
    pub group: String,
    /// 0-based shard within the group.
    pub shard_index: usize,
    /// 1-based batch within the label or relationship type, counted across
    /// shards and endpoint-label groups.
    pub batch_index: usize,
    /// Shared write template.
    pub template: Arc<WriteTemplate>,
    /// Parameter rows, already converted for the store.
    pub rows: Vec<CypherValue>,
}

impl Batch {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The batch as a parametrized statement.
    pub fn statement(&self) -> CypherStatement {
        let statement = match self.kind {
            BatchKind::Node => CypherStatement::create_node(self.template.query.clone()),
            BatchKind::Relationship => {
                CypherStatement::create_relationship(self.template.query.clone())
            }
        };
        statement
            .with_param(BATCH_PARAMETER, CypherValue::List(self.rows.clone()))
            .with_comment(format!(
                "{} batch {} ({} rows, shard {})",
                self.group,
                self.batch_index,
                self.rows.len(),
                self.shard_index
            ))
    }
}

/// Split `items` into shards of at most `shard_size`, then each shard into
/// chunks of at most `batch_size`. Yields `(shard_index, chunk)`.
pub fn partition<T>(items: &[T], batch_size: usize, shard_size: usize) -> Vec<(usize, &[T])> {
    items
        .chunks(shard_size.max(1))
        .enumerate()
        .flat_map(|(shard, shard_items)| {
            shard_items
                .chunks(batch_size.max(1))
                .map(move |chunk| (shard, chunk))
        })
        .collect()
}

/// Groups records and turns them into batches.
#[derive(Debug, Clone, Copy)]
pub struct BatchPlanner<'a> {
    config: &'a MappingConfig,
    load: &'a LoadConfig,
}

impl<'a> BatchPlanner<'a> {
    /// Create a planner. Zero batch or shard sizes are rejected.
    pub fn new(config: &'a MappingConfig, load: &'a LoadConfig) -> Result<Self> {
        load.validate()?;
        Ok(Self { config, load })
    }

    /// Plan node and relationship batches. Node batches come first.
    pub fn plan<'r>(
        &self,
        nodes: impl IntoIterator<Item = &'r NodeRecord>,
        relationships: impl IntoIterator<Item = &'r RelationshipRecord>,
    ) -> Result<Vec<Batch>> {
        let mut batches = self.plan_nodes(nodes)?;
        let node_batches = batches.len();
        batches.extend(self.plan_relationships(relationships)?);
        tracing::info!(
            node_batches,
            relationship_batches = batches.len() - node_batches,
            "planned batches"
        );
        Ok(batches)
    }

    /// Plan node batches, one group per label in first-appearance order.
    pub fn plan_nodes<'r>(
        &self,
        records: impl IntoIterator<Item = &'r NodeRecord>,
    ) -> Result<Vec<Batch>> {
        let mut batches = Vec::new();
        for (label, group) in group_in_order(records, |r| r.label.clone()) {
            let mapping = self.first_node_mapping(&label)?;
            let id_property = mapping.id_property.as_str();
            let id_type = if mapping.generate_surrogate_key {
                TargetType::String
            } else {
                mapping.id_type
            };
            let template = Arc::new(self.node_template(&label, id_property));
            let rows: Vec<CypherValue> = group
                .iter()
                .map(|record| {
                    CypherValue::Map(
                        record
                            .properties
                            .iter()
                            .map(|(name, value)| {
                                let target = if name == id_property {
                                    id_type
                                } else {
                                    template.property_type(name)
                                };
                                (name.clone(), convert_for_store(value, target))
                            })
                            .collect(),
                    )
                })
                .collect();
            batches.extend(self.split(BatchKind::Node, &label, &template, rows, 1));
        }
        Ok(batches)
    }

    /// Plan relationship batches, one group per type and endpoint labels in
    /// first-appearance order. Groups sharing a type continue its batch
    /// numbering.
    pub fn plan_relationships<'r>(
        &self,
        records: impl IntoIterator<Item = &'r RelationshipRecord>,
    ) -> Result<Vec<Batch>> {
        let mut batches = Vec::new();
        let mut next_index: HashMap<String, usize> = HashMap::new();
        let groups = group_in_order(records, |r| {
            (
                r.relationship_type.clone(),
                r.start_label.clone(),
                r.end_label.clone(),
            )
        });
        for ((relationship_type, start_label, end_label), group) in groups {
            let template = Arc::new(self.relationship_template(
                &relationship_type,
                &start_label,
                &end_label,
            )?);
            let rows: Vec<CypherValue> = group
                .iter()
                .map(|record| {
                    let mut row: BTreeMap<String, CypherValue> = record
                        .properties
                        .iter()
                        .map(|(name, value)| {
                            (name.clone(), convert_for_store(value, template.property_type(name)))
                        })
                        .collect();
                    row.insert("start_id".to_string(), record.start_id.clone());
                    row.insert("end_id".to_string(), record.end_id.clone());
                    CypherValue::Map(row)
                })
                .collect();
            let first_index = next_index.entry(relationship_type.clone()).or_insert(1);
            let split = self.split(
                BatchKind::Relationship,
                &relationship_type,
                &template,
                rows,
                *first_index,
            );
            *first_index += split.len();
            batches.extend(split);
        }
        Ok(batches)
    }

    /// One uniqueness constraint per declared label on its identity property.
    pub fn constraints(&self) -> Vec<CypherStatement> {
        let mut seen = Vec::new();
        let mut statements = Vec::new();
        for node in &self.config.nodes {
            if seen.contains(&&node.label) {
                continue;
            }
            seen.push(&node.label);
            let name = to_identifier(&format!(
                "{}_{}",
                node.label.to_lowercase(),
                node.id_property
            ));
            let query = format!(
                "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n{}) REQUIRE n.{} IS UNIQUE",
                escape_identifier(&name),
                escape_label(&node.label),
                escape_identifier(&node.id_property)
            );
            statements.push(
                CypherStatement::constraint(query)
                    .with_comment(format!("Ensure unique {} identities", node.label)),
            );
        }
        statements
    }

    fn split(
        &self,
        kind: BatchKind,
        group: &str,
        template: &Arc<WriteTemplate>,
        rows: Vec<CypherValue>,
        first_index: usize,
    ) -> Vec<Batch> {
        partition(&rows, self.load.batch_size, self.load.shard_size)
            .into_iter()
            .enumerate()
            .map(|(i, (shard_index, chunk))| Batch {
                kind,
                group: group.to_string(),
                shard_index,
                batch_index: first_index + i,
                template: Arc::clone(template),
                rows: chunk.to_vec(),
            })
            .collect()
    }

    fn first_node_mapping(&self, label: &str) -> Result<&'a NodeMapping> {
        let config: &'a MappingConfig = self.config;
        config
            .nodes
            .iter()
            .find(|n| n.label == label)
            .ok_or_else(|| {
                MigrationError::config(format!("no node mapping declares label '{}'", label))
            })
    }

    /// Property types are merged across every mapping sharing the label.
    fn node_template(&self, label: &str, id_property: &str) -> WriteTemplate {
        let mut property_types = BTreeMap::new();
        for mapping in self.config.nodes.iter().filter(|n| n.label == label) {
            for (name, spec) in &mapping.properties {
                property_types.entry(name.clone()).or_insert(spec.target_type);
            }
        }
        property_types.remove(id_property);
        WriteTemplate::node(label, id_property, property_types)
    }

    fn relationship_template(
        &self,
        relationship_type: &str,
        start_label: &str,
        end_label: &str,
    ) -> Result<WriteTemplate> {
        let start_id_property = &self.first_node_mapping(start_label)?.id_property;
        let end_id_property = &self.first_node_mapping(end_label)?.id_property;

        let mut property_types = BTreeMap::new();
        let mut declared = false;
        for mapping in &self.config.relationships {
            let endpoints_match = self
                .config
                .node_mapping(&mapping.start_node_type)
                .map(|n| n.label == start_label)
                .unwrap_or(false)
                && self
                    .config
                    .node_mapping(&mapping.end_node_type)
                    .map(|n| n.label == end_label)
                    .unwrap_or(false);
            if mapping.relationship_type == relationship_type && endpoints_match {
                declared = true;
                for (name, spec) in &mapping.properties {
                    property_types.entry(name.clone()).or_insert(spec.target_type);
                }
            }
        }
        if !declared {
            return Err(MigrationError::config(format!(
                "no relationship mapping declares {} from {} to {}",
                relationship_type, start_label, end_label
            )));
        }

        Ok(WriteTemplate::relationship(
            relationship_type,
            (start_label, start_id_property),
            (end_label, end_id_property),
            property_types,
        ))
    }
}

/// Plan batches for a materialized graph with the given tunables.
pub fn plan_batches<'r>(
    config: &MappingConfig,
    nodes: impl IntoIterator<Item = &'r NodeRecord>,
    relationships: impl IntoIterator<Item = &'r RelationshipRecord>,
    load: &LoadConfig,
) -> Result<Vec<Batch>> {
    BatchPlanner::new(config, load)?.plan(nodes, relationships)
}

/// Group items by key, keeping groups and members in first-appearance order.
fn group_in_order<'r, T: 'r, K, F>(
    items: impl IntoIterator<Item = &'r T>,
    key: F,
) -> Vec<(K, Vec<&'r T>)>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut groups: Vec<(K, Vec<&'r T>)> = Vec::new();
    for item in items {
        let k = key(item);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, members)) => members.push(item),
            None => groups.push((k, vec![item])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NodeMapping, PropertySpec, RelationshipMapping};
    use crate::materialize::Properties;

    fn config() -> MappingConfig {
        MappingConfig::new(
            vec![
                NodeMapping::from_column("Unit", "unit_id")
                    .with_identity("unitId", TargetType::Int)
                    .with_property("title", PropertySpec::column("unit_title", TargetType::String))
                    .with_property("order", PropertySpec::column("unit_order", TargetType::Int)),
                NodeMapping::from_column("Lesson", "lesson_id").with_identity("lessonId", TargetType::String),
            ],
            vec![RelationshipMapping::new("HAS_LESSON", "Unit", "unit_id", "Lesson", "lesson_id")
                .with_property("position", PropertySpec::column("pos", TargetType::Int))],
        )
        .unwrap()
    }

    fn unit(id: i64) -> NodeRecord {
        let mut properties = Properties::new();
        properties.insert("unitId".to_string(), CypherValue::Int(id));
        properties.insert("order".to_string(), CypherValue::from("3"));
        NodeRecord {
            generated_id: CypherValue::Int(id),
            business_key: id.to_string(),
            label: "Unit".to_string(),
            properties,
        }
    }

    fn no_relationships() -> &'static [RelationshipRecord] {
        &[]
    }

    fn lesson(id: &str) -> NodeRecord {
        let mut properties = Properties::new();
        properties.insert("lessonId".to_string(), CypherValue::from(id));
        NodeRecord {
            generated_id: CypherValue::from(id),
            business_key: id.to_string(),
            label: "Lesson".to_string(),
            properties,
        }
    }

    #[test]
    fn test_partition_sizes() {
        let items: Vec<usize> = (0..2500).collect();
        let sizes: Vec<usize> = partition(&items, 1000, 10_000).iter().map(|(_, c)| c.len()).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);

        let items: Vec<usize> = (0..25_000).collect();
        let parts = partition(&items, 1000, 10_000);
        let shards: std::collections::BTreeSet<usize> = parts.iter().map(|(s, _)| *s).collect();
        assert_eq!(shards.len(), 3);
        assert_eq!(parts.len(), 25);
        assert!(partition::<u8>(&[], 10, 10).is_empty());
    }

    #[test]
    fn test_shards_do_not_straddle_batches() {
        let items: Vec<usize> = (0..25).collect();
        let sizes: Vec<(usize, usize)> = partition(&items, 4, 10)
            .iter()
            .map(|(s, c)| (*s, c.len()))
            .collect();
        assert_eq!(
            sizes,
            vec![(0, 4), (0, 4), (0, 2), (1, 4), (1, 4), (1, 2), (2, 4), (2, 1)]
        );
    }

    #[test]
    fn test_node_template_text() {
        let template = WriteTemplate::node(
            "Unit",
            "unitId",
            BTreeMap::from([("title".to_string(), TargetType::String)]),
        );
        assert_eq!(
            template.query,
            "UNWIND $batch AS row\nMERGE (n:Unit {unitId: row.unitId})\nSET n += {title: row.title}"
        );
        let bare = WriteTemplate::node("Unit", "unitId", BTreeMap::new());
        assert!(!bare.query.contains("SET"));
    }

    #[test]
    fn test_relationship_template_text() {
        let template = WriteTemplate::relationship(
            "HAS_LESSON",
            ("Unit", "unitId"),
            ("Lesson", "lessonId"),
            BTreeMap::new(),
        );
        assert_eq!(
            template.query,
            "UNWIND $batch AS row\n\
             MATCH (start:Unit {unitId: row.start_id})\n\
             MATCH (end:Lesson {lessonId: row.end_id})\n\
             MERGE (start)-[r:HAS_LESSON]->(end)"
        );
    }

    #[test]
    fn test_batches_are_grouped_and_indexed() {
        let config = config();
        let load = LoadConfig::new().with_batch_size(2);
        let planner = BatchPlanner::new(&config, &load).unwrap();
        let records = vec![unit(1), lesson("a"), unit(2), unit(3), lesson("b")];
        let batches = planner.plan_nodes(&records).unwrap();

        let summary: Vec<(String, usize, usize)> = batches
            .iter()
            .map(|b| (b.group.clone(), b.batch_index, b.len()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Unit".to_string(), 1, 2),
                ("Unit".to_string(), 2, 1),
                ("Lesson".to_string(), 1, 2),
            ]
        );
        assert!(Arc::ptr_eq(&batches[0].template, &batches[1].template));
    }

    #[test]
    fn test_runtime_conversion_uses_declared_types() {
        let config = config();
        let load = LoadConfig::new();
        let batches = BatchPlanner::new(&config, &load)
            .unwrap()
            .plan_nodes(&[unit(9)])
            .unwrap();
        let CypherValue::Map(row) = &batches[0].rows[0] else {
            panic!("expected map row");
        };
        assert_eq!(row["order"], CypherValue::Int(3));
        assert_eq!(row["unitId"], CypherValue::Int(9));
    }

    #[test]
    fn test_relationship_rows() {
        let config = config();
        let load = LoadConfig::new();
        let mut properties = Properties::new();
        properties.insert("position".to_string(), CypherValue::from("2"));
        let record = RelationshipRecord {
            start_id: CypherValue::Int(1),
            end_id: CypherValue::from("a"),
            relationship_type: "HAS_LESSON".to_string(),
            start_label: "Unit".to_string(),
            end_label: "Lesson".to_string(),
            properties,
        };
        let batches = plan_batches(&config, &[unit(1)], &[record], &load).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].kind, BatchKind::Node);
        let rel = &batches[1];
        assert_eq!(rel.kind, BatchKind::Relationship);
        assert!(rel.template.query.contains("SET r += {position: row.position}"));
        let CypherValue::Map(row) = &rel.rows[0] else {
            panic!("expected map row");
        };
        assert_eq!(row["start_id"], CypherValue::Int(1));
        assert_eq!(row["position"], CypherValue::Int(2));
    }

    #[test]
    fn test_shared_type_numbers_batches_across_endpoints() {
        let config = MappingConfig::new(
            vec![
                NodeMapping::from_column("Unit", "unit_id").with_identity("unitId", TargetType::Int),
                NodeMapping::from_column("Lesson", "lesson_id").with_identity("lessonId", TargetType::String),
                NodeMapping::from_column("Quiz", "quiz_id").with_identity("quizId", TargetType::String),
            ],
            vec![
                RelationshipMapping::new("CONTAINS", "Unit", "unit_id", "Lesson", "lesson_id"),
                RelationshipMapping::new("CONTAINS", "Unit", "unit_id", "Quiz", "quiz_id"),
            ],
        )
        .unwrap();
        let load = LoadConfig::new().with_batch_size(1);
        let contains = |end_label: &str, end: &str| RelationshipRecord {
            start_id: CypherValue::Int(1),
            end_id: CypherValue::from(end),
            relationship_type: "CONTAINS".to_string(),
            start_label: "Unit".to_string(),
            end_label: end_label.to_string(),
            properties: Properties::new(),
        };
        let records = vec![
            contains("Lesson", "a"),
            contains("Quiz", "q1"),
            contains("Lesson", "b"),
            contains("Quiz", "q2"),
        ];

        let batches = BatchPlanner::new(&config, &load)
            .unwrap()
            .plan_relationships(&records)
            .unwrap();
        let indices: Vec<(String, usize)> = batches
            .iter()
            .map(|b| match &b.template.target {
                WriteTarget::Relationship { end_label, .. } => (end_label.clone(), b.batch_index),
                WriteTarget::Node { .. } => panic!("expected relationship template"),
            })
            .collect();
        assert_eq!(
            indices,
            vec![
                ("Lesson".to_string(), 1),
                ("Lesson".to_string(), 2),
                ("Quiz".to_string(), 3),
                ("Quiz".to_string(), 4),
            ]
        );
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let config = config();
        let load = LoadConfig::new().with_batch_size(0);
        assert!(BatchPlanner::new(&config, &load).is_err());
    }

    #[test]
    fn test_unknown_label_rejected() {
        let config = config();
        let load = LoadConfig::new();
        let mut stray = lesson("x");
        stray.label = "Ghost".to_string();
        assert!(plan_batches(&config, &[stray], no_relationships(), &load).is_err());
    }

    #[test]
    fn test_constraints_per_label() {
        let config = config();
        let load = LoadConfig::new();
        let statements = BatchPlanner::new(&config, &load).unwrap().constraints();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0].query,
            "CREATE CONSTRAINT unit_unitId IF NOT EXISTS FOR (n:Unit) REQUIRE n.unitId IS UNIQUE"
        );
    }

    #[test]
    fn test_batch_serializes_with_template() {
        let config = config();
        let load = LoadConfig::new();
        let batches = plan_batches(&config, &[lesson("a")], no_relationships(), &load).unwrap();
        let value = serde_json::to_value(&batches[0]).unwrap();
        assert_eq!(value["kind"], "node");
        assert_eq!(value["group"], "Lesson");
        assert_eq!(value["template"]["target"]["kind"], "node");
        assert_eq!(value["template"]["query"], batches[0].template.query.as_str());
        assert_eq!(value["rows"][0]["lessonId"], "a");
    }

    #[test]
    fn test_statement_carries_rows() {
        let config = config();
        let load = LoadConfig::new();
        let batches = plan_batches(&config, &[lesson("a")], no_relationships(), &load).unwrap();
        let rendered = batches[0].statement().render_inline();
        assert!(rendered.starts_with("UNWIND [{lessonId: 'a'}] AS row"));
    }
}
