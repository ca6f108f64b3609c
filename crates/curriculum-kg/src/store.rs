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

//! Graph store implementations.
//!
//! [`MemoryGraphStore`] evaluates upserts and merges in memory with the
//! counter semantics of a real database and can inject failures.
//! [`ScriptStore`] records every write as a Cypher statement for a dry run.

use crate::cypher::{CypherScript, CypherStatement, CypherValue};
use crate::loader::{ClearCounters, GraphStats, GraphStore, StoreError, WriteCounters};
use crate::plan::{WriteTarget, WriteTemplate, BATCH_PARAMETER};
use std::collections::{BTreeMap, HashMap, HashSet};

type Properties = BTreeMap<String, CypherValue>;

#[derive(Debug, Clone)]
struct StoredNode {
    label: String,
    properties: Properties,
}

#[derive(Debug, Clone)]
struct StoredRelationship {
    relationship_type: String,
    properties: Properties,
}

/// An in-memory graph store.
///
/// Nodes are matched on `(label, identity property, value)`; values of
/// different types never match (`1` and `'1'` are different keys).
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    nodes: Vec<StoredNode>,
    node_index: HashMap<(String, String, String), usize>,
    relationships: Vec<StoredRelationship>,
    relationship_index: HashMap<(usize, usize, String), usize>,
    constraints: Vec<String>,
    fail_writes: HashSet<usize>,
    writes: usize,
    fail_connect: bool,
    fail_clear: bool,
}

fn index_key(label: &str, property: &str, value: &CypherValue) -> (String, String, String) {
    (label.to_string(), property.to_string(), value.to_cypher_literal())
}

/// Apply `SET x += {...}` for the declared properties of a template.
fn set_properties(
    target: &mut Properties,
    declared: &BTreeMap<String, crate::config::TargetType>,
    row: &Properties,
    skip: &[&str],
) -> usize {
    let mut set = 0;
    for name in declared.keys().filter(|k| !skip.contains(&k.as_str())) {
        match row.get(name) {
            Some(value) if !value.is_null() => {
                target.insert(name.clone(), value.clone());
                set += 1;
            }
            _ => {
                if target.remove(name).is_some() {
                    set += 1;
                }
            }
        }
    }
    set
}

fn row_map(row: &CypherValue) -> Result<&Properties, StoreError> {
    match row {
        CypherValue::Map(map) => Ok(map),
        other => Err(StoreError::Write(format!(
            "expected a map row, got {}",
            other.to_cypher_literal()
        ))),
    }
}

impl MemoryGraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th call to `run_write` (1-based).
    pub fn fail_on_write(mut self, n: usize) -> Self {
        self.fail_writes.insert(n);
        self
    }

    /// Fail connectivity checks.
    pub fn fail_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Fail destructive clears.
    pub fn fail_clear(mut self) -> Self {
        self.fail_clear = true;
        self
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of relationships.
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Number of `run_write` calls so far, failed ones included.
    pub fn write_calls(&self) -> usize {
        self.writes
    }

    /// Constraint statements applied so far.
    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }

    /// Properties of the node with `label` whose `property` equals `value`.
    pub fn node(&self, label: &str, property: &str, value: &CypherValue) -> Option<&Properties> {
        self.node_index
            .get(&index_key(label, property, value))
            .map(|&i| &self.nodes[i].properties)
    }

    /// Properties of the relationship of `relationship_type` between two
    /// nodes, each given as `(label, identity property, value)`.
    pub fn relationship(
        &self,
        start: (&str, &str, &CypherValue),
        relationship_type: &str,
        end: (&str, &str, &CypherValue),
    ) -> Option<&Properties> {
        let s = *self.node_index.get(&index_key(start.0, start.1, start.2))?;
        let e = *self.node_index.get(&index_key(end.0, end.1, end.2))?;
        self.relationship_index
            .get(&(s, e, relationship_type.to_string()))
            .map(|&i| &self.relationships[i].properties)
    }

    fn upsert_nodes(
        &mut self,
        label: &str,
        id_property: &str,
        template: &WriteTemplate,
        rows: &[&Properties],
    ) -> Result<WriteCounters, StoreError> {
        // Validate the whole batch first so a failure leaves no partial writes.
        for row in rows {
            if row.get(id_property).map_or(true, CypherValue::is_null) {
                return Err(StoreError::Write(format!(
                    "cannot merge {} node using null property value for '{}'",
                    label, id_property
                )));
            }
        }

        let mut counters = WriteCounters::default();
        for row in rows {
            let id = &row[id_property];
            let key = index_key(label, id_property, id);
            let index = match self.node_index.get(&key) {
                Some(&i) => i,
                None => {
                    let mut properties = Properties::new();
                    properties.insert(id_property.to_string(), id.clone());
                    self.nodes.push(StoredNode {
                        label: label.to_string(),
                        properties,
                    });
                    self.node_index.insert(key, self.nodes.len() - 1);
                    counters.nodes_created += 1;
                    counters.properties_set += 1;
                    self.nodes.len() - 1
                }
            };
            counters.properties_set += set_properties(
                &mut self.nodes[index].properties,
                &template.property_types,
                row,
                &[id_property],
            );
        }
        Ok(counters)
    }

    fn merge_relationships(
        &mut self,
        relationship_type: &str,
        start: (&str, &str),
        end: (&str, &str),
        template: &WriteTemplate,
        rows: &[&Properties],
    ) -> WriteCounters {
        let mut counters = WriteCounters::default();
        for row in rows {
            let endpoint = |(label, property): (&str, &str), column: &str| {
                row.get(column)
                    .and_then(|id| self.node_index.get(&index_key(label, property, id)))
                    .copied()
            };
            // MATCH on a missing endpoint produces no rows.
            let (Some(s), Some(e)) = (endpoint(start, "start_id"), endpoint(end, "end_id")) else {
                continue;
            };
            let key = (s, e, relationship_type.to_string());
            let index = match self.relationship_index.get(&key) {
                Some(&i) => i,
                None => {
                    self.relationships.push(StoredRelationship {
                        relationship_type: relationship_type.to_string(),
                        properties: Properties::new(),
                    });
                    self.relationship_index.insert(key, self.relationships.len() - 1);
                    counters.relationships_created += 1;
                    self.relationships.len() - 1
                }
            };
            counters.properties_set += set_properties(
                &mut self.relationships[index].properties,
                &template.property_types,
                row,
                &[],
            );
        }
        counters
    }
}

impl GraphStore for MemoryGraphStore {
    fn verify_connectivity(&mut self) -> Result<(), StoreError> {
        if self.fail_connect {
            Err(StoreError::Connection("memory store unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    fn run_write(
        &mut self,
        template: &WriteTemplate,
        rows: &[CypherValue],
    ) -> Result<WriteCounters, StoreError> {
        self.writes += 1;
        if self.fail_writes.contains(&self.writes) {
            return Err(StoreError::Write(format!(
                "injected failure on write {}",
                self.writes
            )));
        }
        let rows: Vec<&Properties> = rows.iter().map(row_map).collect::<Result<_, _>>()?;

        match &template.target {
            WriteTarget::Node { label, id_property } => {
                self.upsert_nodes(label, id_property, template, &rows)
            }
            WriteTarget::Relationship {
                relationship_type,
                start_label,
                start_id_property,
                end_label,
                end_id_property,
            } => Ok(self.merge_relationships(
                relationship_type,
                (start_label, start_id_property),
                (end_label, end_id_property),
                template,
                &rows,
            )),
        }
    }

    fn run_destructive_clear(&mut self) -> Result<ClearCounters, StoreError> {
        if self.fail_clear {
            return Err(StoreError::Write("clear rejected".to_string()));
        }
        let counters = ClearCounters {
            nodes_deleted: self.nodes.len(),
            relationships_deleted: self.relationships.len(),
        };
        self.relationships.clear();
        self.relationship_index.clear();
        self.nodes.clear();
        self.node_index.clear();
        Ok(counters)
    }

    fn apply_constraint(&mut self, statement: &CypherStatement) -> Result<(), StoreError> {
        if !self.constraints.contains(&statement.query) {
            self.constraints.push(statement.query.clone());
        }
        Ok(())
    }

    fn stats(&mut self) -> Result<GraphStats, StoreError> {
        let mut stats = GraphStats {
            node_count: self.nodes.len(),
            relationship_count: self.relationships.len(),
            ..GraphStats::default()
        };
        for node in &self.nodes {
            *stats.labels.entry(node.label.clone()).or_default() += 1;
        }
        for rel in &self.relationships {
            *stats
                .relationship_types
                .entry(rel.relationship_type.clone())
                .or_default() += 1;
        }
        Ok(stats)
    }
}

/// Records writes as Cypher statements instead of executing them.
///
/// Write counters are always zero. The collected [`CypherScript`] renders
/// with parameters inlined.
#[derive(Debug, Default)]
pub struct ScriptStore {
    script: CypherScript,
}

impl ScriptStore {
    /// Create an empty script store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The statements recorded so far.
    pub fn script(&self) -> &CypherScript {
        &self.script
    }

    /// Consume the store, returning its script.
    pub fn into_script(self) -> CypherScript {
        self.script
    }

    /// Render the recorded statements as an executable script.
    pub fn render(&self) -> String {
        let mut text = self.script.render(true);
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }
}

impl GraphStore for ScriptStore {
    fn verify_connectivity(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn run_write(
        &mut self,
        template: &WriteTemplate,
        rows: &[CypherValue],
    ) -> Result<WriteCounters, StoreError> {
        let (statement, comment) = match &template.target {
            WriteTarget::Node { label, .. } => (
                CypherStatement::create_node(template.query.clone()),
                format!("Upsert {} {} nodes", rows.len(), label),
            ),
            WriteTarget::Relationship {
                relationship_type,
                start_label,
                end_label,
                ..
            } => (
                CypherStatement::create_relationship(template.query.clone()),
                format!(
                    "Merge {} {} relationships from {} to {}",
                    rows.len(),
                    relationship_type,
                    start_label,
                    end_label
                ),
            ),
        };
        self.script.add(
            statement
                .with_param(BATCH_PARAMETER, CypherValue::List(rows.to_vec()))
                .with_comment(comment),
        );
        Ok(WriteCounters::default())
    }

    fn run_destructive_clear(&mut self) -> Result<ClearCounters, StoreError> {
        self.script.add(
            CypherStatement::clear("MATCH ()-[r]-() DELETE r")
                .with_comment("Delete all relationships"),
        );
        self.script
            .add(CypherStatement::clear("MATCH (n) DELETE n").with_comment("Delete all nodes"));
        Ok(ClearCounters::default())
    }

    fn apply_constraint(&mut self, statement: &CypherStatement) -> Result<(), StoreError> {
        self.script.add(statement.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetType;
    use crate::cypher::StatementType;

    fn node_row(id: i64, title: Option<&str>) -> CypherValue {
        let mut map = Properties::new();
        map.insert("unitId".to_string(), CypherValue::Int(id));
        if let Some(title) = title {
            map.insert("title".to_string(), CypherValue::from(title));
        }
        CypherValue::Map(map)
    }

    fn unit_template() -> WriteTemplate {
        WriteTemplate::node(
            "Unit",
            "unitId",
            BTreeMap::from([("title".to_string(), TargetType::String)]),
        )
    }

    fn rel_row(start: i64, end: &str) -> CypherValue {
        let mut map = Properties::new();
        map.insert("start_id".to_string(), CypherValue::Int(start));
        map.insert("end_id".to_string(), CypherValue::from(end));
        CypherValue::Map(map)
    }

    #[test]
    fn test_node_upsert_counters() {
        let mut store = MemoryGraphStore::new();
        let template = unit_template();
        let first = store
            .run_write(&template, &[node_row(1, Some("Algebra")), node_row(2, None)])
            .unwrap();
        assert_eq!(first.nodes_created, 2);
        assert_eq!(first.properties_set, 3);

        let second = store.run_write(&template, &[node_row(1, Some("Geometry"))]).unwrap();
        assert_eq!(second.nodes_created, 0);
        assert_eq!(store.node_count(), 2);
        let unit = store.node("Unit", "unitId", &CypherValue::Int(1)).unwrap();
        assert_eq!(unit["title"], CypherValue::from("Geometry"));
        assert!(store.node("Unit", "unitId", &CypherValue::from("1")).is_none());
    }

    #[test]
    fn test_null_identity_fails_whole_batch() {
        let mut store = MemoryGraphStore::new();
        let mut bad = Properties::new();
        bad.insert("title".to_string(), CypherValue::from("x"));
        let result = store.run_write(&unit_template(), &[node_row(1, None), CypherValue::Map(bad)]);
        assert!(result.is_err());
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn test_relationship_merge_requires_endpoints() {
        let mut store = MemoryGraphStore::new();
        store.run_write(&unit_template(), &[node_row(1, None)]).unwrap();
        store
            .run_write(
                &WriteTemplate::node("Lesson", "lessonId", BTreeMap::new()),
                &[CypherValue::Map(Properties::from([(
                    "lessonId".to_string(),
                    CypherValue::from("a"),
                )]))],
            )
            .unwrap();

        let template = WriteTemplate::relationship(
            "HAS_LESSON",
            ("Unit", "unitId"),
            ("Lesson", "lessonId"),
            BTreeMap::new(),
        );
        let counters = store
            .run_write(&template, &[rel_row(1, "a"), rel_row(1, "a"), rel_row(1, "missing")])
            .unwrap();
        assert_eq!(counters.relationships_created, 1);
        assert_eq!(store.relationship_count(), 1);
        assert!(store
            .relationship(
                ("Unit", "unitId", &CypherValue::Int(1)),
                "HAS_LESSON",
                ("Lesson", "lessonId", &CypherValue::from("a")),
            )
            .is_some());

        let stats = store.stats().unwrap();
        assert_eq!(stats.labels["Unit"], 1);
        assert_eq!(stats.relationship_types["HAS_LESSON"], 1);
    }

    #[test]
    fn test_fault_injection_and_clear() {
        let mut store = MemoryGraphStore::new().fail_on_write(2);
        let template = unit_template();
        assert!(store.run_write(&template, &[node_row(1, None)]).is_ok());
        assert!(store.run_write(&template, &[node_row(2, None)]).is_err());
        assert!(store.run_write(&template, &[node_row(3, None)]).is_ok());
        assert_eq!(store.write_calls(), 3);

        let cleared = store.run_destructive_clear().unwrap();
        assert_eq!(cleared.nodes_deleted, 2);
        assert_eq!(store.node_count(), 0);

        let mut failing = MemoryGraphStore::new().fail_clear().fail_connect();
        assert!(failing.run_destructive_clear().is_err());
        assert!(failing.verify_connectivity().is_err());
    }

    #[test]
    fn test_script_store_records_statements() {
        let mut store = ScriptStore::new();
        store.run_destructive_clear().unwrap();
        store.run_write(&unit_template(), &[node_row(1, Some("A"))]).unwrap();
        assert_eq!(store.script().len(), 3);
        assert_eq!(store.script().statements_of_type(StatementType::Clear).len(), 2);

        let rendered = store.render();
        assert!(rendered.contains("MATCH ()-[r]-() DELETE r;"));
        assert!(rendered.contains("// Upsert 1 Unit nodes"));
        assert!(rendered.contains("UNWIND [{title: 'A', unitId: 1}] AS row"));
    }
}
