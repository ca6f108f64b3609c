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

//! Migration of tabular curriculum data into a property graph.
//!
//! A declarative [`MappingConfig`] says which columns identify which nodes,
//! which columns carry properties, and which column pairs connect nodes.
//! The engine turns flat rows into deduplicated node and relationship
//! records and writes them to a graph store in bounded batches.
//!
//! # Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Clean and filter rows | [`prepare`] | `Vec<Row>` |
//! | Resolve business keys | [`materialize`] | [`NodeRecord`]s, one per key |
//! | Resolve endpoint pairs | [`materialize`] | [`RelationshipRecord`]s, one per triple |
//! | Group and bound | [`plan`] | [`Batch`]es, nodes before relationships |
//! | Write | [`loader`] | [`ImportResult`] |
//!
//! Bulk-import CSV files can be written from the same records with
//! [`bulk::export_bulk_files`].
//!
//! # Example
//!
//! ```rust
//! use curriculum_kg::{LoadConfig, MappingConfig, MemoryGraphStore, Migration, Row};
//!
//! fn example() -> curriculum_kg::Result<()> {
//!     let config = MappingConfig::from_json_str(
//!         r#"{
//!             "nodes": {
//!                 "Unit": {"id_field": {"hasura_col": "unit_slug", "property_name": "unitSlug"}},
//!                 "Lesson": {
//!                     "id_field": {"hasura_col": "lesson_slug", "property_name": "lessonSlug"},
//!                     "properties": {"title": {"hasura_col": "lesson_title", "type": "string"}}
//!                 }
//!             },
//!             "relationships": {
//!                 "HAS_LESSON": {
//!                     "start_node_type": "Unit", "start_csv_field": "unit_slug",
//!                     "end_node_type": "Lesson", "end_csv_field": "lesson_slug"
//!                 }
//!             }
//!         }"#,
//!     )?;
//!
//!     let rows = vec![
//!         Row::new().with("unit_slug", "fractions").with("lesson_slug", "halves").with("lesson_title", "Halves"),
//!         Row::new().with("unit_slug", "fractions").with("lesson_slug", "quarters").with("lesson_title", "Quarters"),
//!     ];
//!
//!     let migration = Migration::new(config, LoadConfig::default().with_batch_size(500))?;
//!     let mut store = MemoryGraphStore::new();
//!     let report = migration.run(rows, &mut store)?;
//!
//!     assert!(report.success());
//!     assert_eq!(report.import.nodes_created, 3);
//!     assert_eq!(report.import.relationships_created, 2);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! # Generated Cypher
//!
//! ```cypher
//! UNWIND $batch AS row
//! MERGE (n:Lesson {lessonSlug: row.lessonSlug})
//! SET n += {title: row.title};
//!
//! UNWIND $batch AS row
//! MATCH (start:Unit {unitSlug: row.start_id})
//! MATCH (end:Lesson {lessonSlug: row.end_id})
//! MERGE (start)-[r:HAS_LESSON]->(end);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod bulk;
pub mod coerce;
pub mod config;
pub mod cypher;
pub mod error;
pub mod loader;
pub mod materialize;
pub mod pipeline;
pub mod plan;
pub mod prepare;
pub mod registry;
pub mod store;
pub mod structured;
pub mod table;

// Re-export main types at crate root for convenience
pub use bulk::{export_bulk_files, BulkFiles};
pub use config::{
    IdFieldSpec, LoadConfig, LoadConfigBuilder, MappingConfig, NodeMapping, PipelineConfig,
    PropertySource, PropertySpec, PropertySpecs, RelationshipMapping, TargetType, Template,
    DEFAULT_BATCH_SIZE, DEFAULT_ID_PROPERTY, DEFAULT_SHARD_SIZE,
};
pub use cypher::{CypherScript, CypherStatement, CypherValue, StatementType};
pub use error::{MigrationError, Result};
pub use loader::{
    BatchSummary, ClearCounters, GraphLoader, GraphStats, GraphStore, ImportResult, StoreError,
    WriteCounters,
};
pub use materialize::{
    MaterializeStats, MaterializedGraph, NodeMaterializer, NodeRecord, Properties,
    RelationshipMaterializer, RelationshipRecord,
};
pub use pipeline::{Migration, MigrationReport};
pub use plan::{plan_batches, Batch, BatchKind, BatchPlanner, WriteTarget, WriteTemplate};
pub use prepare::{prepare_rows, RowFilter};
pub use registry::IdentityRegistry;
pub use store::{MemoryGraphStore, ScriptStore};
pub use table::{read_rows, Row};
