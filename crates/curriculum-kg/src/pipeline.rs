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

//! End-to-end migration runs.
//!
//! A [`Migration`] owns a validated mapping and load settings and drives
//! one run: prepare rows, materialize every node mapping in declaration
//! order, materialize relationships against the resulting registry, plan
//! batches, and execute them against a [`GraphStore`].

use crate::config::{LoadConfig, MappingConfig, PipelineConfig};
use crate::cypher::CypherStatement;
use crate::error::Result;
use crate::loader::{GraphLoader, GraphStore, ImportResult};
use crate::materialize::{
    system_clock, Clock, MaterializeStats, MaterializedGraph, NodeMaterializer,
    RelationshipMaterializer,
};
use crate::plan::{Batch, BatchPlanner};
use crate::prepare::{prepare_rows, RowFilter};
use crate::table::Row;
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Outcome of [`Migration::run`].
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Rows left after preparation.
    pub rows: usize,
    /// Node materialization counters.
    pub node_stats: MaterializeStats,
    /// Relationship materialization counters.
    pub relationship_stats: MaterializeStats,
    /// Batches handed to the loader.
    pub batches_planned: usize,
    /// What the store reported.
    pub import: ImportResult,
}

impl MigrationReport {
    /// Whether the load succeeded.
    pub fn success(&self) -> bool {
        self.import.success
    }
}

/// One configured migration.
#[derive(Clone)]
pub struct Migration {
    config: MappingConfig,
    load: LoadConfig,
    filters: Vec<RowFilter>,
    clock: Clock,
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("config", &self.config)
            .field("load", &self.load)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

impl Migration {
    /// Create a migration. Fails when the mapping or load settings are
    /// invalid.
    pub fn new(config: MappingConfig, load: LoadConfig) -> Result<Self> {
        config.validate()?;
        load.validate()?;
        Ok(Self {
            config,
            load,
            filters: Vec::new(),
            clock: system_clock(),
        })
    }

    /// Create a migration from a pipeline document.
    pub fn from_pipeline(pipeline: PipelineConfig) -> Result<Self> {
        Ok(Self::new(pipeline.mapping, pipeline.load)?.with_filters(pipeline.filters))
    }

    /// Replace the row filters.
    pub fn with_filters(mut self, filters: Vec<RowFilter>) -> Self {
        self.filters = filters;
        self
    }

    /// Use `clock` for `current_timestamp` properties.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The mapping.
    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// The load settings.
    pub fn load(&self) -> &LoadConfig {
        &self.load
    }

    /// Clean and filter input rows.
    pub fn prepare(&self, rows: Vec<Row>) -> Vec<Row> {
        prepare_rows(rows, &self.filters)
    }

    /// Materialize all node mappings, then all relationship mappings.
    pub fn materialize(&self, rows: &[Row]) -> Result<MaterializedGraph> {
        let mut graph = MaterializedGraph::default();

        let mut nodes = NodeMaterializer::new().with_clock(self.clock.clone());
        for mapping in &self.config.nodes {
            let records = nodes.materialize(rows, mapping);
            graph.nodes.push((mapping.key.clone(), records));
        }
        graph.node_stats = nodes.stats();

        let mut relationships = RelationshipMaterializer::new(&self.config, nodes.registry())
            .with_clock(self.clock.clone());
        for mapping in &self.config.relationships {
            let records = relationships.materialize(rows, mapping)?;
            graph.relationships.push((mapping.key.clone(), records));
        }
        graph.relationship_stats = relationships.stats();

        info!(
            nodes = graph.node_count(),
            relationships = graph.relationship_count(),
            duplicates = graph.node_stats.duplicates + graph.relationship_stats.duplicates,
            skipped = graph.node_stats.skipped + graph.relationship_stats.skipped,
            "materialization complete"
        );
        Ok(graph)
    }

    /// Plan write batches for a materialized graph.
    pub fn plan(&self, graph: &MaterializedGraph) -> Result<Vec<Batch>> {
        BatchPlanner::new(&self.config, &self.load)?
            .plan(graph.node_records(), graph.relationship_records())
    }

    /// Uniqueness constraints to apply, empty unless enabled.
    pub fn constraints(&self) -> Result<Vec<CypherStatement>> {
        if !self.load.create_constraints {
            return Ok(Vec::new());
        }
        Ok(BatchPlanner::new(&self.config, &self.load)?.constraints())
    }

    /// Prepare, materialize, and plan without touching a store.
    pub fn dry_run(&self, rows: Vec<Row>) -> Result<(MaterializedGraph, Vec<Batch>)> {
        let rows = self.prepare(rows);
        let graph = self.materialize(&rows)?;
        let batches = self.plan(&graph)?;
        Ok((graph, batches))
    }

    /// Run the whole pipeline against `store`.
    ///
    /// Only configuration problems return `Err`. Connection and batch
    /// failures are reported through [`MigrationReport::import`].
    pub fn run<S: GraphStore>(&self, rows: Vec<Row>, store: S) -> Result<MigrationReport> {
        let rows = self.prepare(rows);
        let graph = self.materialize(&rows)?;
        let batches = self.plan(&graph)?;
        let constraints = self.constraints()?;

        let mut loader = GraphLoader::new(store);
        let import =
            loader.execute_with_constraints(&constraints, &batches, self.load.clear_before_import);

        Ok(MigrationReport {
            rows: rows.len(),
            node_stats: graph.node_stats,
            relationship_stats: graph.relationship_stats,
            batches_planned: batches.len(),
            import,
        })
    }
}
