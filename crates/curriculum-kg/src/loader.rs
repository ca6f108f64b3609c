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

//! Graph loading.
//!
//! [`GraphLoader::execute`] applies planned batches to a [`GraphStore`]:
//! connectivity check, optional destructive clear, then every node batch
//! followed by every relationship batch. A failed batch is recorded and
//! loading continues; only connectivity and clear failures abort the run.

use crate::cypher::{CypherStatement, CypherValue};
use crate::error::MigrationError;
use crate::plan::{Batch, BatchKind, WriteTemplate};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Failure reported by a graph store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),
    /// A write was rejected.
    #[error("{0}")]
    Write(String),
    /// The store does not implement the operation.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

/// Counters returned by a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteCounters {
    /// Nodes created.
    pub nodes_created: usize,
    /// Relationships created.
    pub relationships_created: usize,
    /// Properties set.
    pub properties_set: usize,
}

impl WriteCounters {
    /// Add another set of counters to this one.
    pub fn add(&mut self, other: &WriteCounters) {
        self.nodes_created += other.nodes_created;
        self.relationships_created += other.relationships_created;
        self.properties_set += other.properties_set;
    }
}

/// Counters returned by a destructive clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearCounters {
    /// Nodes deleted.
    pub nodes_deleted: usize,
    /// Relationships deleted.
    pub relationships_deleted: usize,
}

/// Contents summary of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Total nodes.
    pub node_count: usize,
    /// Total relationships.
    pub relationship_count: usize,
    /// Node count per label.
    pub labels: BTreeMap<String, usize>,
    /// Relationship count per type.
    pub relationship_types: BTreeMap<String, usize>,
}

/// A target graph database.
///
/// Implementations run one parametrized write per call; the loader owns
/// ordering and failure bookkeeping.
pub trait GraphStore {
    /// Check that the store is reachable.
    fn verify_connectivity(&mut self) -> Result<(), StoreError>;

    /// Run `template` once with `rows` bound to `$batch`.
    fn run_write(
        &mut self,
        template: &WriteTemplate,
        rows: &[CypherValue],
    ) -> Result<WriteCounters, StoreError>;

    /// Delete every relationship, then every node.
    fn run_destructive_clear(&mut self) -> Result<ClearCounters, StoreError>;

    /// Apply a schema statement such as a uniqueness constraint.
    fn apply_constraint(&mut self, _statement: &CypherStatement) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("constraints"))
    }

    /// Summarize the store's contents.
    fn stats(&mut self) -> Result<GraphStats, StoreError> {
        Err(StoreError::Unsupported("stats"))
    }
}

impl<S: GraphStore + ?Sized> GraphStore for &mut S {
    fn verify_connectivity(&mut self) -> Result<(), StoreError> {
        (**self).verify_connectivity()
    }

    fn run_write(
        &mut self,
        template: &WriteTemplate,
        rows: &[CypherValue],
    ) -> Result<WriteCounters, StoreError> {
        (**self).run_write(template, rows)
    }

    fn run_destructive_clear(&mut self) -> Result<ClearCounters, StoreError> {
        (**self).run_destructive_clear()
    }

    fn apply_constraint(&mut self, statement: &CypherStatement) -> Result<(), StoreError> {
        (**self).apply_constraint(statement)
    }

    fn stats(&mut self) -> Result<GraphStats, StoreError> {
        (**self).stats()
    }
}

/// Outcome of one attempted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Node or relationship batch.
    pub kind: BatchKind,
    /// Label or relationship type.
    pub group: String,
    /// 0-based shard within the group.
    pub shard_index: usize,
    /// 1-based batch within the group.
    pub batch_index: usize,
    /// Rows submitted.
    pub rows: usize,
    /// Counters reported by the store (zero on failure).
    pub counters: WriteCounters,
    /// Failure message, if the batch failed.
    pub error: Option<String>,
}

/// Result of a load. `success` is true only when nothing failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    /// No errors were recorded.
    pub success: bool,
    /// Nodes created across successful batches.
    pub nodes_created: usize,
    /// Relationships created across successful batches.
    pub relationships_created: usize,
    /// Properties set across successful batches.
    pub properties_set: usize,
    /// Error messages in the order they occurred.
    pub errors: Vec<String>,
    /// One entry per attempted batch, in execution order.
    pub per_batch_summary: Vec<BatchSummary>,
    /// The destructive clear ran and succeeded.
    pub database_cleared: bool,
    /// Number of batches attempted.
    pub batches_attempted: usize,
    /// Counters from the destructive clear.
    pub clear_counters: Option<ClearCounters>,
}

impl ImportResult {
    /// Number of failed batches.
    pub fn failed_batches(&self) -> usize {
        self.per_batch_summary
            .iter()
            .filter(|s| s.error.is_some())
            .count()
    }

    fn aborted(mut self, err: MigrationError) -> Self {
        error!("import aborted: {}", err);
        self.errors.push(err.to_string());
        self.success = false;
        self
    }
}

/// Applies planned batches to a store.
#[derive(Debug)]
pub struct GraphLoader<S> {
    store: S,
}

impl<S: GraphStore> GraphLoader<S> {
    /// Create a loader over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The underlying store, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the loader, returning the store.
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Execute `batches`, optionally clearing the store first.
    pub fn execute(&mut self, batches: &[Batch], clear_before_import: bool) -> ImportResult {
        self.execute_with_constraints(&[], batches, clear_before_import)
    }

    /// Execute `batches`, applying `constraints` after the optional clear and
    /// before any batch. A failed constraint is recorded like a failed batch.
    pub fn execute_with_constraints(
        &mut self,
        constraints: &[CypherStatement],
        batches: &[Batch],
        clear_before_import: bool,
    ) -> ImportResult {
        let mut result = ImportResult::default();

        if let Err(e) = self.store.verify_connectivity() {
            return result.aborted(MigrationError::Connection(e.to_string()));
        }

        if clear_before_import {
            match self.store.run_destructive_clear() {
                Ok(counters) => {
                    info!(
                        nodes_deleted = counters.nodes_deleted,
                        relationships_deleted = counters.relationships_deleted,
                        "cleared database"
                    );
                    result.database_cleared = true;
                    result.clear_counters = Some(counters);
                }
                Err(e) => {
                    return result.aborted(MigrationError::Connection(format!(
                        "database clear failed: {}",
                        e
                    )));
                }
            }
        }

        result.errors.extend(self.apply_constraints(constraints));

        let ordered = batches
            .iter()
            .filter(|b| b.kind == BatchKind::Node)
            .chain(batches.iter().filter(|b| b.kind == BatchKind::Relationship));

        for batch in ordered {
            result.batches_attempted += 1;
            let mut summary = BatchSummary {
                kind: batch.kind,
                group: batch.group.clone(),
                shard_index: batch.shard_index,
                batch_index: batch.batch_index,
                rows: batch.len(),
                counters: WriteCounters::default(),
                error: None,
            };

            match self.store.run_write(&batch.template, &batch.rows) {
                Ok(counters) => {
                    debug!(
                        group = %batch.group,
                        batch = batch.batch_index,
                        rows = batch.len(),
                        nodes_created = counters.nodes_created,
                        relationships_created = counters.relationships_created,
                        "batch applied"
                    );
                    result.nodes_created += counters.nodes_created;
                    result.relationships_created += counters.relationships_created;
                    result.properties_set += counters.properties_set;
                    summary.counters = counters;
                }
                Err(e) => {
                    let err = MigrationError::BatchExecution {
                        group: batch.group.clone(),
                        batch_index: batch.batch_index,
                        message: e.to_string(),
                    };
                    error!("{}", err);
                    summary.error = Some(err.to_string());
                    result.errors.push(err.to_string());
                }
            }
            result.per_batch_summary.push(summary);
        }

        result.success = result.errors.is_empty();
        info!(
            success = result.success,
            batches = result.batches_attempted,
            nodes_created = result.nodes_created,
            relationships_created = result.relationships_created,
            properties_set = result.properties_set,
            errors = result.errors.len(),
            "import finished"
        );
        result
    }

    /// Apply schema statements, returning one message per failure.
    pub fn apply_constraints(&mut self, statements: &[CypherStatement]) -> Vec<String> {
        let mut errors = Vec::new();
        for statement in statements {
            if let Err(e) = self.store.apply_constraint(statement) {
                warn!(query = %statement.query, "constraint failed: {}", e);
                errors.push(format!("constraint failed: {}: {}", statement.query, e));
            }
        }
        errors
    }
}
