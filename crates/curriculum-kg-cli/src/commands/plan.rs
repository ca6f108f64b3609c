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

//! Plan command - batch summary without writing anything

use super::{load_migration, read_table};
use crate::cli::LoadArgs;
use crate::error::CliError;
use curriculum_kg::{Batch, BatchKind, MaterializeStats};
use serde_json::json;
use std::path::Path;

/// Print the batches an import of `table` would run.
pub fn plan(config: &Path, table: &Path, load: &LoadArgs, as_json: bool) -> Result<(), CliError> {
    let migration = load_migration(config, load)?;
    let (graph, batches) = migration.dry_run(read_table(table)?)?;

    if as_json {
        let plan = json!({
            "nodes": graph.node_stats,
            "relationships": graph.relationship_stats,
            "batches": batches.iter().map(batch_json).collect::<Vec<_>>(),
        });
        let text = serde_json::to_string_pretty(&plan)
            .map_err(|e| CliError::Migration(e.into()))?;
        println!("{}", text);
        return Ok(());
    }

    println!("{}", stats_line("Nodes", &graph.node_stats));
    println!("{}", stats_line("Relationships", &graph.relationship_stats));
    println!("Batches: {}", batches.len());
    for batch in &batches {
        println!(
            "  {:<12} {:<24} shard {:>3}  batch {:>4}  {:>6} rows",
            kind_name(batch.kind),
            batch.group,
            batch.shard_index,
            batch.batch_index,
            batch.len()
        );
    }
    Ok(())
}

fn kind_name(kind: BatchKind) -> &'static str {
    match kind {
        BatchKind::Node => "node",
        BatchKind::Relationship => "relationship",
    }
}

fn stats_line(name: &str, stats: &MaterializeStats) -> String {
    format!(
        "{}: {} (duplicates {}, skipped {})",
        name, stats.records, stats.duplicates, stats.skipped
    )
}

fn batch_json(batch: &Batch) -> serde_json::Value {
    json!({
        "kind": kind_name(batch.kind),
        "group": batch.group,
        "shard": batch.shard_index,
        "batch": batch.batch_index,
        "rows": batch.len(),
    })
}
